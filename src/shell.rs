// SPDX: CC0-1.0

use crate::lex::SubStr;
use anyhow::Context;
use core::fmt;
use std::{
    io::{self, stdin, BufRead, Write},
    sync::Arc,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Help,
    Quit,
    Add,
    Edit,
    Remove,
    List,
    Toggle,
    Color,
    Eval,
    Tree,
    Window,
    Zoom,
    Pan,
    Center,
    Reset,
    Resize,
    Intersect,
    Plot,
}

impl Command {
    pub const fn exhaustive() -> &'static [Command] {
        &[
            Self::Help,
            Self::Quit,
            Self::Add,
            Self::Edit,
            Self::Remove,
            Self::List,
            Self::Toggle,
            Self::Color,
            Self::Eval,
            Self::Tree,
            Self::Window,
            Self::Zoom,
            Self::Pan,
            Self::Center,
            Self::Reset,
            Self::Resize,
            Self::Intersect,
            Self::Plot,
        ]
    }

    pub const fn help(&self) -> &'static str {
        match self {
            Self::Help => "display help for each command",
            Self::Quit => "quit the shell",
            Self::Add => "add a function of x to the plot",
            Self::Edit => "replace the expression of a function, keeping its color",
            Self::Remove => "remove a function",
            Self::List => "list functions with their colors and visibility",
            Self::Toggle => "show or hide a function",
            Self::Color => "set the color of a function (name or #rrggbb)",
            Self::Eval => "evaluate a function at some x",
            Self::Tree => "print how a function was parsed (for debugging)",
            Self::Window => "set the visible bounds",
            Self::Zoom => "zoom by a factor about a pixel (below 1 zooms in)",
            Self::Pan => "drag the view by a pixel offset",
            Self::Center => "center the view on a point",
            Self::Reset => "restore the default view",
            Self::Resize => "change the output size in pixels",
            Self::Intersect => "toggle intersection points and list them",
            Self::Plot => "write the plot to an svg file",
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Help => "help",
            Self::Quit => "quit",
            Self::Add => "add",
            Self::Edit => "edit",
            Self::Remove => "remove",
            Self::List => "list",
            Self::Toggle => "toggle",
            Self::Color => "color",
            Self::Eval => "eval",
            Self::Tree => "tree",
            Self::Window => "window",
            Self::Zoom => "zoom",
            Self::Pan => "pan",
            Self::Center => "center",
            Self::Reset => "reset",
            Self::Resize => "resize",
            Self::Intersect => "intersect",
            Self::Plot => "plot",
        }
    }
}

impl core::str::FromStr for Command {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::exhaustive()
            .iter()
            .find(|c| c.name() == s)
            .copied()
            .ok_or(())
    }
}

pub fn input<W: Write>(out: W, prompt: impl fmt::Display) -> anyhow::Result<String> {
    fn inner<W: Write>(mut out: W, prompt: impl fmt::Display) -> io::Result<String> {
        write!(out, "{prompt}")?;
        out.flush()?;
        let mut stdin = stdin().lock();
        let mut s = String::new();
        stdin.read_line(&mut s)?;
        Ok(s.trim().to_string())
    }

    let s = inner(out, prompt).context("read from standard input failed")?;
    Ok(s)
}

pub fn read_fromstr<W: Write, T: core::str::FromStr>(
    mut out: W,
    prompt: impl fmt::Display,
    ignore_empty: bool,
) -> anyhow::Result<Result<Option<T>, <T as core::str::FromStr>::Err>>
where
    <T as core::str::FromStr>::Err: fmt::Display,
{
    let input = Arc::new(input(&mut out, prompt)?);
    if ignore_empty && input.is_empty() {
        return Ok(Ok(None));
    }
    match input.parse::<T>() {
        Ok(new) => Ok(Ok(Some(new))),
        Err(err) => {
            writeln!(out)?;
            underline(&mut out, &SubStr::all(input))?;
            writeln!(out, "parse error: {err}")?;
            Ok(Err(err))
        }
    }
}

/// Ask for a 1-based function number, returning its 0-based index.
pub fn read_index<W: Write>(mut out: W, count: usize) -> anyhow::Result<Option<usize>> {
    if count == 0 {
        writeln!(out, "error: no functions are defined")?;
        return Ok(None);
    }
    match read_fromstr::<_, usize>(&mut out, format_args!("?function (1-{count}) = "), false)? {
        Ok(Some(n)) if (1..=count).contains(&n) => Ok(Some(n - 1)),
        Ok(_) => {
            writeln!(out, "error: expected a number from 1 to {count}")?;
            Ok(None)
        }
        Err(_) => Ok(None),
    }
}

pub fn underline<W: Write>(mut out: W, span: &SubStr) -> io::Result<()> {
    writeln!(out, "{}", span.src())?;
    // zero-width spans (end of input) still get one caret
    writeln!(
        out,
        "{}{}",
        " ".repeat(span.src()[..span.start()].chars().count()),
        "^".repeat(span.get().chars().count().max(1))
    )?;
    Ok(())
}

/// The candidate most similar to `text`, if any is similar enough to suggest.
pub fn most_similar<'a, I>(text: &str, candidates: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let text = text.to_ascii_lowercase();
    candidates
        .into_iter()
        .map(|cand| {
            (
                strsim::normalized_damerau_levenshtein(&text, &cand.to_ascii_lowercase()),
                cand,
            )
        })
        .reduce(|acc, elem| if elem.0 > acc.0 { elem } else { acc })
        .filter(|(sim, _)| *sim > 0.3)
        .map(|(_, cand)| cand)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_command_parses_from_its_name() {
        for c in Command::exhaustive() {
            assert_eq!(c.name().parse::<Command>(), Ok(*c));
        }
        assert!("plt".parse::<Command>().is_err());
    }

    #[test]
    fn suggests_close_names() {
        let names = Command::exhaustive().iter().map(|c| c.name());
        assert_eq!(most_similar("plto", names), Some("plot"));
        assert_eq!(most_similar("sni", ["sin", "cos", "tan"]), Some("sin"));
        assert_eq!(most_similar("qqqqqqqq", ["sin", "cos"]), None);
    }

    #[test]
    fn underline_marks_span() {
        let src = Arc::new(String::from("2 + foo"));
        let mut out = Vec::new();
        underline(&mut out, &SubStr::new(Arc::clone(&src), 4, 3)).expect("writes to memory");
        assert_eq!(String::from_utf8(out).expect("utf-8"), "2 + foo\n    ^^^\n");

        let mut out = Vec::new();
        underline(&mut out, &SubStr::end_of(src)).expect("writes to memory");
        assert_eq!(String::from_utf8(out).expect("utf-8"), "2 + foo\n       ^\n");
    }
}
