// SPDX: CC0-1.0

use anyhow::Context;
use chrono::{DateTime, Local};
use function_plot::{
    eval::{Ident, IdentKey},
    lex::{LexErrTyp, TokTyp},
    parse::{ParseErr, ParseErrTyp},
    session::{Color, PlotSession, SessionErr, PALETTE},
    shell::{self, Command},
    stdlib, svg,
    view::{Bounds, ViewConfig, ViewErr, ViewWindow},
    Number, Point,
};
use std::{
    fs::OpenOptions,
    io::{stdout, BufWriter, Write},
    process::ExitCode,
};
use tracing_subscriber::EnvFilter;

const OUTPUT_RES: [u32; 2] = [960, 720];

fn output_svg_filename(now: DateTime<Local>) -> String {
    format!(
        "{}_output-{}.{}",
        env!("CARGO_PKG_NAME"),
        now.format("%Y-%m-%d_%H-%M-%S"),
        "svg"
    )
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match try_main() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("unexpected error: {err}");
            let chain = err.chain();
            if chain.len() > 1 {
                eprintln!();
                eprintln!("context:");
                for it in chain.skip(1) {
                    eprintln!("  {it}");
                }
            }
            ExitCode::FAILURE
        }
    }
}

#[derive(Debug)]
struct State {
    session: PlotSession,
}

fn try_main() -> anyhow::Result<()> {
    let [width, height] = OUTPUT_RES;
    let view = ViewWindow::new(ViewConfig::default(), width, height)
        .context("output resolution leaves no room to draw")?;
    let mut state = State {
        session: PlotSession::new(view),
    };
    state
        .session
        .add("sin(x)")
        .context("default expression failed to compile")?;

    let mut stdout = BufWriter::new(stdout());
    loop {
        let count = state.session.functions().len();
        writeln!(
            stdout,
            "{count} function{s}, view {bounds}",
            s = if count == 1 { "" } else { "s" },
            bounds = state.session.view().bounds()
        )?;

        let mut try_cmd = shell::input(&mut stdout, "> ")?;
        try_cmd.make_ascii_lowercase();
        writeln!(stdout)?;

        if let Ok(cmd) = try_cmd.parse::<Command>() {
            match cmd {
                Command::Help => {
                    for c in Command::exhaustive() {
                        writeln!(stdout, "{name}: {help}", name = c.name(), help = c.help())?;
                    }
                }

                Command::Quit => break,

                Command::Add => add_fun(&mut stdout, &mut state)?,

                Command::Edit => edit_fun(&mut stdout, &mut state)?,

                Command::Remove => {
                    if let Some(idx) = shell::read_index(&mut stdout, count)? {
                        let removed = state.session.remove(idx)?;
                        writeln!(stdout, "removed y = {}", removed.expr)?;
                    }
                }

                Command::List => list_funs(&mut stdout, &state)?,

                Command::Toggle => {
                    if let Some(idx) = shell::read_index(&mut stdout, count)? {
                        let visible = state.session.toggle_visibility(idx)?;
                        writeln!(
                            stdout,
                            "function #{n} is now {state}",
                            n = idx + 1,
                            state = if visible { "visible" } else { "hidden" }
                        )?;
                    }
                }

                Command::Color => set_color(&mut stdout, &mut state)?,

                Command::Eval => eval_fun(&mut stdout, &state)?,

                Command::Tree => {
                    if let Some(idx) = shell::read_index(&mut stdout, count)? {
                        let fun = state.session.function(idx)?;
                        writeln!(stdout, "{}", fun.expr.root())?;
                    }
                }

                Command::Window => set_win(&mut stdout, &mut state)?,

                Command::Zoom => zoom(&mut stdout, &mut state)?,

                Command::Pan => {
                    let Some([dx, dy]) = read_pair::<_, i32>(&mut stdout, ["dx", "dy"])? else {
                        continue;
                    };
                    let changed = state.session.pan(dx, dy);
                    report_view(&mut stdout, changed)?;
                }

                Command::Center => {
                    let Some([x, y]) = read_pair::<_, Number>(&mut stdout, ["x", "y"])? else {
                        continue;
                    };
                    let changed = state.session.center_at(x, y);
                    report_view(&mut stdout, changed)?;
                }

                Command::Reset => {
                    let changed = state.session.reset_view();
                    report_view(&mut stdout, changed)?;
                }

                Command::Resize => {
                    let Some([w, h]) = read_pair::<_, u32>(&mut stdout, ["width", "height"])?
                    else {
                        continue;
                    };
                    let changed = state.session.resize(w, h);
                    report_view(&mut stdout, changed)?;
                }

                Command::Intersect => intersect(&mut stdout, &mut state)?,

                Command::Plot => plot(&mut stdout, &mut state)?,
            }
        } else if let Some(similar) =
            shell::most_similar(&try_cmd, Command::exhaustive().iter().map(|c| c.name()))
        {
            writeln!(stdout, r#"Unknown command, did you mean "{similar}"?"#)?;
        } else {
            writeln!(stdout, r#"Unknown command, try "help" for help"#)?;
        }

        writeln!(stdout)?;
    }
    stdout.flush()?;
    Ok(())
}

fn add_fun<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    let input = shell::input(&mut out, "y = ")?;
    if input.is_empty() {
        return Ok(());
    }
    match state.session.add(&input) {
        Ok(id) => writeln!(out, "added {id} as function #{}", state.session.functions().len())?,
        Err(err) => report_parse_err(&mut out, &err)?,
    }
    Ok(())
}

fn edit_fun<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    let Some(idx) = shell::read_index(&mut out, state.session.functions().len())? else {
        return Ok(());
    };
    let old = state.session.function(idx)?.expr.clone();
    let input = shell::input(&mut out, format_args!("y = {old}\nnew: y = "))?;
    if input.is_empty() {
        return Ok(());
    }
    match state.session.edit(idx, &input) {
        Ok(()) => writeln!(out, "function #{} is now y = {input}", idx + 1)?,
        Err(SessionErr::Parse(err)) => report_parse_err(&mut out, &err)?,
        Err(err) => return Err(err.into()),
    }
    Ok(())
}

fn list_funs<W: Write>(mut out: W, state: &State) -> anyhow::Result<()> {
    let funs = state.session.functions();
    if funs.is_empty() {
        writeln!(out, "(no functions)")?;
    }
    for (idx, fun) in funs.iter().enumerate() {
        let name = PALETTE
            .iter()
            .find(|(_, color)| *color == fun.color)
            .map(|(name, _)| *name)
            .unwrap_or("custom");
        writeln!(
            out,
            "#{n} {id} [{name} {color}] y = {expr}{hidden}",
            n = idx + 1,
            id = fun.id,
            color = fun.color,
            expr = fun.expr,
            hidden = if fun.visible { "" } else { " (hidden)" },
        )?;
    }
    Ok(())
}

fn set_color<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    let Some(idx) = shell::read_index(&mut out, state.session.functions().len())? else {
        return Ok(());
    };
    match shell::read_fromstr::<_, Color>(&mut out, "?color = ", true)? {
        Ok(Some(color)) => state.session.set_color(idx, color)?,
        Ok(None) => {}
        Err(err) => {
            if let Some(similar) = shell::most_similar(&err.0, PALETTE.iter().map(|(n, _)| *n)) {
                writeln!(out, "note: color '{similar}' has a similar name")?;
            }
        }
    }
    Ok(())
}

fn eval_fun<W: Write>(mut out: W, state: &State) -> anyhow::Result<()> {
    let Some(idx) = shell::read_index(&mut out, state.session.functions().len())? else {
        return Ok(());
    };
    let Ok(Some(x)) = shell::read_fromstr::<_, Number>(&mut out, "?x = ", false)? else {
        return Ok(());
    };
    let fun = state.session.function(idx)?;
    match fun.expr.eval(x) {
        Ok(y) if y.is_finite() => writeln!(out, "y = {y}")?,
        Ok(y) => writeln!(out, "y = {y} (undefined here, drawn as a gap)")?,
        Err(err) => {
            shell::underline(&mut out, &err.loc)?;
            writeln!(out, "evaluation error: {err}")?;
        }
    }
    Ok(())
}

fn set_win<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    let mut bounds = state.session.view().bounds().clone();
    writeln!(out, "win = {bounds:#}")?;
    writeln!(out)?;
    writeln!(out, "note: leave blank to skip")?;

    for (name, dst) in [
        ("x min", &mut bounds.x.start),
        ("x max", &mut bounds.x.end),
        ("y min", &mut bounds.y.start),
        ("y max", &mut bounds.y.end),
    ] {
        match shell::read_fromstr::<_, Number>(
            &mut out,
            format_args!("?{name} (is {cur}) = ", cur = *dst),
            true,
        )? {
            Ok(Some(new)) => *dst = new,
            Ok(None) => {}
            Err(_) => return Ok(()),
        }
    }

    let changed = state.session.set_bounds(bounds);
    report_view(&mut out, changed)?;
    Ok(())
}

fn zoom<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    let Ok(Some(factor)) = shell::read_fromstr::<_, Number>(&mut out, "?factor = ", false)? else {
        return Ok(());
    };

    // anchor defaults to the middle of the drawable area
    let view = state.session.view();
    let mid = view.world_to_screen(view.bounds().mid());
    let mut anchor = Point::new(mid.x.round() as i32, mid.y.round() as i32);
    writeln!(out, "note: leave blank to zoom about the middle")?;
    for (name, dst) in [("anchor x", &mut anchor.x), ("anchor y", &mut anchor.y)] {
        match shell::read_fromstr::<_, i32>(
            &mut out,
            format_args!("?{name} px (is {cur}) = ", cur = *dst),
            true,
        )? {
            Ok(Some(new)) => *dst = new,
            Ok(None) => {}
            Err(_) => return Ok(()),
        }
    }

    let changed = state.session.zoom(factor, anchor);
    report_view(&mut out, changed)?;
    Ok(())
}

fn read_pair<W: Write, T: core::str::FromStr>(
    mut out: W,
    names: [&str; 2],
) -> anyhow::Result<Option<[T; 2]>>
where
    <T as core::str::FromStr>::Err: core::fmt::Display,
{
    let mut vals = Vec::with_capacity(2);
    for name in names {
        match shell::read_fromstr::<_, T>(&mut out, format_args!("?{name} = "), false)? {
            Ok(Some(val)) => vals.push(val),
            Ok(None) | Err(_) => return Ok(None),
        }
    }
    Ok(vals.try_into().ok())
}

fn report_view<W: Write>(mut out: W, changed: Result<Bounds, ViewErr>) -> anyhow::Result<()> {
    match changed {
        Ok(bounds) => writeln!(out, "win = {bounds:#}")?,
        Err(err) => writeln!(out, "view error: {err}")?,
    }
    Ok(())
}

fn intersect<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    let show = !state.session.show_intersections();
    state.session.set_show_intersections(show);
    if !show {
        writeln!(out, "intersection points hidden")?;
        return Ok(());
    }

    writeln!(out, "intersection points shown")?;
    let view = state.session.view().clone();
    let points = state.session.intersections();
    if points.is_empty() {
        writeln!(out, "(none in view)")?;
    }
    for p in points {
        writeln!(
            out,
            "  {a} and {b} meet at ({x}, {y})",
            a = p.a,
            b = p.b,
            x = view.format_tick(p.pos.x),
            y = view.format_tick(p.pos.y),
        )?;
    }
    Ok(())
}

fn plot<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    let curves = state.session.render();
    for (curve, fun) in curves.iter().zip(state.session.functions().iter().filter(|f| f.visible)) {
        if curve.blank {
            write!(out, "warning: y = {} could not be evaluated anywhere in view", fun.expr)?;
            match curve.first_err {
                Some(ref err) => writeln!(out, " ({err})")?,
                None => writeln!(out)?,
            }
        }
    }
    let marks = if state.session.show_intersections() {
        state.session.intersections().to_vec()
    } else {
        Vec::new()
    };

    let doc = svg::render_svg(&state.session, &curves, &marks).context("failed to render svg")?;

    let path = output_svg_filename(Local::now());
    let mut file = BufWriter::new(
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .context("failed to open output svg file")?,
    );
    file.write_all(doc.as_bytes())
        .context("failed to write to output svg file")?;
    file.flush()?;
    file.get_mut().sync_data()?;
    drop(file);

    writeln!(out, "wrote {path}")?;
    Ok(())
}

fn report_parse_err<W: Write>(mut out: W, err: &ParseErr) -> anyhow::Result<()> {
    writeln!(out)?;
    shell::underline(&mut out, &err.loc)?;
    writeln!(out, "parse error: {}", err.typ)?;
    match err.typ {
        ParseErrTyp::LexErr(LexErrTyp::InvalidChar) => writeln!(
            out,
            "note: available tokens are numbers, alphabetic identifiers, and symbols +-*/^()"
        )?,
        ParseErrTyp::LexErr(LexErrTyp::Unsupported(typ)) => match typ {
            TokTyp::XGreater | TokTyp::XLess => {
                writeln!(out, "note: expected an expression but found an inequality")?
            }
            TokTyp::XEqual => writeln!(
                out,
                "note: expected an expression but found an equation, enter only the right-hand side"
            )?,
            TokTyp::XPipe => writeln!(
                out,
                "note: use the 'abs' function to compute absolute value"
            )?,
            TokTyp::XComma => writeln!(out, "note: functions take a single argument")?,
            _ => {}
        },
        ParseErrTyp::UnknownIdent => {
            let idents = stdlib::standard_idents();
            if let Some(similar) =
                shell::most_similar(err.loc.get(), idents.keys().map(|k| k.get()))
            {
                let kind = idents
                    .get(&IdentKey::from(similar))
                    .map(Ident::kind)
                    .unwrap_or("identifier");
                writeln!(out, "note: {kind} '{similar}' has a similar name")?;
            }
        }
        ParseErrTyp::ParseNum(_) => writeln!(out, "note: parsing as floating point number")?,
        ParseErrTyp::TrailingInput => writeln!(
            out,
            "note: implicit multiplication only applies before a name or '(', so '(x+1)2' would be '2(x+1)'"
        )?,
        _ => {}
    }
    Ok(())
}
