// SPDX: CC0-1.0

use crate::{
    eval::{EvalErr, Expression},
    intersect,
    parse::ParseErr,
    raster::{self, PathSegment},
    view::{Bounds, ViewErr, ViewWindow},
    Number, Point,
};
use core::{fmt, str::FromStr};
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Colors handed out to new functions, in order.
pub const PALETTE: &[(&str, Color)] = &[
    ("red", Color::rgb(0xe6, 0x19, 0x4b)),
    ("blue", Color::rgb(0x43, 0x63, 0xd8)),
    ("green", Color::rgb(0x3c, 0xb4, 0x4b)),
    ("orange", Color::rgb(0xf5, 0x82, 0x31)),
    ("purple", Color::rgb(0x91, 0x1e, 0xb4)),
    ("teal", Color::rgb(0x46, 0x99, 0x90)),
    ("magenta", Color::rgb(0xf0, 0x32, 0xe6)),
    ("brown", Color::rgb(0x9a, 0x63, 0x24)),
    ("black", Color::rgb(0x00, 0x00, 0x00)),
];

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColorParseErr(pub String);

impl fmt::Display for ColorParseErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' is neither a color name nor #rrggbb", self.0)
    }
}

impl std::error::Error for ColorParseErr {}

impl FromStr for Color {
    type Err = ColorParseErr;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some((_, color)) = PALETTE
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(s))
        {
            return Ok(*color);
        }
        let err = || ColorParseErr(s.to_string());
        let hex = s.strip_prefix('#').ok_or_else(err)?;
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(err());
        }
        let channel = |at: usize| u8::from_str_radix(&hex[at..at + 2], 16).map_err(|_| err());
        Ok(Self::rgb(channel(0)?, channel(2)?, channel(4)?))
    }
}

/// Stable identity of a plotted function, unaffected by edits or by other
/// functions being removed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionId(u32);

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "f{}", self.0)
    }
}

#[derive(Clone, Debug)]
pub struct PlottedFunction {
    pub id: FunctionId,
    pub expr: Expression,
    pub color: Color,
    pub visible: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IntersectionPoint {
    pub pos: Point<Number>,
    pub a: FunctionId,
    pub b: FunctionId,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionErr {
    NoSuchFunction(usize),
    Parse(ParseErr),
}

impl fmt::Display for SessionErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSuchFunction(idx) => write!(f, "there is no function #{}", idx + 1),
            Self::Parse(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for SessionErr {}

impl From<ParseErr> for SessionErr {
    fn from(err: ParseErr) -> Self {
        Self::Parse(err)
    }
}

/// Rasterized curve of one visible function.
#[derive(Debug)]
pub struct Curve {
    pub id: FunctionId,
    pub color: Color,
    pub segments: Vec<PathSegment>,
    /// No column produced a finite value, which the user should be told about.
    pub blank: bool,
    pub first_err: Option<EvalErr>,
}

/// The function list, the view, and the intersection points derived from both.
#[derive(Debug)]
pub struct PlotSession {
    view: ViewWindow,
    functions: Vec<PlottedFunction>,
    next_id: u32,
    next_color: usize,
    show_intersections: bool,
    intersections: Option<Vec<IntersectionPoint>>,
}

impl PlotSession {
    pub fn new(view: ViewWindow) -> Self {
        Self {
            view,
            functions: Vec::new(),
            next_id: 0,
            next_color: 0,
            show_intersections: false,
            intersections: None,
        }
    }

    pub const fn view(&self) -> &ViewWindow {
        &self.view
    }

    pub fn functions(&self) -> &[PlottedFunction] {
        &self.functions
    }

    pub fn function(&self, idx: usize) -> Result<&PlottedFunction, SessionErr> {
        self.functions
            .get(idx)
            .ok_or(SessionErr::NoSuchFunction(idx))
    }

    fn function_mut(&mut self, idx: usize) -> Result<&mut PlottedFunction, SessionErr> {
        self.functions
            .get_mut(idx)
            .ok_or(SessionErr::NoSuchFunction(idx))
    }

    fn invalidate(&mut self) {
        if self.intersections.take().is_some() {
            debug!("intersection cache invalidated");
        }
    }

    /// Compile `text` and append it with the next palette color.
    pub fn add(&mut self, text: &str) -> Result<FunctionId, ParseErr> {
        let expr = Expression::compile(text)?;
        let id = FunctionId(self.next_id);
        self.next_id += 1;
        let (_, color) = PALETTE[self.next_color % PALETTE.len()];
        self.next_color += 1;
        debug!(%id, expr = %expr, %color, "function added");
        self.functions.push(PlottedFunction {
            id,
            expr,
            color,
            visible: true,
        });
        self.invalidate();
        Ok(id)
    }

    pub fn remove(&mut self, idx: usize) -> Result<PlottedFunction, SessionErr> {
        self.function(idx)?;
        let removed = self.functions.remove(idx);
        debug!(id = %removed.id, "function removed");
        self.invalidate();
        Ok(removed)
    }

    /// Replace the expression in place. Position, color and visibility stay; a
    /// failed compile leaves the function untouched.
    pub fn edit(&mut self, idx: usize, text: &str) -> Result<(), SessionErr> {
        self.function(idx)?;
        let expr = Expression::compile(text)?;
        self.function_mut(idx)?.expr = expr;
        self.invalidate();
        Ok(())
    }

    /// Flip visibility, returning the new state.
    pub fn toggle_visibility(&mut self, idx: usize) -> Result<bool, SessionErr> {
        let fun = self.function_mut(idx)?;
        fun.visible = !fun.visible;
        let visible = fun.visible;
        self.invalidate();
        Ok(visible)
    }

    pub fn set_color(&mut self, idx: usize, color: Color) -> Result<(), SessionErr> {
        self.function_mut(idx)?.color = color;
        Ok(())
    }

    pub const fn show_intersections(&self) -> bool {
        self.show_intersections
    }

    pub fn set_show_intersections(&mut self, show: bool) {
        self.show_intersections = show;
        if !show {
            self.invalidate();
        }
    }

    fn view_changed(&mut self, changed: Result<Bounds, ViewErr>) -> Result<Bounds, ViewErr> {
        if changed.is_ok() {
            self.invalidate();
        }
        changed
    }

    pub fn zoom(&mut self, factor: Number, anchor: Point<i32>) -> Result<Bounds, ViewErr> {
        let changed = self.view.zoom(factor, anchor);
        self.view_changed(changed)
    }

    pub fn pan(&mut self, dx: i32, dy: i32) -> Result<Bounds, ViewErr> {
        let changed = self.view.pan(dx, dy);
        self.view_changed(changed)
    }

    pub fn center_at(&mut self, x: Number, y: Number) -> Result<Bounds, ViewErr> {
        let changed = self.view.center_at(x, y);
        self.view_changed(changed)
    }

    pub fn reset_view(&mut self) -> Result<Bounds, ViewErr> {
        let changed = self.view.reset_view();
        self.view_changed(changed)
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<Bounds, ViewErr> {
        let changed = self.view.adjust_to_aspect_ratio(width, height);
        self.view_changed(changed)
    }

    pub fn set_bounds(&mut self, bounds: Bounds) -> Result<Bounds, ViewErr> {
        let changed = self.view.set_bounds(bounds);
        self.view_changed(changed)
    }

    pub fn cached_intersections(&self) -> Option<&[IntersectionPoint]> {
        self.intersections.as_deref()
    }

    /// Intersections of every unordered pair of visible functions over the
    /// visible x range, recomputed only after the functions or view change.
    pub fn intersections(&mut self) -> &[IntersectionPoint] {
        let functions = &self.functions;
        let view = &self.view;
        self.intersections.get_or_insert_with(|| {
            let x = &view.bounds().x;
            let visible: Vec<&PlottedFunction> = functions.iter().filter(|f| f.visible).collect();
            let mut points = Vec::new();
            for (i, a) in visible.iter().enumerate() {
                for b in &visible[i + 1..] {
                    points.extend(
                        intersect::find_intersections(&a.expr, &b.expr, x.start, x.end)
                            .into_iter()
                            .map(|pos| IntersectionPoint {
                                pos,
                                a: a.id,
                                b: b.id,
                            }),
                    );
                }
            }
            debug!(count = points.len(), "intersections recomputed");
            points
        })
        .as_slice()
    }

    /// Rasterize every visible function against the current view.
    pub fn render(&self) -> Vec<Curve> {
        self.functions
            .iter()
            .filter(|fun| fun.visible)
            .map(|fun| {
                let raster = raster::rasterize_expr(&fun.expr, &self.view);
                Curve {
                    id: fun.id,
                    color: fun.color,
                    blank: raster.is_blank(),
                    segments: raster.segments,
                    first_err: raster.first_err,
                }
            })
            .collect()
    }
}
