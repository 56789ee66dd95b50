// SPDX: CC0-1.0

use crate::{Number, Point};
use core::{fmt, ops::Range};
use tracing::{debug, trace};

/// Target distance between neighbouring tick labels.
const TICK_SPACING_PX: Number = 80.0;

#[derive(Clone, Debug, PartialEq)]
pub struct ViewConfig {
    /// Bounds restored by [`ViewWindow::reset_view`].
    pub x: Range<Number>,
    pub y: Range<Number>,
    /// Pixels reserved on the left and bottom edges for axis labels.
    pub margin: u32,
    /// Fewest pixels per world unit either axis may show.
    pub min_density: Number,
    /// Relative slack allowed between window and surface aspect ratios.
    pub aspect_tolerance: Number,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            x: -10.0..10.0,
            y: -10.0..10.0,
            margin: 40,
            min_density: 10.0,
            aspect_tolerance: 0.01,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Bounds {
    pub x: Range<Number>,
    pub y: Range<Number>,
}

impl Bounds {
    pub fn span(&self) -> Point<Number> {
        Point::new(self.x.end - self.x.start, self.y.end - self.y.start)
    }

    pub fn mid(&self) -> Point<Number> {
        Point::new(
            (self.x.start + self.x.end) * 0.5,
            (self.y.start + self.y.end) * 0.5,
        )
    }

    pub fn is_valid(&self) -> bool {
        let span = self.span();
        [self.x.start, self.x.end, self.y.start, self.y.end]
            .iter()
            .all(|v| v.is_finite())
            && span.x > 0.0
            && span.y > 0.0
    }

    fn centered(mid: Point<Number>, span: Point<Number>) -> Self {
        Self {
            x: mid.x - span.x * 0.5..mid.x + span.x * 0.5,
            y: mid.y - span.y * 0.5..mid.y + span.y * 0.5,
        }
    }
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bounds")
            .field("x range", &self.x)
            .field("y range", &self.y)
            .finish()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ViewErr {
    DegenerateSurface { width: u32, height: u32 },
    InvalidZoom(Number),
    InvalidBounds,
}

impl fmt::Display for ViewErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DegenerateSurface { width, height } => {
                write!(f, "surface {width}x{height} leaves no room to draw")
            }
            Self::InvalidZoom(factor) => write!(f, "zoom factor {factor} must be positive"),
            Self::InvalidBounds => write!(f, "view bounds would become degenerate"),
        }
    }
}

impl std::error::Error for ViewErr {}

/// The visible world rectangle and its mapping onto the pixel surface.
///
/// Screen y grows downward while world y grows upward. The drawable area
/// starts `margin` pixels from the left edge and ends `margin` pixels above
/// the bottom edge.
#[derive(Clone, Debug)]
pub struct ViewWindow {
    config: ViewConfig,
    bounds: Bounds,
    center: Point<Number>,
    surface: Point<u32>,
    scale: Point<Number>,
    offset: Point<i32>,
}

impl ViewWindow {
    /// Show the configured bounds on a `width` by `height` surface, fitted to
    /// its aspect ratio.
    pub fn new(config: ViewConfig, width: u32, height: u32) -> Result<Self, ViewErr> {
        let bounds = Bounds {
            x: config.x.clone(),
            y: config.y.clone(),
        };
        if !bounds.is_valid() {
            return Err(ViewErr::InvalidBounds);
        }
        let mut view = Self {
            center: bounds.mid(),
            offset: Point::new(config.margin as i32, 0),
            config,
            bounds,
            surface: Point::new(width, height),
            scale: Point::new(1.0, 1.0),
        };
        view.adjust_to_aspect_ratio(width, height)?;
        Ok(view)
    }

    pub const fn config(&self) -> &ViewConfig {
        &self.config
    }

    pub const fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    pub const fn center(&self) -> Point<Number> {
        self.center
    }

    pub const fn surface(&self) -> Point<u32> {
        self.surface
    }

    /// Pixels per world unit on each axis.
    pub const fn scale(&self) -> Point<Number> {
        self.scale
    }

    /// Screen position of the top-left corner of the drawable area.
    pub const fn offset(&self) -> Point<i32> {
        self.offset
    }

    /// Drawable size in pixels, which is negative or zero for surfaces smaller
    /// than the label margin.
    pub fn drawable(&self) -> Point<i64> {
        drawable(self.surface, self.config.margin)
    }

    fn recompute(&mut self) {
        let drawable = self.drawable();
        let span = self.bounds.span();
        self.scale = Point::new(
            drawable.x.max(1) as Number / span.x,
            drawable.y.max(1) as Number / span.y,
        );
        trace!(scale.x = self.scale.x, scale.y = self.scale.y, "recomputed scale");
    }

    fn commit(&mut self, bounds: Bounds, center: Point<Number>) -> Result<Bounds, ViewErr> {
        if !bounds.is_valid() || !center.x.is_finite() || !center.y.is_finite() {
            return Err(ViewErr::InvalidBounds);
        }
        self.bounds = bounds;
        self.center = center;
        self.recompute();
        debug!(bounds = %self.bounds, "view changed");
        Ok(self.bounds.clone())
    }

    fn check_surface(&self, width: u32, height: u32) -> Result<Point<i64>, ViewErr> {
        let drawable = drawable(Point::new(width, height), self.config.margin);
        if drawable.x <= 0 || drawable.y <= 0 {
            Err(ViewErr::DegenerateSurface { width, height })
        } else {
            Ok(drawable)
        }
    }

    pub fn world_to_screen_x(&self, wx: Number) -> i32 {
        self.world_to_screen(Point::new(wx, 0.0)).x.round() as i32
    }

    pub fn world_to_screen_y(&self, wy: Number) -> i32 {
        self.world_to_screen(Point::new(0.0, wy)).y.round() as i32
    }

    pub fn screen_to_world_x(&self, px: i32) -> Number {
        self.screen_to_world(Point::new(px as Number, 0.0)).x
    }

    pub fn screen_to_world_y(&self, py: i32) -> Number {
        self.screen_to_world(Point::new(0.0, py as Number)).y
    }

    /// Unrounded world to screen mapping.
    pub fn world_to_screen(&self, p: Point<Number>) -> Point<Number> {
        Point::new(
            self.offset.x as Number + (p.x - self.bounds.x.start) * self.scale.x,
            self.offset.y as Number + (self.bounds.y.end - p.y) * self.scale.y,
        )
    }

    /// Unrounded screen to world mapping.
    pub fn screen_to_world(&self, p: Point<Number>) -> Point<Number> {
        Point::new(
            self.bounds.x.start + (p.x - self.offset.x as Number) / self.scale.x,
            self.bounds.y.end - (p.y - self.offset.y as Number) / self.scale.y,
        )
    }

    /// Restore the configured bounds, fitted to the current surface.
    pub fn reset_view(&mut self) -> Result<Bounds, ViewErr> {
        self.check_surface(self.surface.x, self.surface.y)?;
        let bounds = Bounds {
            x: self.config.x.clone(),
            y: self.config.y.clone(),
        };
        let center = bounds.mid();
        self.commit(bounds, center)?;
        self.adjust_to_aspect_ratio(self.surface.x, self.surface.y)
    }

    /// Show `bounds`, widened as needed to match the surface's aspect ratio.
    pub fn set_bounds(&mut self, bounds: Bounds) -> Result<Bounds, ViewErr> {
        self.check_surface(self.surface.x, self.surface.y)?;
        let previous = (self.bounds.clone(), self.center);
        let center = bounds.mid();
        self.commit(bounds, center)?;
        let adjusted = self.adjust_to_aspect_ratio(self.surface.x, self.surface.y);
        if adjusted.is_err() {
            (self.bounds, self.center) = previous;
            self.recompute();
        }
        adjusted
    }

    /// Move the window so `(x, y)` sits in the middle, keeping its size.
    pub fn center_at(&mut self, x: Number, y: Number) -> Result<Bounds, ViewErr> {
        let center = Point::new(x, y);
        let bounds = Bounds::centered(center, self.bounds.span());
        self.commit(bounds, center)
    }

    /// Scale both ranges by `factor` (below 1 zooms in), keeping the world point
    /// under `anchor` on the same pixel.
    pub fn zoom(&mut self, factor: Number, anchor: Point<i32>) -> Result<Bounds, ViewErr> {
        if !(factor.is_finite() && factor > 0.0) {
            return Err(ViewErr::InvalidZoom(factor));
        }
        self.check_surface(self.surface.x, self.surface.y)?;
        let world = self.screen_to_world(Point::new(anchor.x as Number, anchor.y as Number));
        let zoom_axis = |range: &Range<Number>, at: Number| {
            let span = range.end - range.start;
            let rel = (at - range.start) / span;
            let start = at - rel * span * factor;
            start..start + span * factor
        };
        let bounds = Bounds {
            x: zoom_axis(&self.bounds.x, world.x),
            y: zoom_axis(&self.bounds.y, world.y),
        };
        let center = bounds.mid();
        self.commit(bounds, center)
    }

    /// Drag the content by a pixel delta: moving right or down reveals world to
    /// the left or above.
    pub fn pan(&mut self, dx: i32, dy: i32) -> Result<Bounds, ViewErr> {
        self.check_surface(self.surface.x, self.surface.y)?;
        let shift = Point::new(
            -(dx as Number) / self.scale.x,
            dy as Number / self.scale.y,
        );
        let bounds = Bounds {
            x: self.bounds.x.start + shift.x..self.bounds.x.end + shift.x,
            y: self.bounds.y.start + shift.y..self.bounds.y.end + shift.y,
        };
        let center = bounds.mid();
        self.commit(bounds, center)
    }

    /// Fit the window to a surface of `width` by `height` pixels.
    ///
    /// When either axis would be drawn sparser than the minimum density, both
    /// ranges shrink about the stored center to exactly that density.
    /// Otherwise the axis that is too narrow for the surface's aspect ratio
    /// grows about its own midpoint.
    pub fn adjust_to_aspect_ratio(&mut self, width: u32, height: u32) -> Result<Bounds, ViewErr> {
        let drawable = self.check_surface(width, height)?;
        let previous = self.surface;
        self.surface = Point::new(width, height);
        let fitted = self.fit(Point::new(drawable.x as Number, drawable.y as Number));
        if fitted.is_err() {
            self.surface = previous;
            self.recompute();
        }
        fitted
    }

    fn fit(&mut self, drawable: Point<Number>) -> Result<Bounds, ViewErr> {
        let span = self.bounds.span();
        let density = Point::new(drawable.x / span.x, drawable.y / span.y);

        // slack so a window fitted by this branch is not refitted next call
        let min_density = self.config.min_density * (1.0 - 1e-9);
        if density.x < min_density || density.y < min_density {
            let span = Point::new(
                drawable.x / self.config.min_density,
                drawable.y / self.config.min_density,
            );
            let bounds = Bounds::centered(self.center, span);
            debug!(density.x = density.x, density.y = density.y, "view too sparse, shrinking");
            return self.commit(bounds, self.center);
        }

        let surface_ratio = drawable.x / drawable.y;
        let window_ratio = span.x / span.y;
        let mut span = span;
        if (window_ratio / surface_ratio - 1.0).abs() > self.config.aspect_tolerance {
            if window_ratio < surface_ratio {
                span.x = span.y * surface_ratio;
            } else {
                span.y = span.x / surface_ratio;
            }
        }
        let mid = self.bounds.mid();
        self.commit(Bounds::centered(mid, span), mid)
    }

    /// Decimal places for axis labels, coarser for wider views.
    pub fn label_precision(&self) -> usize {
        let span = self.bounds.span();
        let range = span.x.min(span.y);
        if range > 10.0 {
            2
        } else if range > 1.0 {
            3
        } else if range > 0.1 {
            4
        } else {
            5
        }
    }

    pub fn format_tick(&self, value: Number) -> String {
        // avoid printing "-0.00"
        let value = if value == 0.0 { 0.0 } else { value };
        format!("{value:.prec$}", prec = self.label_precision())
    }

    pub fn ticks_x(&self) -> Vec<Number> {
        ticks(&self.bounds.x, self.drawable().x)
    }

    pub fn ticks_y(&self) -> Vec<Number> {
        ticks(&self.bounds.y, self.drawable().y)
    }
}

fn drawable(surface: Point<u32>, margin: u32) -> Point<i64> {
    Point::new(
        i64::from(surface.x) - i64::from(margin),
        i64::from(surface.y) - i64::from(margin),
    )
}

/// Round `raw` up to the nearest 1, 2 or 5 times a power of ten.
fn nice_step(raw: Number) -> Number {
    let magnitude = (10.0 as Number).powf(raw.log10().floor());
    let norm = raw / magnitude;
    let nice = if norm <= 1.0 {
        1.0
    } else if norm <= 2.0 {
        2.0
    } else if norm <= 5.0 {
        5.0
    } else {
        10.0
    };
    nice * magnitude
}

fn ticks(range: &Range<Number>, pixels: i64) -> Vec<Number> {
    let span = range.end - range.start;
    if pixels <= 0 || !(span.is_finite() && span > 0.0) {
        return Vec::new();
    }
    let count = (pixels as Number / TICK_SPACING_PX).max(1.0);
    let step = nice_step(span / count);
    let first = (range.start / step).ceil() as i64;
    let last = (range.end / step).floor() as i64;
    (first..=last).map(|i| i as Number * step).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> ViewWindow {
        // 400x400 drawable for the default 20x20 window
        ViewWindow::new(ViewConfig::default(), 440, 440).expect("drawable surface")
    }

    fn approx(a: Number, b: Number) -> bool {
        (a - b).abs() < 1e-9 * a.abs().max(b.abs()).max(1.0)
    }

    fn approx_bounds(a: &Bounds, b: &Bounds) -> bool {
        approx(a.x.start, b.x.start)
            && approx(a.x.end, b.x.end)
            && approx(a.y.start, b.y.start)
            && approx(a.y.end, b.y.end)
    }

    #[test]
    fn square_surface_keeps_square_window() {
        let view = square();
        assert_eq!(view.bounds(), &Bounds { x: -10.0..10.0, y: -10.0..10.0 });
        assert!(approx(view.scale().x, 20.0));
        assert!(approx(view.scale().y, 20.0));
    }

    #[test]
    fn corners_map_to_drawable_area() {
        let view = square();
        assert_eq!(view.world_to_screen_x(-10.0), 40);
        assert_eq!(view.world_to_screen_x(10.0), 440);
        assert_eq!(view.world_to_screen_y(10.0), 0);
        assert_eq!(view.world_to_screen_y(-10.0), 400);
        assert!(approx(view.screen_to_world_x(240), 0.0));
        assert!(approx(view.screen_to_world_y(200), 0.0));
    }

    #[test]
    fn screen_roundtrip_within_a_pixel() {
        let mut view = square();
        view.zoom(0.37, Point::new(123, 321)).expect("zooms");
        let pixel = 1.0 / view.scale().x;
        for wx in [-3.3, 0.0, 1.25, 2.0] {
            let back = view.screen_to_world_x(view.world_to_screen_x(wx));
            assert!((back - wx).abs() <= pixel, "{wx} came back as {back}");
        }
    }

    #[test]
    fn wide_surface_widens_x() {
        let view = ViewWindow::new(ViewConfig::default(), 840, 440).expect("drawable surface");
        let bounds = view.bounds();
        assert!(approx(bounds.x.start, -20.0));
        assert!(approx(bounds.x.end, 20.0));
        assert_eq!(bounds.y, -10.0..10.0);
    }

    #[test]
    fn sparse_surface_shrinks_to_min_density() {
        // 100 drawable pixels over 20 units is 5 px/unit
        let view = ViewWindow::new(ViewConfig::default(), 140, 240).expect("drawable surface");
        let bounds = view.bounds();
        assert!(approx(bounds.x.end - bounds.x.start, 10.0));
        assert!(approx(bounds.y.end - bounds.y.start, 20.0));
        assert!(approx(view.scale().x, 10.0));
        assert!(approx(view.scale().y, 10.0));
    }

    #[test]
    fn adjust_is_idempotent() {
        for (w, h) in [(440, 440), (1000, 300), (140, 240), (300, 1200)] {
            let mut view = ViewWindow::new(ViewConfig::default(), w, h).expect("drawable surface");
            let first = view.adjust_to_aspect_ratio(w, h).expect("valid surface");
            let second = view.adjust_to_aspect_ratio(w, h).expect("valid surface");
            assert!(approx_bounds(&first, &second), "{w}x{h}: {first} then {second}");
        }
    }

    #[test]
    fn degenerate_surface_is_a_no_op() {
        let mut view = square();
        let before = view.bounds().clone();
        assert_eq!(
            view.adjust_to_aspect_ratio(30, 500),
            Err(ViewErr::DegenerateSurface {
                width: 30,
                height: 500
            })
        );
        assert_eq!(view.bounds(), &before);
        assert_eq!(view.surface(), Point::new(440, 440));
    }

    #[test]
    fn new_rejects_surface_without_room_to_draw() {
        assert_eq!(
            ViewWindow::new(ViewConfig::default(), 30, 30).map(|view| view.surface()),
            Err(ViewErr::DegenerateSurface {
                width: 30,
                height: 30
            })
        );
        assert!(ViewWindow::new(ViewConfig::default(), 440, 40).is_err());

        let config = ViewConfig {
            x: 1.0..1.0,
            ..ViewConfig::default()
        };
        assert_eq!(
            ViewWindow::new(config, 440, 440).map(|view| view.surface()),
            Err(ViewErr::InvalidBounds)
        );
    }

    #[test]
    fn zoom_keeps_anchor_still_and_undoes() {
        let mut view = square();
        let original = view.bounds().clone();
        let anchor = Point::new(100, 300);
        let world = view.screen_to_world(Point::new(100.0, 300.0));

        view.zoom(0.5, anchor).expect("zooms in");
        let after = view.screen_to_world(Point::new(100.0, 300.0));
        assert!(approx(world.x, after.x) && approx(world.y, after.y));
        assert!(approx(view.bounds().span().x, 10.0));

        view.zoom(2.0, anchor).expect("zooms out");
        assert!(approx_bounds(view.bounds(), &original));
    }

    #[test]
    fn zoom_rejects_bad_factor() {
        let mut view = square();
        assert_eq!(view.zoom(0.0, Point::new(0, 0)), Err(ViewErr::InvalidZoom(0.0)));
        assert!(view.zoom(Number::NAN, Point::new(0, 0)).is_err());
    }

    #[test]
    fn pan_inverts_vertical_direction() {
        let mut view = square();
        // 20 px is one world unit
        let bounds = view.pan(20, 20).expect("pans");
        assert!(approx(bounds.x.start, -11.0));
        assert!(approx(bounds.y.start, -9.0));
        assert!(approx(view.center().x, -1.0));
        assert!(approx(view.center().y, 1.0));
    }

    #[test]
    fn set_bounds_fits_surface() {
        let mut view = square();
        let fitted = view
            .set_bounds(Bounds { x: 0.0..4.0, y: 0.0..2.0 })
            .expect("valid bounds");
        assert!(approx_bounds(&fitted, &Bounds { x: 0.0..4.0, y: -1.0..3.0 }));

        let err = view.set_bounds(Bounds { x: 1.0..1.0, y: 0.0..2.0 });
        assert_eq!(err, Err(ViewErr::InvalidBounds));
        assert_eq!(view.bounds(), &fitted);
    }

    #[test]
    fn center_at_keeps_size() {
        let mut view = square();
        let bounds = view.center_at(5.0, -2.0).expect("centers");
        assert_eq!(bounds, Bounds { x: -5.0..15.0, y: -12.0..8.0 });
        let reset = view.reset_view().expect("resets");
        assert_eq!(reset, Bounds { x: -10.0..10.0, y: -10.0..10.0 });
    }

    #[test]
    fn precision_breakpoints() {
        let mut view = square();
        assert_eq!(view.label_precision(), 2);
        view.zoom(0.25, Point::new(240, 200)).expect("zooms");
        assert_eq!(view.label_precision(), 3);
        view.zoom(0.1, Point::new(240, 200)).expect("zooms");
        assert_eq!(view.label_precision(), 4);
        view.zoom(0.1, Point::new(240, 200)).expect("zooms");
        assert_eq!(view.label_precision(), 5);
        assert_eq!(view.format_tick(-0.0), "0.00000");
    }

    #[test]
    fn ticks_use_round_steps() {
        let view = square();
        // 400 px at 80 px spacing is 5 ticks over 20 units, so step 5
        assert_eq!(view.ticks_x(), vec![-10.0, -5.0, 0.0, 5.0, 10.0]);
        assert!(approx(nice_step(0.3), 0.5));
        assert_eq!(nice_step(7.0), 10.0);
    }
}
