// SPDX: CC0-1.0

use crate::{
    eval::{EvalErr, Expression},
    view::ViewWindow,
    Number, Point,
};
use tracing::trace;

/// One unbroken visible stretch of a curve, in screen coordinates.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PathSegment {
    pub points: Vec<Point<Number>>,
}

impl PathSegment {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Segments produced by one pass, plus how many columns could be drawn.
#[derive(Debug)]
pub struct Raster<E> {
    pub segments: Vec<PathSegment>,
    pub valid: usize,
    pub invalid: usize,
    pub first_err: Option<E>,
}

impl<E> Raster<E> {
    /// True when not a single column produced a finite value.
    pub fn is_blank(&self) -> bool {
        self.valid == 0
    }
}

pub fn rasterize(expr: &Expression, view: &ViewWindow) -> Vec<PathSegment> {
    rasterize_fn(|x| expr.eval(x), view).segments
}

/// Like [`rasterize`], keeping per-column statistics.
pub fn rasterize_expr(expr: &Expression, view: &ViewWindow) -> Raster<EvalErr> {
    rasterize_fn(|x| expr.eval(x), view)
}

/// Walk every column of the drawable area, sampling `f` at the column's world
/// x. Errors and non-finite values leave gaps; leaving or entering the visible
/// y range is clipped exactly at the boundary.
pub fn rasterize_fn<F, E>(mut f: F, view: &ViewWindow) -> Raster<E>
where
    F: FnMut(Number) -> Result<Number, E>,
{
    let mut out = Raster {
        segments: Vec::new(),
        valid: 0,
        invalid: 0,
        first_err: None,
    };
    let drawable = view.drawable();
    if drawable.x <= 0 || drawable.y <= 0 {
        return out;
    }

    let band = view.bounds().y.clone();
    let first = view.offset().x;
    let last = first.saturating_add(drawable.x.min(i64::from(i32::MAX)) as i32);
    let mut open: Option<PathSegment> = None;
    let mut prev: Option<Point<Number>> = None;

    let close = |open: &mut Option<PathSegment>, segments: &mut Vec<PathSegment>| {
        if let Some(seg) = open.take().filter(|seg| !seg.is_empty()) {
            segments.push(seg);
        }
    };
    let crossing = |p0: Point<Number>, p1: Point<Number>, at: Number| {
        let t = (at - p0.y) / (p1.y - p0.y);
        view.world_to_screen(Point::new(p0.x + t * (p1.x - p0.x), at))
    };
    // boundary a sample outside the band has violated
    let boundary = |y: Number| if y > band.end { band.end } else { band.start };

    for px in first..=last {
        let x = view.screen_to_world_x(px);
        let y = match f(x) {
            Ok(y) if y.is_finite() => y,
            Ok(_) => {
                out.invalid += 1;
                close(&mut open, &mut out.segments);
                prev = None;
                continue;
            }
            Err(err) => {
                out.invalid += 1;
                out.first_err.get_or_insert(err);
                close(&mut open, &mut out.segments);
                prev = None;
                continue;
            }
        };
        out.valid += 1;

        let cur = Point::new(x, y);
        let screen = Point::new(px as Number, view.world_to_screen(cur).y);
        let inside = band.start <= y && y <= band.end;

        match prev {
            None => {
                if inside {
                    open = Some(PathSegment {
                        points: vec![screen],
                    });
                }
            }
            Some(p) => {
                let prev_inside = band.start <= p.y && p.y <= band.end;
                match (prev_inside, inside) {
                    (true, true) => {
                        open.get_or_insert_with(PathSegment::default)
                            .points
                            .push(screen);
                    }
                    (false, true) => {
                        close(&mut open, &mut out.segments);
                        open = Some(PathSegment {
                            points: vec![crossing(p, cur, boundary(p.y)), screen],
                        });
                    }
                    (true, false) => {
                        let edge = crossing(p, cur, boundary(y));
                        open.get_or_insert_with(PathSegment::default)
                            .points
                            .push(edge);
                        close(&mut open, &mut out.segments);
                    }
                    (false, false) => {
                        if boundary(p.y) != boundary(y) {
                            // crossed the whole band between two columns
                            out.segments.push(PathSegment {
                                points: vec![
                                    crossing(p, cur, boundary(p.y)),
                                    crossing(p, cur, boundary(y)),
                                ],
                            });
                        }
                    }
                }
            }
        }
        prev = Some(cur);
    }
    close(&mut open, &mut out.segments);

    trace!(
        segments = out.segments.len(),
        valid = out.valid,
        invalid = out.invalid,
        "rasterized"
    );
    out
}
