// SPDX: CC0-1.0

use crate::{eval::Expression, Number, Point};
use tracing::trace;

/// Bracket width or residual at which bisection stops, and the distance below
/// which two roots count as the same point.
pub const TOLERANCE: Number = 1e-6;
pub const MAX_ITERATIONS: usize = 50;

const MAX_STEP: Number = 0.1;
const STEPS_PER_RANGE: Number = 1000.0;
const EQUALITY_SAMPLES: usize = 10;
const EQUALITY_EPSILON: Number = 1e-10;

pub fn find_intersections(
    a: &Expression,
    b: &Expression,
    x_min: Number,
    x_max: Number,
) -> Vec<Point<Number>> {
    find_intersections_fn(|x| a.eval(x), |x| b.eval(x), x_min, x_max)
}

/// Locate the x values in `[x_min, x_max]` where `a` and `b` agree, paired
/// with `a`'s value there.
///
/// The difference is sampled at a fixed step and every sign change between
/// two consecutive valid samples is refined by bisection. Samples where either
/// side fails or is not finite are skipped. A bracket around a pole is dropped
/// once bisection lands on a failing sample or the residual grows.
pub fn find_intersections_fn<A, B, E>(
    a: A,
    b: B,
    x_min: Number,
    x_max: Number,
) -> Vec<Point<Number>>
where
    A: Fn(Number) -> Result<Number, E>,
    B: Fn(Number) -> Result<Number, E>,
{
    let span = x_max - x_min;
    if !(span.is_finite() && span > 0.0) {
        return Vec::new();
    }
    let d = |x: Number| match (a(x), b(x)) {
        (Ok(ya), Ok(yb)) => Some(ya - yb).filter(|d| d.is_finite()),
        _ => None,
    };

    if coincide(&d, x_min, x_max) {
        trace!(x_min, x_max, "functions coincide, skipping");
        return Vec::new();
    }

    let step = MAX_STEP.min(span / STEPS_PER_RANGE);
    let count = (span / step).ceil() as u64;
    let mut found: Vec<Point<Number>> = Vec::new();
    let mut prev: Option<(Number, Number)> = None;

    for i in 0..=count {
        // index based so long ranges do not accumulate drift
        let x = (x_min + i as Number * step).min(x_max);
        let Some(dx) = d(x) else {
            continue;
        };
        if let Some((px, pd)) = prev {
            let brackets = pd == 0.0 || dx == 0.0 || pd.signum() != dx.signum();
            if brackets {
                if let Some(root) = bisect(&d, px, pd, x, dx) {
                    let duplicate = found.iter().any(|p| (p.x - root).abs() < TOLERANCE);
                    if !duplicate {
                        if let Some(y) = a(root).ok().filter(|y| y.is_finite()) {
                            found.push(Point::new(root, y));
                        }
                    }
                }
            }
        }
        prev = Some((x, dx));
    }

    trace!(count = found.len(), x_min, x_max, "intersections found");
    found
}

/// True when every conclusive sample of the difference is zero.
fn coincide<D>(d: &D, x_min: Number, x_max: Number) -> bool
where
    D: Fn(Number) -> Option<Number>,
{
    let step = (x_max - x_min) / (EQUALITY_SAMPLES - 1) as Number;
    let mut conclusive = 0;
    for i in 0..EQUALITY_SAMPLES {
        if let Some(diff) = d(x_min + i as Number * step) {
            if diff.abs() >= EQUALITY_EPSILON {
                return false;
            }
            conclusive += 1;
        }
    }
    conclusive > 0
}

fn bisect<D>(d: &D, mut lo: Number, mut d_lo: Number, mut hi: Number, d_hi: Number) -> Option<Number>
where
    D: Fn(Number) -> Option<Number>,
{
    if d_lo == 0.0 {
        return Some(lo);
    }
    if d_hi == 0.0 {
        return Some(hi);
    }
    let bound = d_lo.abs().max(d_hi.abs());

    for iteration in 1..=MAX_ITERATIONS {
        let mid = (lo + hi) * 0.5;
        let d_mid = d(mid)?;
        if hi - lo < TOLERANCE || d_mid.abs() < TOLERANCE || iteration == MAX_ITERATIONS {
            // a residual that grew while the bracket shrank is a pole
            return (d_mid.abs() <= bound).then_some(mid);
        }
        if d_lo.signum() != d_mid.signum() {
            hi = mid;
        } else {
            lo = mid;
            d_lo = d_mid;
        }
    }
    None
}
