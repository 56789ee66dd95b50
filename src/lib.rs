// SPDX: CC0-1.0

pub mod eval;
pub mod intersect;
pub mod lex;
pub mod parse;
pub mod raster;
pub mod session;
pub mod shell;
pub mod stdlib;
pub mod svg;
pub mod view;

pub type Number = f64;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point<T> {
    pub x: T,
    pub y: T,
}

impl<T> Point<T> {
    #[inline]
    pub const fn new(x: T, y: T) -> Self {
        Self { x, y }
    }
}
