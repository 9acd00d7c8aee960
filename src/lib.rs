// SPDX: CC0-1.0

pub mod axis;
pub mod curve;
pub mod doc;
pub mod expr;
pub mod lex;
pub mod parse;
pub mod registry;
pub mod shell;
pub mod stdlib;

#[cfg(test)]
mod tests;

use core::{fmt, ops::Range};

pub type Number = f64;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point<T> {
    pub x: T,
    pub y: T,
}

/// Mapping between logical coordinates and canvas pixels.
///
/// Canvas y grows downward while logical y grows upward, so the y axis is
/// flipped in both directions of the transform.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    /// Pixels per logical unit, always positive.
    pub scale: Number,
    /// Pixel position of the logical origin.
    pub origin: Point<Number>,
    pub width: Number,
    pub height: Number,
}

impl Viewport {
    /// Viewport of the given size with the logical origin at its center.
    pub fn centered(scale: Number, width: Number, height: Number) -> Self {
        Self {
            scale,
            origin: Point {
                x: width * 0.5,
                y: height * 0.5,
            },
            width,
            height,
        }
    }

    pub fn to_logical(&self, p: Point<Number>) -> Point<Number> {
        Point {
            x: (p.x - self.origin.x) / self.scale,
            y: (self.origin.y - p.y) / self.scale,
        }
    }

    pub fn to_canvas(&self, p: Point<Number>) -> Point<Number> {
        Point {
            x: p.x * self.scale + self.origin.x,
            y: p.y * -self.scale + self.origin.y,
        }
    }

    /// Logical x values covered by the canvas, left to right.
    pub fn x_range(&self) -> Range<Number> {
        let left = self.to_logical(Point { x: 0.0, y: 0.0 }).x;
        let right = self.to_logical(Point {
            x: self.width,
            y: 0.0,
        })
        .x;
        left..right
    }

    /// Logical y values covered by the canvas, bottom to top.
    pub fn y_range(&self) -> Range<Number> {
        let top = self.to_logical(Point { x: 0.0, y: 0.0 }).y;
        let bottom = self
            .to_logical(Point {
                x: 0.0,
                y: self.height,
            })
            .y;
        bottom..top
    }
}

impl fmt::Display for Viewport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Viewport")
            .field("scale", &self.scale)
            .field("origin", &(self.origin.x, self.origin.y))
            .field("size", &(self.width, self.height))
            .finish()
    }
}

#[cfg(test)]
mod viewport_tests {
    use super::*;

    #[test]
    fn centered_viewport_maps_center_to_origin() {
        let view = Viewport::centered(50.0, 200.0, 100.0);
        let p = view.to_logical(Point { x: 100.0, y: 50.0 });
        assert_eq!(p, Point { x: 0.0, y: 0.0 });
        assert_eq!(view.x_range(), -2.0..2.0);
        assert_eq!(view.y_range(), -1.0..1.0);
    }

    #[test]
    fn canvas_y_is_flipped() {
        let view = Viewport::centered(10.0, 100.0, 100.0);
        let p = view.to_canvas(Point { x: 1.0, y: 2.0 });
        assert_eq!(p, Point { x: 60.0, y: 30.0 });
        assert_eq!(view.to_logical(p), Point { x: 1.0, y: 2.0 });
    }
}
