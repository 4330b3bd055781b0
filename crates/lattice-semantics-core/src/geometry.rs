//! Geometry types for semantics node bounds.
//!
//! Semantics nodes carry their bounding rectangle in global (window)
//! coordinates, as supplied by the render tree at construction time.

use serde::ser::{Serialize, SerializeStruct, Serializer};

/// A point in 2D space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    /// Create a new point.
    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// The origin point (0, 0).
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };
}

/// A size in 2D space (width and height).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    /// Create a new size.
    #[inline]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Zero size.
    pub const ZERO: Self = Self {
        width: 0.0,
        height: 0.0,
    };
}

/// A rectangle defined by origin and size, in global coordinates.
///
/// On the wire a rectangle is encoded by its edges
/// (`left`, `top`, `right`, `bottom`), which is what native accessibility
/// services expect.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Rect {
    /// Create a new rectangle from origin and size.
    #[inline]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            origin: Point { x, y },
            size: Size { width, height },
        }
    }

    /// Empty rectangle at origin.
    pub const ZERO: Self = Self {
        origin: Point::ZERO,
        size: Size::ZERO,
    };

    /// Left edge x coordinate.
    #[inline]
    pub fn left(&self) -> f32 {
        self.origin.x
    }

    /// Top edge y coordinate.
    #[inline]
    pub fn top(&self) -> f32 {
        self.origin.y
    }

    /// Right edge x coordinate.
    #[inline]
    pub fn right(&self) -> f32 {
        self.origin.x + self.size.width
    }

    /// Bottom edge y coordinate.
    #[inline]
    pub fn bottom(&self) -> f32 {
        self.origin.y + self.size.height
    }

    /// Width of the rectangle.
    #[inline]
    pub fn width(&self) -> f32 {
        self.size.width
    }

    /// Height of the rectangle.
    #[inline]
    pub fn height(&self) -> f32 {
        self.size.height
    }
}

impl Serialize for Rect {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Rect", 4)?;
        state.serialize_field("left", &self.left())?;
        state.serialize_field("top", &self.top())?;
        state.serialize_field("right", &self.right())?;
        state.serialize_field("bottom", &self.bottom())?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_edges() {
        let rect = Rect::new(10.0, 20.0, 100.0, 50.0);
        assert_eq!(rect.left(), 10.0);
        assert_eq!(rect.top(), 20.0);
        assert_eq!(rect.right(), 110.0);
        assert_eq!(rect.bottom(), 70.0);
    }

    #[test]
    fn test_zero_rect_collapses_to_origin() {
        let zero = Rect::ZERO;
        assert_eq!(zero.right(), 0.0);
        assert_eq!(zero.bottom(), 0.0);
        assert_eq!(zero, Rect::default());
    }

    #[test]
    fn test_rect_serializes_as_edges() {
        let json = serde_json::to_value(Rect::new(1.0, 2.0, 3.0, 4.0)).unwrap();
        assert_eq!(json["left"], 1.0);
        assert_eq!(json["top"], 2.0);
        assert_eq!(json["right"], 4.0);
        assert_eq!(json["bottom"], 6.0);
    }
}
