//! Geometry primitives.
//!
//! Bounding boxes are measured in device pixels with a top-left origin,
//! relative to the viewport. Everything in this module is pure: no I/O,
//! no caching, same inputs give the same answer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A point in 2D space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
}

impl Point {
    /// Create a new point
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Bounding box of a rendered element
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// X position
    pub x: f64,
    /// Y position
    pub y: f64,
    /// Width (never negative)
    pub width: f64,
    /// Height (never negative)
    pub height: f64,
}

impl BoundingBox {
    /// Create a new bounding box, clamping negative extents to zero
    #[must_use]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width: width.max(0.0),
            height: height.max(0.0),
        }
    }

    /// Zero-sized box at a position
    #[must_use]
    pub fn at(x: f64, y: f64) -> Self {
        Self::new(x, y, 0.0, 0.0)
    }

    /// Right edge
    #[must_use]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge
    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Get the center point
    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Rendered area
    #[must_use]
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// True when the box occupies no rendered area
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.area() <= 0.0
    }

    /// Check if a point is inside this bounding box
    #[must_use]
    pub fn contains(&self, point: &Point) -> bool {
        point.x >= self.x
            && point.x <= self.right()
            && point.y >= self.y
            && point.y <= self.bottom()
    }

    /// Check whether two boxes overlap with positive area
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// Value of the box on an axis
    #[must_use]
    pub const fn value(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Width => self.width,
            Axis::Height => self.height,
        }
    }

    /// Compare every component within `tolerance` pixels
    #[must_use]
    pub fn approx_eq(&self, other: &Self, tolerance: f64) -> bool {
        Axis::ALL
            .iter()
            .all(|axis| (self.value(*axis) - other.value(*axis)).abs() <= tolerance)
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "x={:.0} y={:.0} w={:.0} h={:.0}",
            self.x, self.y, self.width, self.height
        )
    }
}

/// Measurable component of a bounding box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    /// Left edge
    X,
    /// Top edge
    Y,
    /// Horizontal extent
    Width,
    /// Vertical extent
    Height,
}

impl Axis {
    /// All axes, in declaration order
    pub const ALL: [Self; 4] = [Self::X, Self::Y, Self::Width, Self::Height];

    /// Lower-case name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::X => "x",
            Self::Y => "y",
            Self::Width => "width",
            Self::Height => "height",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a threshold comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bound {
    /// Value must be `<= limit`
    AtMost,
    /// Value must be `>= limit`
    AtLeast,
    /// Value must be `< limit`
    Below,
    /// Value must be `> limit`
    Above,
}

impl Bound {
    /// Apply the comparison
    #[must_use]
    pub fn holds(self, value: f64, limit: f64) -> bool {
        match self {
            Self::AtMost => value <= limit,
            Self::AtLeast => value >= limit,
            Self::Below => value < limit,
            Self::Above => value > limit,
        }
    }

    /// Comparison operator as text
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::AtMost => "<=",
            Self::AtLeast => ">=",
            Self::Below => "<",
            Self::Above => ">",
        }
    }
}

/// Check a box dimension against a limit.
///
/// Used for collapsed/expanded width classification:
/// `within_threshold(b, Axis::Width, 70.0, Bound::AtMost)`.
#[must_use]
pub fn within_threshold(bbox: &BoundingBox, axis: Axis, limit: f64, bound: Bound) -> bool {
    bound.holds(bbox.value(axis), limit)
}

/// Max minus min of the coordinate on `axis`; zero for fewer than two boxes.
#[must_use]
pub fn spread(boxes: &[BoundingBox], axis: Axis) -> f64 {
    let mut values = boxes.iter().map(|b| b.value(axis));
    let Some(first) = values.next() else {
        return 0.0;
    };
    let (min, max) = values.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
    max - min
}

/// Boxes form a column: narrow horizontal spread, and taller than wide.
#[must_use]
pub fn is_vertically_aligned(boxes: &[BoundingBox], tolerance: f64) -> bool {
    let x_spread = spread(boxes, Axis::X);
    let y_spread = spread(boxes, Axis::Y);
    x_spread < tolerance && y_spread > x_spread
}
