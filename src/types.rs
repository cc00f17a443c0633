//! Common types and traits for 2D footprint geometry.
//!
//! Every layer is a flat packing problem, so positions and free areas live in
//! the XY plane. Depth only matters for the layer gate and is carried by the
//! blocks themselves.

/// Global numerical tolerance for floating-point comparisons.
///
/// Used for footprint comparisons (fit tests, containment, degenerate
/// remainders). The layer depth gate compares exactly.
pub const EPSILON_GENERAL: f64 = 1e-6;

/// A point in the footprint plane of a layer.
///
/// # Examples
/// ```
/// use layer_pack::types::Point2;
///
/// let p = Point2::new(10.0, 5.0);
/// assert_eq!(p.as_tuple(), (10.0, 5.0));
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// The lower left corner of every layer.
    #[inline]
    pub const fn origin() -> Self {
        Self::new(0.0, 0.0)
    }

    /// Converts to tuple format for API compatibility.
    #[inline]
    pub const fn as_tuple(&self) -> (f64, f64) {
        (self.x, self.y)
    }
}

impl From<(f64, f64)> for Point2 {
    #[inline]
    fn from(tuple: (f64, f64)) -> Self {
        Self::new(tuple.0, tuple.1)
    }
}

/// Axis-aligned rectangle in container coordinates.
///
/// `(x, y)` is the minimum corner, the rectangle extends towards positive
/// X and Y by `width` and `height`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    #[inline]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Creates a rectangle from its minimum corner and extents.
    #[inline]
    pub const fn from_origin(origin: Point2, width: f64, height: f64) -> Self {
        Self::new(origin.x, origin.y, width, height)
    }

    #[inline]
    pub fn min_x(&self) -> f64 {
        self.x
    }

    #[inline]
    pub fn min_y(&self) -> f64 {
        self.y
    }

    #[inline]
    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    #[inline]
    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }

    /// Minimum corner as a point.
    #[inline]
    pub fn origin(&self) -> Point2 {
        Point2::new(self.x, self.y)
    }

    #[inline]
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Checks whether an item of the given extents fits into this rectangle.
    #[inline]
    pub fn fits(&self, width: f64, height: f64) -> bool {
        width <= self.width + EPSILON_GENERAL && height <= self.height + EPSILON_GENERAL
    }

    /// Checks whether `other` lies completely inside this rectangle.
    ///
    /// Shared edges count as inside.
    #[inline]
    pub fn contains(&self, other: &Self) -> bool {
        other.min_x() + EPSILON_GENERAL >= self.min_x()
            && other.min_y() + EPSILON_GENERAL >= self.min_y()
            && other.max_x() <= self.max_x() + EPSILON_GENERAL
            && other.max_y() <= self.max_y() + EPSILON_GENERAL
    }

    /// Checks whether the interiors of two rectangles intersect.
    ///
    /// Rectangles that only touch along an edge do not intersect.
    #[inline]
    pub fn intersects(&self, other: &Self) -> bool {
        !(self.max_x() <= other.min_x() + EPSILON_GENERAL
            || other.max_x() <= self.min_x() + EPSILON_GENERAL
            || self.max_y() <= other.min_y() + EPSILON_GENERAL
            || other.max_y() <= self.min_y() + EPSILON_GENERAL)
    }

    /// A rectangle with no usable area (width or height at most the tolerance).
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.width <= EPSILON_GENERAL || self.height <= EPSILON_GENERAL
    }
}

/// Trait for objects with 3D extents.
///
/// Width and height span the footprint plane, depth runs along the stacking axis.
pub trait Dimensional {
    /// Returns `(width, height, depth)`.
    fn dimensions(&self) -> (f64, f64, f64);

    /// Area of the 2D projection (width × height).
    fn footprint_area(&self) -> f64 {
        let (w, h, _) = self.dimensions();
        w * h
    }

    /// Volume (width × height × depth).
    fn volume(&self) -> f64 {
        let (w, h, d) = self.dimensions();
        w * h * d
    }
}

/// Checks that a single extent is positive and finite.
pub(crate) fn is_valid_extent(value: f64) -> bool {
    value > 0.0 && value.is_finite()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_edges() {
        let r = Rect::new(10.0, 20.0, 30.0, 40.0);
        assert_eq!(r.min_x(), 10.0);
        assert_eq!(r.min_y(), 20.0);
        assert_eq!(r.max_x(), 40.0);
        assert_eq!(r.max_y(), 60.0);
        assert_eq!(r.area(), 1200.0);
        assert_eq!(r.origin(), Point2::new(10.0, 20.0));
    }

    #[test]
    fn test_rect_contains() {
        let outer = Rect::new(0.0, 0.0, 100.0, 100.0);
        assert!(outer.contains(&Rect::new(0.0, 0.0, 100.0, 100.0)));
        assert!(outer.contains(&Rect::new(10.0, 10.0, 20.0, 20.0)));
        assert!(!outer.contains(&Rect::new(90.0, 0.0, 20.0, 20.0)));
        assert!(!outer.contains(&Rect::new(-1.0, 0.0, 20.0, 20.0)));
    }

    #[test]
    fn test_rect_intersects() {
        let a = Rect::new(0.0, 0.0, 50.0, 50.0);
        let b = Rect::new(25.0, 25.0, 50.0, 50.0);
        assert!(a.intersects(&b));
        assert!(b.intersects(&a));

        // Touching edges
        let right = Rect::new(50.0, 0.0, 50.0, 50.0);
        let above = Rect::new(0.0, 50.0, 50.0, 50.0);
        assert!(!a.intersects(&right));
        assert!(!a.intersects(&above));
    }

    #[test]
    fn test_rect_fits() {
        let r = Rect::new(0.0, 0.0, 50.0, 20.0);
        assert!(r.fits(50.0, 20.0));
        assert!(r.fits(10.0, 10.0));
        assert!(!r.fits(20.0, 50.0));
        assert!(!r.fits(50.1, 20.0));
    }

    #[test]
    fn test_rect_degenerate() {
        assert!(Rect::new(0.0, 0.0, 0.0, 10.0).is_degenerate());
        assert!(Rect::new(0.0, 0.0, 10.0, -1.0).is_degenerate());
        assert!(!Rect::new(0.0, 0.0, 10.0, 10.0).is_degenerate());
    }

    #[test]
    fn test_valid_extent() {
        assert!(is_valid_extent(1.0));
        assert!(!is_valid_extent(0.0));
        assert!(!is_valid_extent(-3.0));
        assert!(!is_valid_extent(f64::NAN));
        assert!(!is_valid_extent(f64::INFINITY));
    }
}
