// SPDX-License-Identifier: MIT
//
// Geometry — the value types every other layer speaks.
//
// Coordinates are signed: a drawable may be positioned partially off-screen,
// and coordinate transforms pass through negative space freely. Sizes are
// signed too (so arithmetic with points never needs casts) but are validated
// at construction: a `Size` with a zero or negative dimension cannot exist.
//
// Edges follow the half-open convention used by the frame buffer:
//
//   min_x ≤ x < max_x,  min_y ≤ y < max_y
//
// All types are `Copy` and every operation returns a new value.

use std::fmt;

use crate::{Error, Result};

// ─── Point ──────────────────────────────────────────────────────────────────

/// A cell position. May be negative (off-surface).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    /// The origin, `(0, 0)`.
    pub const ORIGIN: Self = Self::new(0, 0);

    #[inline]
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Shift by `(dx, dy)`.
    #[inline]
    #[must_use]
    pub const fn translate(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
        }
    }

    /// Shift by another point's components.
    #[inline]
    #[must_use]
    pub const fn offset(self, by: Self) -> Self {
        self.translate(by.x, by.y)
    }

    /// Component-wise difference `self - other`.
    #[inline]
    #[must_use]
    pub const fn delta_from(self, other: Self) -> Self {
        Self {
            x: self.x.saturating_sub(other.x),
            y: self.y.saturating_sub(other.y),
        }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

// ─── Size ───────────────────────────────────────────────────────────────────

/// Dimensions in character cells. Both sides are at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Size {
    width: i32,
    height: i32,
}

impl Size {
    /// The classic 80×24 terminal.
    pub const DEFAULT_TERMINAL: Self = Self { width: 80, height: 24 };

    /// Validate and build a size.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidGeometry`] if either dimension is below 1.
    pub fn new(width: i32, height: i32) -> Result<Self> {
        if width < 1 || height < 1 {
            return Err(Error::InvalidGeometry { width, height });
        }
        Ok(Self { width, height })
    }

    /// Build from terminal-style unsigned dimensions (as reported by
    /// `TIOCGWINSZ` or a resize notification).
    ///
    /// # Errors
    ///
    /// [`Error::InvalidGeometry`] if either dimension is zero.
    pub fn from_cells(cols: u16, rows: u16) -> Result<Self> {
        Self::new(i32::from(cols), i32::from(rows))
    }

    #[inline]
    #[must_use]
    pub const fn width(self) -> i32 {
        self.width
    }

    #[inline]
    #[must_use]
    pub const fn height(self) -> i32 {
        self.height
    }

    /// Number of cells, `width × height`.
    #[inline]
    #[must_use]
    pub const fn capacity(self) -> i64 {
        self.width as i64 * self.height as i64
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

// ─── Rect ───────────────────────────────────────────────────────────────────

/// An origin plus a validated size.
///
/// # Examples
///
/// ```
/// use loom_term::geometry::{Point, Rect};
///
/// let r = Rect::new(10, 5, 80, 24).unwrap();
/// assert!(r.contains_point(Point::new(10, 5)));   // top-left: inside
/// assert!(r.contains_point(Point::new(89, 28)));  // bottom-right: inside
/// assert!(!r.contains_point(Point::new(90, 5)));  // right edge is exclusive
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rect {
    origin: Point,
    size: Size,
}

impl Rect {
    /// Validate and build a rectangle from its components.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidGeometry`] if `width` or `height` is below 1.
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Result<Self> {
        Size::new(width, height).map(|size| Self::from_parts(Point::new(x, y), size))
    }

    /// Combine an origin with an already-validated size. Infallible.
    #[inline]
    #[must_use]
    pub const fn from_parts(origin: Point, size: Size) -> Self {
        Self { origin, size }
    }

    /// Rectangle spanning `min` (inclusive) to `max` (exclusive).
    ///
    /// # Errors
    ///
    /// [`Error::InvalidGeometry`] if the span is empty on either axis.
    pub fn from_corners(min: Point, max: Point) -> Result<Self> {
        Self::new(min.x, min.y, max.x.saturating_sub(min.x), max.y.saturating_sub(min.y))
    }

    /// A rect at the origin covering a whole size (e.g. the terminal).
    #[inline]
    #[must_use]
    pub const fn of_size(size: Size) -> Self {
        Self::from_parts(Point::ORIGIN, size)
    }

    #[inline]
    #[must_use]
    pub const fn origin(self) -> Point {
        self.origin
    }

    #[inline]
    #[must_use]
    pub const fn size(self) -> Size {
        self.size
    }

    #[inline]
    #[must_use]
    pub const fn width(self) -> i32 {
        self.size.width
    }

    #[inline]
    #[must_use]
    pub const fn height(self) -> i32 {
        self.size.height
    }

    #[inline]
    #[must_use]
    pub const fn min_x(self) -> i32 {
        self.origin.x
    }

    #[inline]
    #[must_use]
    pub const fn min_y(self) -> i32 {
        self.origin.y
    }

    /// Right edge (exclusive).
    #[inline]
    #[must_use]
    pub const fn max_x(self) -> i32 {
        self.origin.x.saturating_add(self.size.width)
    }

    /// Bottom edge (exclusive).
    #[inline]
    #[must_use]
    pub const fn max_y(self) -> i32 {
        self.origin.y.saturating_add(self.size.height)
    }

    /// The same size translated to `(0, 0)`: a drawable's local bounds.
    #[inline]
    #[must_use]
    pub const fn zero(self) -> Self {
        Self::of_size(self.size)
    }

    /// The same size at a new origin.
    #[inline]
    #[must_use]
    pub const fn with_origin(self, origin: Point) -> Self {
        Self::from_parts(origin, self.size)
    }

    /// Shift by `(dx, dy)`.
    #[inline]
    #[must_use]
    pub const fn translate(self, dx: i32, dy: i32) -> Self {
        self.with_origin(self.origin.translate(dx, dy))
    }

    /// Whether `p` lies inside (half-open).
    #[inline]
    #[must_use]
    pub const fn contains_point(self, p: Point) -> bool {
        p.x >= self.min_x() && p.x < self.max_x() && p.y >= self.min_y() && p.y < self.max_y()
    }

    /// Whether `other` lies entirely inside `self`.
    #[inline]
    #[must_use]
    pub const fn contains_rect(self, other: Self) -> bool {
        other.min_x() >= self.min_x()
            && other.min_y() >= self.min_y()
            && other.max_x() <= self.max_x()
            && other.max_y() <= self.max_y()
    }

    /// Whether the two rectangles share at least one cell.
    #[inline]
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.min_x() < other.max_x()
            && other.min_x() < self.max_x()
            && self.min_y() < other.max_y()
            && other.min_y() < self.max_y()
    }

    /// The overlapping region, or `None` if the rectangles are disjoint.
    #[must_use]
    pub fn clip(self, other: Self) -> Option<Self> {
        let min = Point::new(self.min_x().max(other.min_x()), self.min_y().max(other.min_y()));
        let max = Point::new(self.max_x().min(other.max_x()), self.max_y().min(other.max_y()));
        Self::from_corners(min, max).ok()
    }

    /// The smallest rectangle covering both.
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        let min = Point::new(self.min_x().min(other.min_x()), self.min_y().min(other.min_y()));
        let max = Point::new(self.max_x().max(other.max_x()), self.max_y().max(other.max_y()));
        // Both inputs are non-empty, so the span is too.
        Self::from_parts(
            min,
            Size {
                width: max.x.saturating_sub(min.x),
                height: max.y.saturating_sub(min.y),
            },
        )
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{}", self.size, self.origin)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rect(x: i32, y: i32, w: i32, h: i32) -> Rect {
        Rect::new(x, y, w, h).unwrap()
    }

    // ── Size ────────────────────────────────────────────────────────────

    #[test]
    fn size_rejects_zero_width() {
        assert_eq!(
            Size::new(0, 5),
            Err(Error::InvalidGeometry { width: 0, height: 5 })
        );
    }

    #[test]
    fn size_rejects_negative_height() {
        assert!(Size::new(3, -1).is_err());
    }

    #[test]
    fn size_minimum_is_one_by_one() {
        let s = Size::new(1, 1).unwrap();
        assert_eq!(s.capacity(), 1);
    }

    #[test]
    fn size_from_cells_rejects_zero_rows() {
        assert!(Size::from_cells(80, 0).is_err());
        assert_eq!(Size::from_cells(80, 24).unwrap().capacity(), 1920);
    }

    // ── Rect construction ───────────────────────────────────────────────

    #[test]
    fn rect_rejects_empty() {
        assert!(Rect::new(0, 0, 0, 10).is_err());
    }

    #[test]
    fn rect_edges() {
        let r = rect(5, 5, 10, 4);
        assert_eq!((r.min_x(), r.min_y(), r.max_x(), r.max_y()), (5, 5, 15, 9));
    }

    #[test]
    fn zero_rect_keeps_size() {
        let r = rect(-3, 7, 10, 4);
        assert_eq!(r.zero(), rect(0, 0, 10, 4));
    }

    #[test]
    fn from_corners_rejects_inverted_span() {
        assert!(Rect::from_corners(Point::new(5, 5), Point::new(5, 9)).is_err());
    }

    // ── Queries ─────────────────────────────────────────────────────────

    #[test]
    fn negative_origin_contains() {
        let r = rect(-5, -5, 10, 10);
        assert!(r.contains_point(Point::new(-5, -5)));
        assert!(r.contains_point(Point::new(4, 4)));
        assert!(!r.contains_point(Point::new(5, 0)));
    }

    #[test]
    fn contains_rect_is_inclusive_of_edges() {
        let outer = rect(0, 0, 80, 24);
        assert!(outer.contains_rect(rect(0, 0, 80, 24)));
        assert!(outer.contains_rect(rect(70, 20, 10, 4)));
        assert!(!outer.contains_rect(rect(71, 20, 10, 4)));
    }

    #[test]
    fn adjacent_rects_do_not_intersect() {
        assert!(!rect(0, 0, 10, 10).intersects(rect(10, 0, 5, 5)));
        assert!(rect(0, 0, 10, 10).intersects(rect(9, 9, 5, 5)));
    }

    #[test]
    fn clip_overlap() {
        assert_eq!(rect(0, 0, 10, 10).clip(rect(5, 5, 10, 10)), Some(rect(5, 5, 5, 5)));
    }

    #[test]
    fn clip_disjoint_is_none() {
        assert_eq!(rect(0, 0, 10, 10).clip(rect(20, 20, 5, 5)), None);
    }

    #[test]
    fn union_covers_both() {
        assert_eq!(rect(0, 0, 2, 2).union(rect(5, 6, 1, 1)), rect(0, 0, 6, 7));
    }

    #[test]
    fn translate_returns_new_value() {
        let r = rect(1, 1, 3, 3);
        let moved = r.translate(-4, 2);
        assert_eq!(r, rect(1, 1, 3, 3));
        assert_eq!(moved, rect(-3, 3, 3, 3));
    }

    proptest! {
        #[test]
        fn capacity_is_product(w in 1i32..5000, h in 1i32..5000) {
            let s = Size::new(w, h).unwrap();
            prop_assert_eq!(s.capacity(), i64::from(w) * i64::from(h));
        }

        #[test]
        fn non_positive_sizes_always_fail(w in -100i32..=0, h in -100i32..100) {
            prop_assert!(Size::new(w, h).is_err());
            prop_assert!(Size::new(h.abs() + 1, w).is_err());
        }

        #[test]
        fn clip_lies_inside_both(
            ax in -50i32..50, ay in -50i32..50, aw in 1i32..40, ah in 1i32..40,
            bx in -50i32..50, by in -50i32..50, bw in 1i32..40, bh in 1i32..40,
        ) {
            let a = rect(ax, ay, aw, ah);
            let b = rect(bx, by, bw, bh);
            match a.clip(b) {
                Some(c) => {
                    prop_assert!(a.intersects(b));
                    prop_assert!(a.contains_rect(c) && b.contains_rect(c));
                }
                None => prop_assert!(!a.intersects(b)),
            }
        }
    }
}
