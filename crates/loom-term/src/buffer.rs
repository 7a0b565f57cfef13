// SPDX-License-Identifier: MIT
//
// FrameBuffer — the cell grid a session paints into.
//
// Row-major `Vec<Cell>`. Every write goes through a clip `Rect` in screen
// coordinates, so a caller holding a clip can never touch cells outside it;
// the scene builds its write-only surfaces on top of that guarantee.
//
// Wide characters take two columns (character + continuation cell). Any
// write that lands on half of a wide character breaks the other half, so the
// grid never holds an orphaned pair.

use std::fmt;

use unicode_width::UnicodeWidthChar;

use crate::cell::{Attr, Cell};
use crate::color::Color;
use crate::geometry::{Point, Rect, Size};

/// A `width × height` grid of cells.
#[derive(Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    width: u16,
    height: u16,
    cells: Vec<Cell>,
}

/// Clamp a validated dimension into terminal range.
fn to_cells(n: i32) -> u16 {
    u16::try_from(n).unwrap_or(u16::MAX)
}

impl FrameBuffer {
    /// A buffer of empty cells. Dimensions beyond `u16::MAX` are clamped.
    #[must_use]
    pub fn new(size: Size) -> Self {
        let width = to_cells(size.width());
        let height = to_cells(size.height());
        Self {
            width,
            height,
            cells: vec![Cell::EMPTY; usize::from(width) * usize::from(height)],
        }
    }

    #[inline]
    #[must_use]
    pub const fn width(&self) -> u16 {
        self.width
    }

    #[inline]
    #[must_use]
    pub const fn height(&self) -> u16 {
        self.height
    }

    /// The whole grid as a rectangle at the origin.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        // Dimensions are at least 1 by construction.
        Rect::new(0, 0, i32::from(self.width), i32::from(self.height))
            .unwrap_or_else(|_| Rect::of_size(Size::DEFAULT_TERMINAL))
    }

    fn index(&self, p: Point) -> Option<usize> {
        let x = u16::try_from(p.x).ok().filter(|&x| x < self.width)?;
        let y = u16::try_from(p.y).ok().filter(|&y| y < self.height)?;
        Some(usize::from(y) * usize::from(self.width) + usize::from(x))
    }

    #[inline]
    #[must_use]
    pub fn get(&self, p: Point) -> Option<&Cell> {
        self.index(p).map(|i| &self.cells[i])
    }

    /// One row as a slice.
    #[must_use]
    pub fn row(&self, y: u16) -> Option<&[Cell]> {
        if y >= self.height {
            return None;
        }
        let start = usize::from(y) * usize::from(self.width);
        Some(&self.cells[start..start + usize::from(self.width)])
    }

    #[inline]
    #[must_use]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    // ─── Whole-grid operations ───────────────────────────────────────────

    pub fn clear(&mut self) {
        self.cells.fill(Cell::EMPTY);
    }

    /// Resize and clear.
    pub fn resize(&mut self, size: Size) {
        self.width = to_cells(size.width());
        self.height = to_cells(size.height());
        self.cells.clear();
        self.cells.resize(usize::from(self.width) * usize::from(self.height), Cell::EMPTY);
    }

    /// Copy another buffer's cells, reusing this allocation when sizes match.
    pub fn copy_from(&mut self, other: &Self) {
        if self.width == other.width && self.height == other.height {
            self.cells.copy_from_slice(&other.cells);
        } else {
            self.clone_from(other);
        }
    }

    // ─── Clipped writes ──────────────────────────────────────────────────

    /// Break a wide character that a write at `p` would split.
    fn break_wide_char_at(&mut self, p: Point) {
        let Some(idx) = self.index(p) else { return };

        if self.cells[idx].is_continuation() {
            if let Some(prev) = self.index(p.translate(-1, 0)) {
                self.cells[prev].ch = u32::from(b' ');
            }
        }
        if let Some(next) = self.index(p.translate(1, 0)) {
            if self.cells[next].is_continuation() {
                self.cells[next] = Cell::EMPTY;
            }
        }
    }

    /// Write one cell if `p` lies inside both the grid and `clip`.
    ///
    /// Returns `true` if written.
    pub fn set(&mut self, p: Point, cell: Cell, clip: Rect) -> bool {
        if !clip.contains_point(p) {
            return false;
        }
        let Some(idx) = self.index(p) else {
            return false;
        };
        self.break_wide_char_at(p);
        self.cells[idx] = cell;
        true
    }

    /// Fill `rect ∩ clip ∩ bounds` with `cell`. Returns the filled region.
    pub fn fill(&mut self, rect: Rect, cell: Cell, clip: Rect) -> Option<Rect> {
        let region = rect.clip(clip)?.clip(self.bounds())?;

        for y in region.min_y()..region.max_y() {
            // Wide characters straddling the left or right edge.
            self.break_wide_char_at(Point::new(region.min_x(), y));
            self.break_wide_char_at(Point::new(region.max_x() - 1, y));

            let start = self.index(Point::new(region.min_x(), y));
            let end = self.index(Point::new(region.max_x() - 1, y));
            if let (Some(start), Some(end)) = (start, end) {
                self.cells[start..=end].fill(cell);
            }
        }
        Some(region)
    }

    /// Paint `text` left to right from `at`, clipped to `clip`.
    ///
    /// Wide characters take two columns and are replaced by a space when
    /// their second column would be clipped. Zero-width characters are
    /// skipped. Returns the number of columns advanced, clipped or not.
    #[allow(clippy::similar_names)]
    pub fn paint_text(&mut self, at: Point, text: &str, fg: Color, bg: Color, attrs: Attr, clip: Rect) -> i32 {
        let mut col = at.x;

        for ch in text.chars() {
            let w = ch.width().unwrap_or(0);
            if w == 0 {
                continue;
            }

            let p = Point::new(col, at.y);
            if w == 2 {
                let next = p.translate(1, 0);
                let fits = clip.contains_point(next) && self.index(next).is_some();
                if fits {
                    if clip.contains_point(p) && self.index(p).is_some() {
                        // Break whatever occupies the second column before the
                        // first is written, or the cleanup would blank it.
                        self.break_wide_char_at(next);
                        self.set(p, Cell::styled(ch, fg, bg, attrs), clip);
                        if let Some(idx) = self.index(next) {
                            self.cells[idx] = Cell::continuation(fg, bg, attrs);
                        }
                    }
                } else {
                    self.set(p, Cell::styled(' ', fg, bg, attrs), clip);
                }
                col = col.saturating_add(2);
            } else {
                self.set(p, Cell::styled(ch, fg, bg, attrs), clip);
                col = col.saturating_add(1);
            }
        }

        col.saturating_sub(at.x)
    }
}

impl fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FrameBuffer({}x{})", self.width, self.height)
    }
}

/// Display width of a string in terminal columns.
#[must_use]
pub fn string_width(s: &str) -> usize {
    s.chars().map(|ch| ch.width().unwrap_or(0)).sum()
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn buf(w: i32, h: i32) -> FrameBuffer {
        FrameBuffer::new(Size::new(w, h).unwrap())
    }

    fn rect(x: i32, y: i32, w: i32, h: i32) -> Rect {
        Rect::new(x, y, w, h).unwrap()
    }

    fn ch_at(b: &FrameBuffer, x: i32, y: i32) -> char {
        b.get(Point::new(x, y)).and_then(|c| c.character()).unwrap_or('\0')
    }

    fn row_text(b: &FrameBuffer, y: u16) -> String {
        b.row(y)
            .unwrap()
            .iter()
            .filter_map(|c| c.character())
            .collect()
    }

    #[test]
    fn new_is_empty() {
        let b = buf(4, 2);
        assert_eq!(b.cells().len(), 8);
        assert!(b.cells().iter().all(|c| c.is_empty()));
        assert_eq!(b.bounds(), rect(0, 0, 4, 2));
    }

    #[test]
    fn get_out_of_bounds() {
        let b = buf(4, 2);
        assert!(b.get(Point::new(-1, 0)).is_none());
        assert!(b.get(Point::new(4, 0)).is_none());
        assert!(b.get(Point::new(0, 2)).is_none());
    }

    #[test]
    fn set_respects_clip() {
        let mut b = buf(4, 4);
        let clip = rect(1, 1, 2, 2);
        assert!(!b.set(Point::new(0, 0), Cell::new('x'), clip));
        assert!(b.set(Point::new(1, 1), Cell::new('x'), clip));
        assert_eq!(ch_at(&b, 1, 1), 'x');
        assert_eq!(ch_at(&b, 0, 0), ' ');
    }

    #[test]
    fn set_outside_grid_fails_even_if_clip_allows() {
        let mut b = buf(2, 2);
        assert!(!b.set(Point::new(5, 5), Cell::new('x'), rect(0, 0, 10, 10)));
    }

    #[test]
    fn fill_intersects_clip_and_bounds() {
        let mut b = buf(5, 3);
        let filled = b.fill(rect(-2, 1, 10, 10), Cell::new('#'), rect(1, 0, 3, 3));
        assert_eq!(filled, Some(rect(1, 1, 3, 2)));
        assert_eq!(row_text(&b, 0), "     ");
        assert_eq!(row_text(&b, 1), " ### ");
        assert_eq!(row_text(&b, 2), " ### ");
    }

    #[test]
    fn fill_disjoint_does_nothing() {
        let mut b = buf(3, 3);
        assert_eq!(b.fill(rect(5, 5, 1, 1), Cell::new('#'), b.bounds()), None);
    }

    #[test]
    fn paint_text_ascii() {
        let mut b = buf(6, 1);
        let cols = b.paint_text(Point::new(1, 0), "abc", Color::Default, Color::Default, Attr::empty(), b.bounds());
        assert_eq!(cols, 3);
        assert_eq!(row_text(&b, 0), " abc  ");
    }

    #[test]
    fn paint_text_clipped_on_left() {
        let mut b = buf(6, 1);
        b.paint_text(Point::new(-2, 0), "abcde", Color::Default, Color::Default, Attr::empty(), b.bounds());
        assert_eq!(row_text(&b, 0), "cde   ");
    }

    #[test]
    fn paint_text_wide_char() {
        let mut b = buf(4, 1);
        let cols = b.paint_text(Point::ORIGIN, "中a", Color::Default, Color::Default, Attr::empty(), b.bounds());
        assert_eq!(cols, 3);
        assert_eq!(ch_at(&b, 0, 0), '中');
        assert!(b.get(Point::new(1, 0)).unwrap().is_continuation());
        assert_eq!(ch_at(&b, 2, 0), 'a');
    }

    #[test]
    fn paint_text_wide_char_at_clip_edge_becomes_space() {
        let mut b = buf(4, 1);
        b.paint_text(Point::new(1, 0), "中", Color::Default, Color::Default, Attr::empty(), rect(0, 0, 2, 1));
        assert_eq!(ch_at(&b, 1, 0), ' ');
        assert!(!b.get(Point::new(2, 0)).unwrap().is_continuation());
    }

    #[test]
    fn overwriting_half_a_wide_char_breaks_it() {
        let mut b = buf(4, 1);
        b.paint_text(Point::ORIGIN, "中", Color::Default, Color::Default, Attr::empty(), b.bounds());
        b.set(Point::new(1, 0), Cell::new('x'), b.bounds());
        assert_eq!(ch_at(&b, 0, 0), ' ');
        assert_eq!(ch_at(&b, 1, 0), 'x');
    }

    #[test]
    fn resize_clears() {
        let mut b = buf(2, 2);
        b.set(Point::ORIGIN, Cell::new('x'), b.bounds());
        b.resize(Size::new(3, 1).unwrap());
        assert_eq!(b.width(), 3);
        assert_eq!(b.height(), 1);
        assert!(b.cells().iter().all(|c| c.is_empty()));
    }

    #[test]
    fn copy_from_matches() {
        let mut a = buf(3, 3);
        let mut b = buf(3, 3);
        a.set(Point::new(2, 2), Cell::new('z'), a.bounds());
        b.copy_from(&a);
        assert_eq!(a, b);
    }

    #[test]
    fn string_width_counts_columns() {
        assert_eq!(string_width("ab"), 2);
        assert_eq!(string_width("中文"), 4);
    }
}
