// SPDX-License-Identifier: MIT
//
// Surface — the only thing a drawable ever touches.
//
// A surface maps node-local coordinates onto the session frame and refuses
// every write outside its clip. It has no read accessors: a drawable cannot
// observe what other drawables (or other tenants) painted underneath it.

use loom_term::buffer::FrameBuffer;
use loom_term::cell::{Attr, Cell};
use loom_term::color::Color;
use loom_term::geometry::{Point, Rect, Size};

/// Write-only, clipped view of the frame for one node.
pub struct Surface<'a> {
    frame: &'a mut FrameBuffer,
    /// Absolute position of the node's local (0, 0).
    origin: Point,
    size: Size,
    /// Absolute clip: node ∩ ancestors ∩ damage ∩ screen.
    clip: Rect,
}

impl<'a> Surface<'a> {
    pub(crate) const fn new(frame: &'a mut FrameBuffer, origin: Point, size: Size, clip: Rect) -> Self {
        Self { frame, origin, size, clip }
    }

    /// The node's full size, visible or not.
    #[inline]
    #[must_use]
    pub const fn size(&self) -> Size {
        self.size
    }

    /// The node's local bounds, `(0, 0)` to its size.
    #[inline]
    #[must_use]
    pub const fn bounds(&self) -> Rect {
        Rect::of_size(self.size)
    }

    /// The part of the node that will actually reach the frame, in local
    /// coordinates. Drawables may use it to skip work.
    #[must_use]
    pub const fn visible(&self) -> Rect {
        self.clip.translate(-self.origin.x, -self.origin.y)
    }

    #[inline]
    const fn to_frame(&self, local: Point) -> Point {
        local.offset(self.origin)
    }

    /// Write one cell. Returns `false` if it fell outside the clip.
    pub fn put(&mut self, at: Point, cell: Cell) -> bool {
        self.frame.set(self.to_frame(at), cell, self.clip)
    }

    /// Fill a local rectangle.
    pub fn fill(&mut self, rect: Rect, cell: Cell) {
        let abs = rect.translate(self.origin.x, self.origin.y);
        self.frame.fill(abs, cell, self.clip);
    }

    /// Fill the whole node with spaces on `bg`.
    pub fn clear(&mut self, bg: Color) {
        self.fill(self.bounds(), Cell::EMPTY.with_bg(bg));
    }

    /// Paint a line of text starting at `at`. Returns columns advanced.
    pub fn text(&mut self, at: Point, text: &str, fg: Color, bg: Color, attrs: Attr) -> i32 {
        self.frame.paint_text(self.to_frame(at), text, fg, bg, attrs, self.clip)
    }
}
