// SPDX-License-Identifier: MIT
//
// Output buffering and stateful cell encoding.
//
//   OutputBuffer accumulates a whole frame in memory so it reaches the
//   remote terminal in one write.
//
//   CellWriter remembers what the terminal currently has selected (cursor
//   position, colors, attributes) and skips escapes that would not change
//   anything. It encodes against a snapshot of the session's capabilities
//   taken once per frame, so the descriptor locks are not touched per cell.

use std::io::{self, Write};

use unicode_width::UnicodeWidthChar;

use crate::caps::{Capabilities, Charset, ColorFlags};
use crate::cell::{Attr, Cell};
use crate::color::Color;
use crate::escape::{self, Layer};

// ─── OutputBuffer ────────────────────────────────────────────────────────────

/// Frame bytes waiting to be handed to the output sink.
#[derive(Debug)]
pub struct OutputBuffer {
    buf: Vec<u8>,
}

const DEFAULT_CAPACITY: usize = 16_384;

impl OutputBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self { buf: Vec::with_capacity(DEFAULT_CAPACITY) }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Clear for reuse, keeping the allocation.
    #[inline]
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Hand everything to `w` in one write and clear.
    ///
    /// # Errors
    ///
    /// Whatever `w` reports. The buffer is left intact on failure so the
    /// caller may retry.
    pub fn flush_to(&mut self, w: &mut impl Write) -> io::Result<()> {
        if !self.buf.is_empty() {
            w.write_all(&self.buf)?;
            w.flush()?;
            self.buf.clear();
        }
        Ok(())
    }
}

impl Write for OutputBuffer {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Default for OutputBuffer {
    fn default() -> Self {
        Self::new()
    }
}

// ─── CellWriter ──────────────────────────────────────────────────────────────

/// Encodes cells with the fewest escapes the tracked terminal state allows.
///
/// - Cursor moves are skipped for the cell right after the last one.
/// - An attribute change resets (SGR 0) when attributes were set before,
///   which forgets both colors.
/// - Colors are re-emitted only when they differ from the tracked ones.
/// - A continuation cell right after its wide character emits nothing.
#[derive(Debug)]
#[allow(clippy::struct_field_names)]
pub struct CellWriter {
    flags: ColorFlags,
    charset: Charset,
    last_x: i32,
    last_y: i32,
    last_fg: Option<Color>,
    last_bg: Option<Color>,
    last_attrs: Attr,
}

impl CellWriter {
    /// A writer for a full-color UTF-8 terminal with no tracked state.
    #[must_use]
    pub const fn new() -> Self {
        Self::with_target(ColorFlags::all(), Charset::Utf8)
    }

    #[must_use]
    pub const fn with_target(flags: ColorFlags, charset: Charset) -> Self {
        Self {
            flags,
            charset,
            last_x: -1,
            last_y: -1,
            last_fg: None,
            last_bg: None,
            last_attrs: Attr::empty(),
        }
    }

    /// Snapshot the session's color flags and active charset.
    pub fn retarget(&mut self, caps: &Capabilities) {
        self.flags = caps.color_flags();
        self.charset = caps.active_charset();
    }

    #[inline]
    #[must_use]
    pub const fn charset(&self) -> Charset {
        self.charset
    }

    /// Forget the tracked terminal state. Call after anything that resets
    /// the terminal behind the writer's back.
    pub const fn reset_state(&mut self) {
        self.last_x = -1;
        self.last_y = -1;
        self.last_fg = None;
        self.last_bg = None;
        self.last_attrs = Attr::empty();
    }

    /// Encode one cell at `(x, y)`.
    ///
    /// # Errors
    ///
    /// Propagates write failures from `out`.
    pub fn render_cell(&mut self, out: &mut impl Write, x: u16, y: u16, cell: &Cell) -> io::Result<()> {
        let xi = i32::from(x);
        let yi = i32::from(y);

        if cell.is_continuation() && yi == self.last_y && xi == self.last_x + 1 {
            // The wide character before this already covered the column.
            self.last_x = xi;
            return Ok(());
        }

        if yi != self.last_y || xi != self.last_x + 1 {
            escape::cursor_to(out, x, y)?;
        }

        self.apply_style(out, cell)?;

        match cell.character() {
            Some(ch) => {
                escape::glyph(out, ch, self.charset)?;
                // The replacement is one column; pad so the continuation
                // column is really covered.
                if ch.width() == Some(2) && !self.charset.can_encode(ch) {
                    out.write_all(b" ")?;
                }
            }
            // Orphaned continuation or invalid scalar: keep the column filled.
            None => out.write_all(b" ")?,
        }

        self.last_x = xi;
        self.last_y = yi;
        Ok(())
    }

    fn apply_style(&mut self, out: &mut impl Write, cell: &Cell) -> io::Result<()> {
        if cell.attrs != self.last_attrs {
            if !self.last_attrs.is_empty() {
                escape::reset(out)?;
                self.last_fg = None;
                self.last_bg = None;
            }
            escape::attrs(out, cell.attrs)?;
            self.last_attrs = cell.attrs;
        }

        if self.last_fg != Some(cell.fg) {
            escape::color_with(out, cell.fg, self.flags, Layer::Foreground)?;
            self.last_fg = Some(cell.fg);
        }

        if self.last_bg != Some(cell.bg) {
            escape::color_with(out, cell.bg, self.flags, Layer::Background)?;
            self.last_bg = Some(cell.bg);
        }

        Ok(())
    }
}

impl Default for CellWriter {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
