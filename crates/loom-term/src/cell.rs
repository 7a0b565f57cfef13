// SPDX-License-Identifier: MIT
//
// Cell — one character position on the remote terminal.
//
// A tenant's render callback produces cells; the diff renderer compares them
// against the previous frame and encodes the changed ones. Cells store the
// color the tenant asked for (usually RGB), not the color the terminal will
// show: degradation happens once per session at encode time, so two sessions
// with different capabilities can share the same painted frame logic.
//
// Wide characters occupy two columns. The first cell holds the codepoint,
// the second is a continuation cell (ch = 0) that only carries style.

use std::fmt;

use crate::color::Color;

// ─── Attributes ──────────────────────────────────────────────────────────────

bitflags::bitflags! {
    /// Text attributes, one bit per SGR parameter.
    ///
    /// ```
    /// use loom_term::cell::Attr;
    ///
    /// let style = Attr::BOLD | Attr::UNDERLINE;
    /// assert!(style.contains(Attr::BOLD));
    /// assert!(!style.contains(Attr::BLINK));
    /// ```
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Attr: u8 {
        /// SGR 1.
        const BOLD          = 1 << 0;
        /// SGR 2.
        const DIM           = 1 << 1;
        /// SGR 3.
        const ITALIC        = 1 << 2;
        /// SGR 4.
        const UNDERLINE     = 1 << 3;
        /// SGR 5. Also the bit iCE terminals reuse for bright backgrounds.
        const BLINK         = 1 << 4;
        /// SGR 7.
        const INVERSE       = 1 << 5;
        /// SGR 8.
        const HIDDEN        = 1 << 6;
        /// SGR 9.
        const STRIKETHROUGH = 1 << 7;
    }
}

// ─── Cell ────────────────────────────────────────────────────────────────────

/// A styled character.
///
/// 16 bytes: a `u32` codepoint, two 4-byte colors, one attribute byte.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    /// Codepoint. `0` marks a continuation cell, `' '` an empty one.
    pub ch: u32,
    pub fg: Color,
    pub bg: Color,
    pub attrs: Attr,
}

const CONTINUATION: u32 = 0;
const SPACE: u32 = b' ' as u32;

impl Cell {
    /// A space with default colors and no attributes.
    pub const EMPTY: Self = Self {
        ch: SPACE,
        fg: Color::Default,
        bg: Color::Default,
        attrs: Attr::empty(),
    };

    #[inline]
    #[must_use]
    pub const fn new(ch: char) -> Self {
        Self { ch: ch as u32, ..Self::EMPTY }
    }

    #[inline]
    #[must_use]
    pub const fn styled(ch: char, fg: Color, bg: Color, attrs: Attr) -> Self {
        Self { ch: ch as u32, fg, bg, attrs }
    }

    /// The second column of a wide character. Carries style so the
    /// background fills both columns.
    #[inline]
    #[must_use]
    pub const fn continuation(fg: Color, bg: Color, attrs: Attr) -> Self {
        Self { ch: CONTINUATION, fg, bg, attrs }
    }

    #[inline]
    #[must_use]
    pub const fn is_continuation(self) -> bool {
        self.ch == CONTINUATION
    }

    /// Whether the cell is indistinguishable from [`Cell::EMPTY`].
    #[inline]
    #[must_use]
    pub fn is_empty(self) -> bool {
        self == Self::EMPTY
    }

    /// The character, or `None` for continuation cells and invalid scalars.
    #[inline]
    #[must_use]
    pub const fn character(self) -> Option<char> {
        if self.ch == CONTINUATION {
            return None;
        }
        char::from_u32(self.ch)
    }

    #[inline]
    #[must_use]
    pub const fn with_fg(self, fg: Color) -> Self {
        Self { fg, ..self }
    }

    #[inline]
    #[must_use]
    pub const fn with_bg(self, bg: Color) -> Self {
        Self { bg, ..self }
    }

    #[inline]
    #[must_use]
    pub const fn with_attrs(self, attrs: Attr) -> Self {
        Self { attrs, ..self }
    }

    /// Same colors and attributes, ignoring the character.
    #[inline]
    #[must_use]
    pub fn same_style(self, other: Self) -> bool {
        self.fg == other.fg && self.bg == other.bg && self.attrs == other.attrs
    }
}

impl Default for Cell {
    #[inline]
    fn default() -> Self {
        Self::EMPTY
    }
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_continuation() {
            return write!(f, "Cell(continuation)");
        }
        let ch = char::from_u32(self.ch).unwrap_or('?');
        write!(f, "Cell({ch:?}")?;
        if !self.fg.is_default() {
            write!(f, ", fg={:?}", self.fg)?;
        }
        if !self.bg.is_default() {
            write!(f, ", bg={:?}", self.bg)?;
        }
        if !self.attrs.is_empty() {
            write!(f, ", {:?}", self.attrs)?;
        }
        write!(f, ")")
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
