// SPDX-License-Identifier: MIT
//
// Escape sequence encoder.
//
// Pure functions that write VT/ANSI bytes to any `impl Write`. Colors are
// the interesting part: the same `Color` becomes different bytes depending on
// what the session's capability descriptor advertises. Each channel picks its
// own tier, so a terminal with iCE colors but no aixterm support gets 16
// background colors while its foreground stays at 8.
//
//   TrueColor  38;2;r;g;b   48;2;r;g;b
//   Table      38;5;n       48;5;n        (n < 16 uses the 4-bit form)
//   Aixterm    30–37 90–97  40–47 100–107
//   Ice        —            25;4n / 5;4n  (blink bit selects bright)
//   Base       30–37        40–47
//
// Cursor coordinates are 0-indexed here and converted to the terminal's
// 1-indexed form on output.

use std::io::{self, Write};

use crate::caps::{Capabilities, Charset, ColorFlags};
use crate::cell::Attr;
use crate::color::{Color, PaletteColor, Rgb, degrade_to_palette, degrade_to_standard8, degrade_to_standard16};
use crate::geometry::Size;

// ─── Cursor & Screen ─────────────────────────────────────────────────────────

/// Move the cursor (CUP).
#[inline]
pub fn cursor_to(w: &mut impl Write, x: u16, y: u16) -> io::Result<()> {
    write!(w, "\x1b[{};{}H", u32::from(y) + 1, u32::from(x) + 1)
}

#[inline]
pub fn cursor_hide(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?25l")
}

#[inline]
pub fn cursor_show(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?25h")
}

/// Clear the whole screen (ED 2).
#[inline]
pub fn clear_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[2J")
}

/// Reset all SGR state (SGR 0). Callers tracking SGR state must forget it.
#[inline]
pub fn reset(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[0m")
}

/// Begin synchronized output (DEC 2026). Ignored by terminals that lack it.
#[inline]
pub fn begin_sync(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?2026h")
}

#[inline]
pub fn end_sync(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?2026l")
}

// ─── Sizing ──────────────────────────────────────────────────────────────────

/// Ask the terminal to resize its window (XTWINOPS 8).
#[inline]
pub fn resize_window(w: &mut impl Write, size: Size) -> io::Result<()> {
    write!(w, "\x1b[8;{};{}t", size.height(), size.width())
}

/// Ask the terminal to report the cursor position (DSR 6).
///
/// Hosts use the reply after moving to the far corner to learn the real
/// terminal size when no out-of-band size report is available.
#[inline]
pub fn request_cursor_position(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[6n")
}

// ─── Color ───────────────────────────────────────────────────────────────────

/// Which half of a cell a color applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Foreground,
    Background,
}

impl Layer {
    /// First SGR code of the base eight (30 / 40).
    const fn base(self) -> u8 {
        match self {
            Self::Foreground => 30,
            Self::Background => 40,
        }
    }

    /// First SGR code of the bright eight (90 / 100).
    const fn bright(self) -> u8 {
        match self {
            Self::Foreground => 90,
            Self::Background => 100,
        }
    }

    /// Extended color introducer (38 / 48).
    const fn extended(self) -> u8 {
        match self {
            Self::Foreground => 38,
            Self::Background => 48,
        }
    }

    /// Default color (39 / 49).
    const fn default_code(self) -> u8 {
        match self {
            Self::Foreground => 39,
            Self::Background => 49,
        }
    }
}

/// How a color on one layer will be encoded for a given flag set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorTier {
    TrueColor,
    Table,
    Aixterm,
    /// Background only: 16 colors through the blink bit.
    Ice,
    Base,
}

impl ColorTier {
    /// The richest tier `flags` allows on `layer`.
    #[must_use]
    pub const fn select(flags: ColorFlags, layer: Layer) -> Self {
        if flags.contains(ColorFlags::TRUE_COLOR) {
            Self::TrueColor
        } else if flags.contains(ColorFlags::TABLE) {
            Self::Table
        } else if flags.contains(ColorFlags::AIXTERM) {
            Self::Aixterm
        } else if flags.contains(ColorFlags::ICE) && matches!(layer, Layer::Background) {
            Self::Ice
        } else {
            Self::Base
        }
    }
}

/// Set the foreground color for the session described by `caps`.
pub fn fg(w: &mut impl Write, color: Color, caps: &Capabilities) -> io::Result<()> {
    color_with(w, color, caps.color_flags(), Layer::Foreground)
}

/// Set the background color for the session described by `caps`.
pub fn bg(w: &mut impl Write, color: Color, caps: &Capabilities) -> io::Result<()> {
    color_with(w, color, caps.color_flags(), Layer::Background)
}

/// Encode `color` on `layer` against an already-read flag set.
///
/// The stateful writer snapshots the flags once per frame and calls this
/// directly instead of taking the descriptor lock for every cell.
pub fn color_with(w: &mut impl Write, color: Color, flags: ColorFlags, layer: Layer) -> io::Result<()> {
    let tier = ColorTier::select(flags, layer);

    let rgb = match color {
        Color::Default => return write!(w, "\x1b[{}m", layer.default_code()),
        Color::Palette(p) if matches!(tier, ColorTier::TrueColor | ColorTier::Table) => {
            return palette(w, p, layer);
        }
        Color::Palette(p) if p.is_standard() && tier == ColorTier::Aixterm => {
            return standard(w, p.index(), layer);
        }
        Color::Palette(p) => p.to_rgb(),
        Color::Rgb(rgb) => rgb,
    };

    match tier {
        ColorTier::TrueColor => truecolor(w, rgb, layer),
        ColorTier::Table => palette(w, degrade_to_palette(rgb), layer),
        ColorTier::Aixterm => standard(w, degrade_to_standard16(rgb), layer),
        ColorTier::Ice => ice_background(w, degrade_to_standard16(rgb)),
        ColorTier::Base => standard(w, degrade_to_standard8(rgb), layer),
    }
}

fn truecolor(w: &mut impl Write, rgb: Rgb, layer: Layer) -> io::Result<()> {
    write!(w, "\x1b[{};2;{};{};{}m", layer.extended(), rgb.r, rgb.g, rgb.b)
}

/// Palette index, using the shorter 4-bit form below 16.
fn palette(w: &mut impl Write, p: PaletteColor, layer: Layer) -> io::Result<()> {
    if p.is_standard() {
        standard(w, p.index(), layer)
    } else {
        write!(w, "\x1b[{};5;{}m", layer.extended(), p.index())
    }
}

/// One of the 16 standard colors in 4-bit form.
fn standard(w: &mut impl Write, idx: u8, layer: Layer) -> io::Result<()> {
    let code = if idx < 8 { layer.base() + idx } else { layer.bright() + (idx & 7) };
    write!(w, "\x1b[{code}m")
}

/// iCE background: bright colors ride on the blink bit.
fn ice_background(w: &mut impl Write, idx: u8) -> io::Result<()> {
    if idx < 8 {
        write!(w, "\x1b[25;4{idx}m")
    } else {
        write!(w, "\x1b[5;4{}m", idx & 7)
    }
}

// ─── Attributes & Fonts ──────────────────────────────────────────────────────

/// Emit all set attributes as one SGR sequence (`\x1b[1;4m`). Nothing is
/// written for an empty set.
pub fn attrs(w: &mut impl Write, attr: Attr) -> io::Result<()> {
    const CODES: [(Attr, &[u8]); 8] = [
        (Attr::BOLD, b"1"),
        (Attr::DIM, b"2"),
        (Attr::ITALIC, b"3"),
        (Attr::UNDERLINE, b"4"),
        (Attr::BLINK, b"5"),
        (Attr::INVERSE, b"7"),
        (Attr::HIDDEN, b"8"),
        (Attr::STRIKETHROUGH, b"9"),
    ];

    if attr.is_empty() {
        return Ok(());
    }

    w.write_all(b"\x1b[")?;
    let mut first = true;
    for (flag, code) in CODES {
        if attr.contains(flag) {
            if !first {
                w.write_all(b";")?;
            }
            w.write_all(code)?;
            first = false;
        }
    }
    w.write_all(b"m")
}

/// Select font `font` (0 = primary, 1–9 = alternates) via SGR 10–19.
///
/// Writes nothing and returns `false` unless the session advertises
/// [`ColorFlags::FONT_CHANGE`] and `font` is in range.
pub fn select_font(w: &mut impl Write, font: u8, caps: &Capabilities) -> io::Result<bool> {
    if font > 9 || !caps.supports(ColorFlags::FONT_CHANGE) {
        return Ok(false);
    }
    write!(w, "\x1b[{}m", 10 + font)?;
    Ok(true)
}

// ─── Glyphs ──────────────────────────────────────────────────────────────────

/// Write one character in `charset`, substituting `?` when it has no
/// representation.
#[inline]
pub fn glyph(w: &mut impl Write, ch: char, charset: Charset) -> io::Result<()> {
    let mut buf = [0u8; 4];
    w.write_all(charset.encode(ch, &mut buf))
}

// ─── Mouse ───────────────────────────────────────────────────────────────────

/// Mouse reporting modes, each a single DEC private mode number.
///
/// The first four choose which events are reported; the last three choose
/// how coordinates are encoded and are enabled alongside one of the first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseMode {
    /// Press only (X10 compatibility).
    X10,
    /// Press and release.
    Click,
    /// Press, release, and motion with a button held.
    Drag,
    /// Every motion event.
    Motion,
    /// UTF-8 extended coordinates.
    Utf8,
    /// SGR extended coordinates.
    Sgr,
    /// urxvt extended coordinates.
    Urxvt,
}

impl MouseMode {
    pub const ALL: [Self; 7] = [
        Self::X10,
        Self::Click,
        Self::Drag,
        Self::Motion,
        Self::Utf8,
        Self::Sgr,
        Self::Urxvt,
    ];

    /// The DEC private mode number.
    #[must_use]
    pub const fn code(self) -> u16 {
        match self {
            Self::X10 => 9,
            Self::Click => 1000,
            Self::Drag => 1002,
            Self::Motion => 1003,
            Self::Utf8 => 1005,
            Self::Sgr => 1006,
            Self::Urxvt => 1015,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::X10 => "x10",
            Self::Click => "click",
            Self::Drag => "drag",
            Self::Motion => "motion",
            Self::Utf8 => "utf8",
            Self::Sgr => "sgr",
            Self::Urxvt => "urxvt",
        }
    }
}

impl std::fmt::Display for MouseMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for MouseMode {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| crate::Error::UnknownName { kind: "mouse mode", name: s.to_owned() })
    }
}

/// `CSI ? n h`
#[inline]
pub fn enable_mouse(w: &mut impl Write, mode: MouseMode) -> io::Result<()> {
    write!(w, "\x1b[?{}h", mode.code())
}

/// `CSI ? n l`
#[inline]
pub fn disable_mouse(w: &mut impl Write, mode: MouseMode) -> io::Result<()> {
    write!(w, "\x1b[?{}l", mode.code())
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn emit<F>(f: F) -> String
    where
        F: FnOnce(&mut Vec<u8>) -> io::Result<()>,
    {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    fn caps(flags: ColorFlags) -> Capabilities {
        Capabilities::new(Size::DEFAULT_TERMINAL, [Charset::Utf8], flags)
    }

    fn fg_str(color: Color, flags: ColorFlags) -> String {
        emit(|w| fg(w, color, &caps(flags)))
    }

    fn bg_str(color: Color, flags: ColorFlags) -> String {
        emit(|w| bg(w, color, &caps(flags)))
    }

    // ── Cursor & screen ─────────────────────────────────────────────────

    #[test]
    fn cursor_is_one_based() {
        assert_eq!(emit(|w| cursor_to(w, 0, 0)), "\x1b[1;1H");
        assert_eq!(emit(|w| cursor_to(w, 10, 20)), "\x1b[21;11H");
    }

    #[test]
    fn cursor_at_u16_max_does_not_overflow() {
        assert_eq!(emit(|w| cursor_to(w, u16::MAX, u16::MAX)), "\x1b[65536;65536H");
    }

    #[test]
    fn screen_sequences() {
        assert_eq!(emit(|w| clear_screen(w)), "\x1b[2J");
        assert_eq!(emit(|w| reset(w)), "\x1b[0m");
        assert_eq!(emit(|w| cursor_hide(w)), "\x1b[?25l");
    }

    #[test]
    fn resize_window_is_rows_then_cols() {
        let size = Size::new(132, 43).unwrap();
        assert_eq!(emit(|w| resize_window(w, size)), "\x1b[8;43;132t");
    }

    #[test]
    fn cursor_position_request() {
        assert_eq!(emit(|w| request_cursor_position(w)), "\x1b[6n");
    }

    // ── Color tiers ─────────────────────────────────────────────────────

    #[test]
    fn default_color_codes() {
        assert_eq!(fg_str(Color::Default, ColorFlags::empty()), "\x1b[39m");
        assert_eq!(bg_str(Color::Default, ColorFlags::TRUE_COLOR), "\x1b[49m");
    }

    #[test]
    fn truecolor_passes_through() {
        let flags = ColorFlags::TRUE_COLOR | ColorFlags::TABLE;
        assert_eq!(fg_str(Color::rgb(1, 2, 3), flags), "\x1b[38;2;1;2;3m");
        assert_eq!(bg_str(Color::rgb(255, 128, 0), flags), "\x1b[48;2;255;128;0m");
    }

    #[test]
    fn table_degrades_dark_gray_to_ramp() {
        assert_eq!(fg_str(Color::rgb(10, 10, 10), ColorFlags::TABLE), "\x1b[38;5;232m");
    }

    #[test]
    fn table_degrades_red_to_cube() {
        assert_eq!(bg_str(Color::rgb(255, 0, 0), ColorFlags::TABLE), "\x1b[48;5;196m");
    }

    #[test]
    fn palette_below_16_uses_short_form() {
        let flags = ColorFlags::TABLE;
        assert_eq!(fg_str(Color::Palette(PaletteColor(1)), flags), "\x1b[31m");
        assert_eq!(fg_str(Color::Palette(PaletteColor(9)), flags), "\x1b[91m");
        assert_eq!(bg_str(Color::Palette(PaletteColor(15)), flags), "\x1b[107m");
        assert_eq!(fg_str(Color::Palette(PaletteColor(100)), flags), "\x1b[38;5;100m");
    }

    #[test]
    fn aixterm_uses_bright_codes() {
        let flags = ColorFlags::AIXTERM;
        assert_eq!(fg_str(Color::rgb(255, 0, 0), flags), "\x1b[91m");
        assert_eq!(bg_str(Color::rgb(0, 0, 128), flags), "\x1b[44m");
    }

    #[test]
    fn aixterm_degrades_cube_palette_through_rgb() {
        // 196 is pure red, nearest standard color is bright red.
        assert_eq!(fg_str(Color::Palette(PaletteColor(196)), ColorFlags::AIXTERM), "\x1b[91m");
    }

    #[test]
    fn base_tier_never_bright() {
        assert_eq!(fg_str(Color::rgb(255, 0, 0), ColorFlags::empty()), "\x1b[31m");
        assert_eq!(bg_str(Color::rgb(255, 255, 255), ColorFlags::empty()), "\x1b[47m");
    }

    #[test]
    fn ice_background_uses_blink_bit() {
        let flags = ColorFlags::ICE;
        assert_eq!(bg_str(Color::rgb(255, 0, 0), flags), "\x1b[5;41m");
        assert_eq!(bg_str(Color::rgb(128, 0, 0), flags), "\x1b[25;41m");
    }

    #[test]
    fn ice_does_not_affect_foreground() {
        assert_eq!(fg_str(Color::rgb(255, 0, 0), ColorFlags::ICE), "\x1b[31m");
    }

    #[test]
    fn aixterm_wins_over_ice() {
        let flags = ColorFlags::AIXTERM | ColorFlags::ICE;
        assert_eq!(bg_str(Color::rgb(255, 0, 0), flags), "\x1b[101m");
    }

    #[test]
    fn tier_selection_per_layer() {
        let flags = ColorFlags::ICE;
        assert_eq!(ColorTier::select(flags, Layer::Foreground), ColorTier::Base);
        assert_eq!(ColorTier::select(flags, Layer::Background), ColorTier::Ice);
        assert_eq!(
            ColorTier::select(ColorFlags::TABLE | ColorFlags::AIXTERM, Layer::Foreground),
            ColorTier::Table
        );
    }

    // ── Attributes & fonts ──────────────────────────────────────────────

    #[test]
    fn attrs_empty_writes_nothing() {
        assert_eq!(emit(|w| attrs(w, Attr::empty())), "");
    }

    #[test]
    fn attrs_combined() {
        assert_eq!(emit(|w| attrs(w, Attr::BOLD | Attr::UNDERLINE | Attr::STRIKETHROUGH)), "\x1b[1;4;9m");
    }

    #[test]
    fn font_change_requires_flag() {
        let mut buf = Vec::new();
        assert!(!select_font(&mut buf, 1, &caps(ColorFlags::empty())).unwrap());
        assert!(buf.is_empty());

        assert!(select_font(&mut buf, 1, &caps(ColorFlags::FONT_CHANGE)).unwrap());
        assert_eq!(buf, b"\x1b[11m");
    }

    #[test]
    fn font_out_of_range_is_ignored() {
        let mut buf = Vec::new();
        assert!(!select_font(&mut buf, 10, &caps(ColorFlags::FONT_CHANGE)).unwrap());
        assert!(buf.is_empty());
    }

    // ── Glyphs ──────────────────────────────────────────────────────────

    #[test]
    fn glyph_through_charset() {
        let mut buf = Vec::new();
        glyph(&mut buf, '█', Charset::Cp437).unwrap();
        glyph(&mut buf, '█', Charset::Ascii).unwrap();
        glyph(&mut buf, '█', Charset::Utf8).unwrap();
        let mut expected = vec![0xDB, b'?'];
        expected.extend_from_slice("█".as_bytes());
        assert_eq!(buf, expected);
    }

    // ── Mouse ───────────────────────────────────────────────────────────

    #[test]
    fn mouse_mode_table() {
        let expected = [
            (MouseMode::X10, "\x1b[?9h", "\x1b[?9l"),
            (MouseMode::Click, "\x1b[?1000h", "\x1b[?1000l"),
            (MouseMode::Drag, "\x1b[?1002h", "\x1b[?1002l"),
            (MouseMode::Motion, "\x1b[?1003h", "\x1b[?1003l"),
            (MouseMode::Utf8, "\x1b[?1005h", "\x1b[?1005l"),
            (MouseMode::Sgr, "\x1b[?1006h", "\x1b[?1006l"),
            (MouseMode::Urxvt, "\x1b[?1015h", "\x1b[?1015l"),
        ];
        for (mode, on, off) in expected {
            assert_eq!(emit(|w| enable_mouse(w, mode)), on, "{mode}");
            assert_eq!(emit(|w| disable_mouse(w, mode)), off, "{mode}");
        }
    }

    #[test]
    fn mouse_mode_parses() {
        assert_eq!("SGR".parse::<MouseMode>(), Ok(MouseMode::Sgr));
        assert!("wheel".parse::<MouseMode>().is_err());
    }
}
