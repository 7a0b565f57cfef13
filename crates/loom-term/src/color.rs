// SPDX-License-Identifier: MIT
//
// loom-term color model — RGB/HSB values and palette degradation.
//
// Tenants paint in 24-bit RGB. The remote terminal may only understand a
// 256-color palette, 16 colors, or the original 8. Degradation maps a true
// color request down to whatever the capability descriptor advertises:
//
//   Rgb ──► PaletteColor (6×6×6 cube + 24-step gray ramp)
//       └─► standard 16 (nearest by luminance-weighted distance)
//           └─► standard 8
//
// The distance metric and the gray-ramp thresholds are wire-visible: two
// sessions degrading the same color must pick the same index, so the
// formulas here are fixed and must not be "improved".
//
// HSV math keeps its usual one-letter names (r, g, b, h, s, v, p, q, t, f).

#![allow(clippy::many_single_char_names)]

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::{Error, Result};

// ─── Rgb ─────────────────────────────────────────────────────────────────────

/// A 24-bit sRGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(try_from = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Self = Self::new(0, 0, 0);
    pub const WHITE: Self = Self::new(255, 255, 255);

    #[inline]
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Build from wide integers, rejecting channels outside `0..=255`.
    ///
    /// # Errors
    ///
    /// [`Error::ColorRange`] naming the first offending channel.
    pub fn try_new(r: i32, g: i32, b: i32) -> Result<Self> {
        let channel = |name: char, value: i32| {
            u8::try_from(value).map_err(|_| Error::ColorRange { channel: name, value })
        };
        Ok(Self {
            r: channel('r', r)?,
            g: channel('g', g)?,
            b: channel('b', b)?,
        })
    }

    /// Parse `#RRGGBB` or `#RGB` (the `#` is optional).
    ///
    /// # Errors
    ///
    /// [`Error::InvalidHex`] if the string is not a valid hex color.
    pub fn from_hex(s: &str) -> Result<Self> {
        let digits = s.strip_prefix('#').unwrap_or(s);
        let bad = || Error::InvalidHex(s.to_owned());
        let nibble = |c: u8| -> Result<u8> {
            char::from(c)
                .to_digit(16)
                .and_then(|d| u8::try_from(d).ok())
                .ok_or_else(bad)
        };
        let bytes = digits.as_bytes();
        match bytes.len() {
            3 => {
                let r = nibble(bytes[0])?;
                let g = nibble(bytes[1])?;
                let b = nibble(bytes[2])?;
                Ok(Self::new(r * 17, g * 17, b * 17))
            }
            6 => {
                let byte = |i: usize| -> Result<u8> { Ok((nibble(bytes[i])? << 4) | nibble(bytes[i + 1])?) };
                Ok(Self::new(byte(0)?, byte(2)?, byte(4)?))
            }
            _ => Err(bad()),
        }
    }

    /// Whether all three channels are equal.
    #[inline]
    #[must_use]
    pub const fn is_gray(self) -> bool {
        self.r == self.g && self.g == self.b
    }

    /// Convert to hue/saturation/brightness.
    ///
    /// Hue is expressed as a fraction of the full turn (0.0–1.0). A color with
    /// zero saturation (any gray) has hue 0.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn to_hsb(self) -> Hsb {
        let r = i32::from(self.r);
        let g = i32::from(self.g);
        let b = i32::from(self.b);
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);

        let brightness = max as f32 / 255.0;
        let saturation = if max == 0 { 0.0 } else { (max - min) as f32 / max as f32 };

        if saturation == 0.0 {
            return Hsb { hue: 0.0, saturation, brightness };
        }

        let span = (max - min) as f32;
        let rc = (max - r) as f32 / span;
        let gc = (max - g) as f32 / span;
        let bc = (max - b) as f32 / span;

        let sector = if r == max {
            bc - gc
        } else if g == max {
            2.0 + rc - bc
        } else {
            4.0 + gc - rc
        };

        let mut hue = sector / 6.0;
        if hue < 0.0 {
            hue += 1.0;
        }

        Hsb { hue, saturation, brightness }
    }

    /// Channels as `f64` for distance math.
    #[inline]
    fn channels(self) -> (f64, f64, f64) {
        (f64::from(self.r), f64::from(self.g), f64::from(self.b))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for Rgb {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl TryFrom<String> for Rgb {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::from_hex(&s)
    }
}

// ─── Hsb ─────────────────────────────────────────────────────────────────────

/// Hue, saturation, and brightness, each in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Hsb {
    pub hue: f32,
    pub saturation: f32,
    pub brightness: f32,
}

impl Hsb {
    #[inline]
    #[must_use]
    pub const fn new(hue: f32, saturation: f32, brightness: f32) -> Self {
        Self { hue, saturation, brightness }
    }

    /// Reconstruct RGB using the six-sector table.
    ///
    /// Only the fractional part of `hue` is used, so `1.25` behaves like
    /// `0.25`. Saturation and brightness are clamped to `0.0..=1.0`.
    #[must_use]
    pub fn to_rgb(self) -> Rgb {
        let s = self.saturation.clamp(0.0, 1.0);
        let v = self.brightness.clamp(0.0, 1.0);

        if s == 0.0 {
            let c = to_u8(v);
            return Rgb::new(c, c, c);
        }

        let h = (self.hue - self.hue.floor()) * 6.0;
        // A fraction just below 1.0 can round up to a full turn.
        let h = if h >= 6.0 { 0.0 } else { h };
        let f = h - h.floor();
        let p = v * (1.0 - s);
        let q = v * (1.0 - s * f);
        let t = v * (1.0 - s * (1.0 - f));

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let (r, g, b) = match h as u8 {
            0 => (v, t, p),
            1 => (q, v, p),
            2 => (p, v, t),
            3 => (p, q, v),
            4 => (t, p, v),
            _ => (v, p, q),
        };

        Rgb::new(to_u8(r), to_u8(g), to_u8(b))
    }
}

/// Scale a `0.0..=1.0` component to `0..=255`, rounding half up.
#[inline]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_u8(v: f32) -> u8 {
    v.mul_add(255.0, 0.5).clamp(0.0, 255.0) as u8
}

// ─── Distance ────────────────────────────────────────────────────────────────

/// Luminance-weighted distance between two colors:
///
/// `sqrt((0.3·Δr)² + (0.59·Δg)² + (0.11·Δb)²)`
///
/// Not a true perceptual space, but the accepted approximation every
/// degradation decision is made with. Kept crate-private on purpose: it is a
/// tie-breaker for palette matching, not a general color metric.
#[must_use]
pub(crate) fn color_distance(a: Rgb, b: Rgb) -> f64 {
    let (ar, ag, ab) = a.channels();
    let (br, bg, bb) = b.channels();
    let dr = 0.3 * (ar - br);
    let dg = 0.59 * (ag - bg);
    let db = 0.11 * (ab - bb);
    db.mul_add(db, dr.mul_add(dr, dg * dg)).sqrt()
}

// ─── Palette ─────────────────────────────────────────────────────────────────

/// The standard 16 colors as RGB values.
///
/// These match the widely-used "xterm" defaults. Individual terminals may
/// override them, but for nearest-match decisions these are the reference.
pub const STANDARD16: [Rgb; 16] = [
    Rgb::new(0, 0, 0),       // 0: Black
    Rgb::new(128, 0, 0),     // 1: Red
    Rgb::new(0, 128, 0),     // 2: Green
    Rgb::new(128, 128, 0),   // 3: Yellow
    Rgb::new(0, 0, 128),     // 4: Blue
    Rgb::new(128, 0, 128),   // 5: Magenta
    Rgb::new(0, 128, 128),   // 6: Cyan
    Rgb::new(192, 192, 192), // 7: White
    Rgb::new(128, 128, 128), // 8: Bright Black
    Rgb::new(255, 0, 0),     // 9: Bright Red
    Rgb::new(0, 255, 0),     // 10: Bright Green
    Rgb::new(255, 255, 0),   // 11: Bright Yellow
    Rgb::new(0, 0, 255),     // 12: Bright Blue
    Rgb::new(255, 0, 255),   // 13: Bright Magenta
    Rgb::new(0, 255, 255),   // 14: Bright Cyan
    Rgb::new(255, 255, 255), // 15: Bright White
];

/// An index into the 256-color terminal palette.
///
/// - 0–15: the standard 16 colors
/// - 16–231: a 6×6×6 RGB cube
/// - 232–255: a 24-step grayscale ramp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PaletteColor(pub u8);

impl PaletteColor {
    #[inline]
    #[must_use]
    pub const fn index(self) -> u8 {
        self.0
    }

    /// Whether this index has a 4-bit SGR encoding (`30–37`, `90–97`).
    #[inline]
    #[must_use]
    pub const fn is_standard(self) -> bool {
        self.0 < 16
    }

    /// The xterm RGB value this index displays as.
    #[must_use]
    pub fn to_rgb(self) -> Rgb {
        palette_to_rgb(self.0)
    }
}

/// Convert a 256-palette index to its xterm RGB value.
#[must_use]
pub fn palette_to_rgb(idx: u8) -> Rgb {
    match idx {
        0..=15 => STANDARD16[usize::from(idx)],

        16..=231 => {
            let idx = idx - 16;
            // The cube levels are 0, 95, 135, 175, 215, 255.
            let level = |i: u8| -> u8 { if i == 0 { 0 } else { 55 + 40 * i } };
            Rgb::new(level(idx / 36), level((idx % 36) / 6), level(idx % 6))
        }

        232..=255 => {
            let v = 8 + 10 * (idx - 232);
            Rgb::new(v, v, v)
        }
    }
}

/// Round a channel to the nearest of the six cube levels (0–5).
#[inline]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn cube_level(c: u8) -> u8 {
    (f32::from(c) / 255.0 * 5.0).round() as u8
}

/// Degrade a true color to a 256-palette index.
///
/// Grays (`r == g == b`) go to the grayscale ramp, except near-black
/// (`< 8`, index 16) and near-white (`> 248`, index 231) which the cube
/// corners represent exactly. Everything else rounds each channel to the
/// nearest cube level. Pure: the same input always yields the same index.
#[must_use]
pub fn degrade_to_palette(rgb: Rgb) -> PaletteColor {
    if rgb.is_gray() {
        let v = rgb.r;
        if v < 8 {
            return PaletteColor(16);
        }
        if v > 248 {
            return PaletteColor(231);
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let step = ((f32::from(v) - 8.0) / 247.0 * 24.0).round() as u8;
        return PaletteColor(232 + step);
    }

    PaletteColor(16 + 36 * cube_level(rgb.r) + 6 * cube_level(rgb.g) + cube_level(rgb.b))
}

/// Index of the candidate nearest to `rgb`, ties going to the lowest index.
fn nearest(rgb: Rgb, candidates: &[Rgb]) -> u8 {
    let mut best_idx = 0usize;
    let mut best_dist = f64::MAX;

    for (idx, &candidate) in candidates.iter().enumerate() {
        let dist = color_distance(rgb, candidate);
        // Strict `<` keeps the first (lowest) index on ties.
        if dist < best_dist {
            best_dist = dist;
            best_idx = idx;
        }
    }

    // Candidate tables never exceed 16 entries.
    u8::try_from(best_idx).unwrap_or(0)
}

/// Nearest of the standard 16 colors.
#[must_use]
pub fn degrade_to_standard16(rgb: Rgb) -> u8 {
    nearest(rgb, &STANDARD16)
}

/// Nearest of the original 8 colors (the non-bright half of the 16).
#[must_use]
pub fn degrade_to_standard8(rgb: Rgb) -> u8 {
    nearest(rgb, &STANDARD16[..8])
}

// ─── Color ───────────────────────────────────────────────────────────────────

/// A paint color as stored in a cell.
///
/// `Default` defers to the terminal's own theme. `Rgb` is what tenants
/// normally paint with; `Palette` lets a tenant pin an exact palette slot.
/// Degradation happens at encode time, per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Color {
    #[default]
    Default,
    Rgb(Rgb),
    Palette(PaletteColor),
}

impl Color {
    /// Shorthand for `Color::Rgb(Rgb::new(r, g, b))`.
    #[inline]
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::Rgb(Rgb::new(r, g, b))
    }

    /// The RGB value this color displays as, or `None` for the default.
    #[must_use]
    pub fn to_rgb(self) -> Option<Rgb> {
        match self {
            Self::Default => None,
            Self::Rgb(rgb) => Some(rgb),
            Self::Palette(p) => Some(p.to_rgb()),
        }
    }

    /// Whether this is the terminal default color.
    #[inline]
    #[must_use]
    pub const fn is_default(self) -> bool {
        matches!(self, Self::Default)
    }
}

impl From<Rgb> for Color {
    fn from(rgb: Rgb) -> Self {
        Self::Rgb(rgb)
    }
}

impl From<PaletteColor> for Color {
    fn from(p: PaletteColor) -> Self {
        Self::Palette(p)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
