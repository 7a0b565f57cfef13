// SPDX-License-Identifier: MIT
//
// Per-session terminal capability descriptor.
//
// Every remote terminal is different: some speak 24-bit color, some stop at
// the 256-color table, old ones know 8 colors and a codepage. The descriptor
// records what negotiation (handled outside this crate) found out, and the
// escape encoder consults it for every color it emits.
//
// Three pieces of state, three independent locks:
//
//   size     RwLock<Size>          read on every paint, written on resize
//   flags    RwLock<ColorFlags>    read on every color, written on negotiation
//   charsets Mutex<CharsetState>   ordered set + active, mutated together
//
// None of these locks is ever held while another is taken, and none is held
// across I/O. A poisoned lock is recovered: the guarded values are plain data
// that a panicking writer cannot leave half-updated.

use std::fmt;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::geometry::Size;
use crate::{Error, Result};

// ─── Charset ─────────────────────────────────────────────────────────────────

/// A character encoding the remote terminal may understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Charset {
    Utf8,
    Latin1,
    Cp437,
    Ascii,
}

/// Byte used for characters the active charset cannot represent.
pub const REPLACEMENT: u8 = b'?';

/// Code page 437, bytes `0x80..=0xFF`.
#[rustfmt::skip]
const CP437_HIGH: [char; 128] = [
    'Ç', 'ü', 'é', 'â', 'ä', 'à', 'å', 'ç', 'ê', 'ë', 'è', 'ï', 'î', 'ì', 'Ä', 'Å',
    'É', 'æ', 'Æ', 'ô', 'ö', 'ò', 'û', 'ù', 'ÿ', 'Ö', 'Ü', '¢', '£', '¥', '₧', 'ƒ',
    'á', 'í', 'ó', 'ú', 'ñ', 'Ñ', 'ª', 'º', '¿', '⌐', '¬', '½', '¼', '¡', '«', '»',
    '░', '▒', '▓', '│', '┤', '╡', '╢', '╖', '╕', '╣', '║', '╗', '╝', '╜', '╛', '┐',
    '└', '┴', '┬', '├', '─', '┼', '╞', '╟', '╚', '╔', '╩', '╦', '╠', '═', '╬', '╧',
    '╨', '╤', '╥', '╙', '╘', '╒', '╓', '╫', '╪', '┘', '┌', '█', '▄', '▌', '▐', '▀',
    'α', 'ß', 'Γ', 'π', 'Σ', 'σ', 'µ', 'τ', 'Φ', 'Θ', 'Ω', 'δ', '∞', 'φ', 'ε', '∩',
    '≡', '±', '≥', '≤', '⌠', '⌡', '÷', '≈', '°', '∙', '·', '√', 'ⁿ', '²', '■', '\u{a0}',
];

impl Charset {
    pub const ALL: [Self; 4] = [Self::Utf8, Self::Latin1, Self::Cp437, Self::Ascii];

    /// Canonical lowercase name, as used in config files and on the CLI.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Utf8 => "utf8",
            Self::Latin1 => "latin1",
            Self::Cp437 => "cp437",
            Self::Ascii => "ascii",
        }
    }

    /// Encode `ch` into `buf`, returning the bytes to send.
    ///
    /// Characters outside the charset become [`REPLACEMENT`].
    pub fn encode(self, ch: char, buf: &mut [u8; 4]) -> &[u8] {
        if self == Self::Utf8 {
            return ch.encode_utf8(buf).as_bytes();
        }
        buf[0] = self.single_byte(ch).unwrap_or(REPLACEMENT);
        &buf[..1]
    }

    /// Whether `ch` survives encoding without replacement.
    #[must_use]
    pub fn can_encode(self, ch: char) -> bool {
        self == Self::Utf8 || self.single_byte(ch).is_some()
    }

    fn single_byte(self, ch: char) -> Option<u8> {
        let cp = u32::from(ch);
        match self {
            Self::Utf8 => None,
            Self::Ascii => u8::try_from(cp).ok().filter(u8::is_ascii),
            Self::Latin1 => u8::try_from(cp).ok(),
            Self::Cp437 => {
                if cp < 0x80 {
                    return u8::try_from(cp).ok();
                }
                CP437_HIGH
                    .iter()
                    .position(|&c| c == ch)
                    .and_then(|i| u8::try_from(0x80 + i).ok())
            }
        }
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Charset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        match lower.as_str() {
            "utf8" | "utf-8" => Ok(Self::Utf8),
            "latin1" | "iso-8859-1" => Ok(Self::Latin1),
            "cp437" | "ibm437" => Ok(Self::Cp437),
            "ascii" | "us-ascii" => Ok(Self::Ascii),
            _ => Err(Error::UnknownName { kind: "charset", name: s.to_owned() }),
        }
    }
}

// ─── Color Flags ─────────────────────────────────────────────────────────────

bitflags::bitflags! {
    /// Color features the remote terminal advertised.
    ///
    /// With no flags set the terminal is assumed to handle the original
    /// eight ANSI colors and nothing else.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct ColorFlags: u8 {
        /// Bright colors via SGR 90–97 / 100–107.
        const AIXTERM     = 1 << 0;
        /// The 256-color table via SGR 38;5 / 48;5.
        const TABLE       = 1 << 1;
        /// 24-bit color via SGR 38;2 / 48;2.
        const TRUE_COLOR  = 1 << 2;
        /// Bright backgrounds through the blink bit (iCE colors).
        const ICE         = 1 << 3;
        /// Alternate fonts via SGR 10–19.
        const FONT_CHANGE = 1 << 4;
    }
}

// ─── Capabilities ────────────────────────────────────────────────────────────

#[derive(Debug)]
struct CharsetState {
    /// Preference order, first is most preferred. Never empty.
    supported: Vec<Charset>,
    active: Charset,
}

/// What one remote terminal can display.
///
/// Shared between the scene (reads `size`) and the encoder (reads flags and
/// the active charset), typically behind an `Arc`. All methods take `&self`.
#[derive(Debug)]
pub struct Capabilities {
    size: RwLock<Size>,
    flags: RwLock<ColorFlags>,
    charsets: Mutex<CharsetState>,
}

impl Capabilities {
    /// Build a descriptor.
    ///
    /// `charsets` is taken in preference order; duplicates are dropped. The
    /// first entry becomes active. An empty list falls back to ASCII, which
    /// every terminal understands.
    pub fn new(size: Size, charsets: impl IntoIterator<Item = Charset>, flags: ColorFlags) -> Self {
        let mut supported: Vec<Charset> = Vec::new();
        for c in charsets {
            if !supported.contains(&c) {
                supported.push(c);
            }
        }
        if supported.is_empty() {
            supported.push(Charset::Ascii);
        }
        let active = supported[0];

        Self {
            size: RwLock::new(size),
            flags: RwLock::new(flags),
            charsets: Mutex::new(CharsetState { supported, active }),
        }
    }

    // ─── Size ────────────────────────────────────────────────────────────

    /// Current terminal dimensions.
    #[must_use]
    pub fn size(&self) -> Size {
        *self.size.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the terminal dimensions.
    ///
    /// Affects subsequent layout checks and paints only. Nothing is redrawn
    /// here; the host decides when to repaint.
    pub fn set_size(&self, size: Size) {
        let mut guard = self.size.write().unwrap_or_else(PoisonError::into_inner);
        if *guard != size {
            debug!(from = %*guard, to = %size, "terminal resized");
        }
        *guard = size;
    }

    // ─── Color ───────────────────────────────────────────────────────────

    /// Color features currently advertised.
    #[must_use]
    pub fn color_flags(&self) -> ColorFlags {
        *self.flags.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the advertised color features.
    pub fn set_color_flags(&self, flags: ColorFlags) {
        debug!(?flags, "color capabilities updated");
        *self.flags.write().unwrap_or_else(PoisonError::into_inner) = flags;
    }

    /// Whether every flag in `flag` is advertised.
    #[must_use]
    pub fn supports(&self, flag: ColorFlags) -> bool {
        self.color_flags().contains(flag)
    }

    // ─── Charsets ────────────────────────────────────────────────────────

    fn charset_state(&self) -> MutexGuard<'_, CharsetState> {
        self.charsets.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Supported charsets in preference order.
    #[must_use]
    pub fn charsets(&self) -> Vec<Charset> {
        self.charset_state().supported.clone()
    }

    /// Charset glyphs are encoded with right now.
    #[must_use]
    pub fn active_charset(&self) -> Charset {
        self.charset_state().active
    }

    /// Make `charset` the one glyphs are encoded with.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedCharset`] if it was never added.
    pub fn set_active_charset(&self, charset: Charset) -> Result<()> {
        let mut state = self.charset_state();
        if !state.supported.contains(&charset) {
            warn!(%charset, supported = ?state.supported, "refused to activate unsupported charset");
            return Err(Error::UnsupportedCharset(charset));
        }
        debug!(from = %state.active, to = %charset, "active charset changed");
        state.active = charset;
        Ok(())
    }

    /// Append `charset` at the lowest preference if not already present.
    ///
    /// Returns `true` if it was added.
    pub fn add_charset_support(&self, charset: Charset) -> bool {
        let mut state = self.charset_state();
        if state.supported.contains(&charset) {
            return false;
        }
        state.supported.push(charset);
        debug!(%charset, supported = ?state.supported, "charset support added");
        true
    }

    /// Drop `charset` from the supported set.
    ///
    /// The last remaining charset cannot be removed. Removing the active
    /// charset activates the most preferred one left. Returns `true` if the
    /// set changed.
    pub fn remove_charset_support(&self, charset: Charset) -> bool {
        let mut state = self.charset_state();
        let Some(pos) = state.supported.iter().position(|&c| c == charset) else {
            return false;
        };
        if state.supported.len() == 1 {
            warn!(%charset, "refused to remove the only supported charset");
            return false;
        }
        state.supported.remove(pos);
        if state.active == charset {
            state.active = state.supported[0];
            debug!(removed = %charset, active = %state.active, "active charset removed, fell back");
        } else {
            debug!(%charset, supported = ?state.supported, "charset support removed");
        }
        true
    }
}

impl Default for Capabilities {
    /// An 80×24 UTF-8 terminal with full color.
    fn default() -> Self {
        Self::new(
            Size::DEFAULT_TERMINAL,
            [Charset::Utf8],
            ColorFlags::TRUE_COLOR | ColorFlags::TABLE | ColorFlags::AIXTERM,
        )
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
