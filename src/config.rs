// SPDX-License-Identifier: MIT
//
// Session configuration.
//
// What the far terminal can do, as far as this host knows before any
// negotiation: its size, the charsets it accepts in preference order, how
// many colors it shows, and which mouse reporting to ask for. Values come from
// code defaults, then an optional TOML profile, then command-line flags.
//
// A profile looks like:
//
//   width = 120
//   height = 40
//   charsets = ["utf8", "latin1"]
//   color = "256"
//   ice = false
//   mouse = "sgr"

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use clap::ValueEnum;
use loom_term::caps::{Capabilities, Charset, ColorFlags};
use loom_term::escape::MouseMode;
use loom_term::geometry::Size;
use loom_term::tty;
use serde::Deserialize;

/// How many colors the far terminal shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
pub enum ColorDepth {
    /// 24-bit RGB.
    #[default]
    #[serde(rename = "true", alias = "truecolor")]
    #[value(name = "true", alias = "truecolor")]
    True,
    /// The xterm 256-color table.
    #[serde(rename = "256")]
    #[value(name = "256")]
    Table,
    /// 8 colors plus bright variants.
    #[serde(rename = "16")]
    #[value(name = "16")]
    Bright,
    /// The basic 8.
    #[serde(rename = "8")]
    #[value(name = "8")]
    Basic,
}

impl ColorDepth {
    #[must_use]
    pub const fn flags(self) -> ColorFlags {
        match self {
            Self::True => ColorFlags::TRUE_COLOR.union(ColorFlags::TABLE).union(ColorFlags::AIXTERM),
            Self::Table => ColorFlags::TABLE.union(ColorFlags::AIXTERM),
            Self::Bright => ColorFlags::AIXTERM,
            Self::Basic => ColorFlags::empty(),
        }
    }
}

/// Everything needed to stand up one session.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Columns. `None` asks the local terminal, then falls back to 80.
    pub width: Option<i32>,
    /// Rows. `None` asks the local terminal, then falls back to 24.
    pub height: Option<i32>,
    /// Accepted charsets, most preferred first.
    pub charsets: Vec<Charset>,
    pub color: ColorDepth,
    /// Bright backgrounds via blink (iCE colors).
    pub ice: bool,
    /// The terminal honors SGR 10–19 font selection.
    pub font_change: bool,
    pub mouse: Option<MouseMode>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            width: None,
            height: None,
            charsets: vec![Charset::Utf8],
            color: ColorDepth::default(),
            ice: false,
            font_change: false,
            mouse: None,
        }
    }
}

impl SessionConfig {
    /// Parse a TOML profile. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Malformed TOML, unknown keys, or out-of-range values.
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("invalid session profile")
    }

    /// Read and parse a TOML profile file.
    ///
    /// # Errors
    ///
    /// The file cannot be read, or [`from_toml`](Self::from_toml) fails.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("cannot read profile {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("in profile {}", path.display()))
    }

    /// Resolved terminal size: configured dimensions first, then the local
    /// terminal when stdout is one, then 80x24.
    ///
    /// # Errors
    ///
    /// A configured dimension below 1.
    pub fn size(&self) -> Result<Size> {
        let local = match (self.width, self.height) {
            (Some(_), Some(_)) => Size::DEFAULT_TERMINAL,
            _ if tty::is_tty() => tty::query_size().unwrap_or(Size::DEFAULT_TERMINAL),
            _ => Size::DEFAULT_TERMINAL,
        };
        let width = self.width.unwrap_or_else(|| local.width());
        let height = self.height.unwrap_or_else(|| local.height());
        Size::new(width, height).with_context(|| format!("bad terminal size {width}x{height}"))
    }

    #[must_use]
    pub const fn color_flags(&self) -> ColorFlags {
        let mut flags = self.color.flags();
        if self.ice {
            flags = flags.union(ColorFlags::ICE);
        }
        if self.font_change {
            flags = flags.union(ColorFlags::FONT_CHANGE);
        }
        flags
    }

    /// A fresh capability descriptor for one session.
    ///
    /// # Errors
    ///
    /// As [`size`](Self::size).
    pub fn capabilities(&self) -> Result<Capabilities> {
        Ok(Capabilities::new(self.size()?, self.charsets.iter().copied(), self.color_flags()))
    }
}
