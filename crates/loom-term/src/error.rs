// SPDX-License-Identifier: MIT
//
// Errors raised by value construction and capability negotiation.
//
// All of these are local, synchronous failures: they are returned by the call
// that caused them and never retried inside the crate.

use thiserror::Error;

use crate::caps::Charset;

/// Failures from geometry, color, and capability operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A size or rectangle with a non-positive dimension.
    #[error("invalid geometry: {width}x{height} (both dimensions must be >= 1)")]
    InvalidGeometry { width: i32, height: i32 },

    /// An RGB channel outside `0..=255`.
    #[error("color channel {channel} out of range: {value} (expected 0..=255)")]
    ColorRange { channel: char, value: i32 },

    /// A hex color string that isn't `#RGB` or `#RRGGBB`.
    #[error("invalid hex color: {0:?}")]
    InvalidHex(String),

    /// Activating a charset the remote terminal never advertised.
    #[error("unsupported charset: {0}")]
    UnsupportedCharset(Charset),

    /// A charset, mouse mode, or color tier name that isn't recognized.
    #[error("unknown {kind}: {name:?}")]
    UnknownName { kind: &'static str, name: String },
}

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
