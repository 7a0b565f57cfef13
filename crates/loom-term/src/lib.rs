// SPDX-License-Identifier: MIT
//
// loom-term — the terminal encoding layer of loom.
//
// Everything between "a tenant painted a red cell" and "these bytes go to the
// remote terminal" lives here: validated geometry, the RGB/HSB color model and
// its degradation to coarser palettes, the per-session capability descriptor
// that says what the far end can actually display, and the escape encoder that
// turns colors into SGR bytes for that descriptor.
//
// The scene graph (who owns which rectangle, what paints on top) lives in
// `loom-scene`. This crate has no notion of tenants.

pub mod buffer;
pub mod caps;
pub mod cell;
pub mod color;
pub mod diff;
pub mod escape;
pub mod geometry;
pub mod input;
pub mod output;
pub mod tty;

mod error;

pub use error::{Error, Result};
