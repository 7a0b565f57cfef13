// SPDX-License-Identifier: MIT

use loom_term::geometry::Rect;

use crate::surface::Surface;

/// Something a tenant can attach to the scene.
///
/// The scene owns placement after attach: `bounds` is read once to validate
/// and seed the node's rectangle, and later moves go through the scene's
/// setters. `render` is called during paint with a surface in the node's
/// own coordinates, already clipped to what is visible and damaged.
///
/// `render` runs while the scene is locked for reading. It must not call
/// back into the scene's mutating operations.
pub trait Drawable: Send + Sync {
    /// Requested placement, relative to the parent (or the terminal for a root).
    fn bounds(&self) -> Rect;

    fn render(&self, surface: &mut Surface<'_>);

    /// Short name for logs.
    fn label(&self) -> &str {
        "drawable"
    }
}
