// SPDX-License-Identifier: MIT
//
// loom-scene — the drawable scene graph.
//
// Tenants attach drawables into a tree of rectangles. Each node remembers
// which tenant attached it, and every mutation is checked against that
// owner. Painting walks the tree in z-order and hands each drawable a
// write-only surface clipped to its own region, so one tenant can neither
// read nor overwrite another's cells.

pub mod drawable;
pub mod node;
pub mod scene;
pub mod surface;

mod error;

pub use drawable::Drawable;
pub use error::{Result, SceneError};
pub use node::{NodeId, TenantId};
pub use scene::{Hit, PaintStats, Parent, Scene};
pub use surface::Surface;
