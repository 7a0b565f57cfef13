// SPDX-License-Identifier: MIT

use loom_term::geometry::Rect;
use thiserror::Error;

use crate::node::{NodeId, TenantId};

/// Failures from scene operations. None of them are retried internally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SceneError {
    /// A placement that does not fit inside its container (the parent's
    /// local bounds, or the terminal for a root).
    #[error("{rect} does not fit inside {container}")]
    OutOfBounds { rect: Rect, container: Rect },

    /// The handle was never attached, or has been detached since.
    #[error("node {0} is not attached")]
    NodeNotFound(NodeId),

    /// A tenant tried to change a node it did not attach.
    #[error("tenant {tenant} does not own node {node}")]
    NotOwner { node: NodeId, tenant: TenantId },

    /// An ancestor link points at a node that no longer exists. The tree is
    /// corrupt; this is never expected in normal operation.
    #[error("node {node} has a dangling ancestor {missing}")]
    BrokenChain { node: NodeId, missing: NodeId },
}

pub type Result<T, E = SceneError> = std::result::Result<T, E>;
