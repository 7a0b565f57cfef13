// SPDX-License-Identifier: MIT
//
// Node storage.
//
// Nodes live in a slot arena addressed by `NodeId { index, generation }`.
// Removing a node bumps its slot's generation, so every handle that pointed
// at it (held by a tenant, or still sitting in some list) stops resolving
// instead of silently aliasing whatever node reuses the slot.

use std::fmt;
use std::sync::Arc;

use loom_term::geometry::Rect;

use crate::drawable::Drawable;

// ─── Identifiers ─────────────────────────────────────────────────────────────

/// Opaque token naming the plugin that performs an operation.
///
/// Issued by the host runtime; the scene only compares tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TenantId(pub u64);

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tenant#{}", self.0)
    }
}

/// Handle to an attached node. Stale once the node is detached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.index
    }

    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

// ─── Node ────────────────────────────────────────────────────────────────────

pub(crate) struct Node {
    pub(crate) drawable: Arc<dyn Drawable>,
    pub(crate) owner: TenantId,
    /// Placement in the parent's coordinate space.
    pub(crate) rect: Rect,
    pub(crate) parent: Option<NodeId>,
    /// Z-order: later children paint on top.
    pub(crate) children: Vec<NodeId>,
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("label", &self.drawable.label())
            .field("owner", &self.owner)
            .field("rect", &self.rect)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .finish()
    }
}

// ─── Arena ───────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

#[derive(Debug, Default)]
pub(crate) struct Arena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    len: usize,
}

impl Arena {
    pub(crate) fn insert(&mut self, node: Node) -> NodeId {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            return NodeId { index, generation: slot.generation };
        }
        // Slot counts beyond u32 would need four billion live drawables.
        let index = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
        self.slots.push(Slot { generation: 0, node: Some(node) });
        NodeId { index, generation: 0 }
    }

    pub(crate) fn get(&self, id: NodeId) -> Option<&Node> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_ref()
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_mut()
    }

    /// Take the node out and retire its handle.
    pub(crate) fn remove(&mut self, id: NodeId) -> Option<Node> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let node = slot.node.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.len -= 1;
        Some(node)
    }

    #[inline]
    pub(crate) fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    #[inline]
    pub(crate) const fn len(&self) -> usize {
        self.len
    }
}
