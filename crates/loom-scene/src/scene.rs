// SPDX-License-Identifier: MIT
//
// Scene — the tree of attached drawables for one terminal session.
//
// Structure:
//
//   roots ─┬─ node ─┬─ child
//          │        └─ child      (list order = z-order, later on top)
//          └─ node
//
// Each node stores its rectangle relative to its parent; absolute positions
// are derived by walking the parent chain. Children are clipped to their
// ancestors when painted and hit-tested.
//
// One `RwLock` guards the whole tree. Mutations (attach, detach, moves,
// restacking) take it for writing. A paint pass takes it for reading and
// holds it through every render callback, so a concurrent attach or detach
// lands entirely before or after the pass. Damage (regions whose content
// changed) is queued under the same lock and drained by `repaint_damage`.

use std::mem;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use loom_term::buffer::FrameBuffer;
use loom_term::caps::Capabilities;
use loom_term::cell::Cell;
use loom_term::geometry::{Point, Rect};
use tracing::{debug, trace, warn};

use crate::drawable::Drawable;
use crate::error::{Result, SceneError};
use crate::node::{Arena, Node, NodeId, TenantId};
use crate::surface::Surface;

// ─── Public types ────────────────────────────────────────────────────────────

/// Where to attach a new node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parent {
    /// A top-level node, placed in terminal coordinates.
    Root,
    /// A child of an existing node, placed in that node's coordinates.
    Node(NodeId),
}

/// The topmost node under a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    pub node: NodeId,
    pub owner: TenantId,
    /// The point in the node's own coordinates.
    pub local: Point,
}

/// What a paint pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PaintStats {
    /// Render callbacks invoked.
    pub nodes_painted: usize,
    /// Subtrees skipped because they lay outside the painted region.
    pub nodes_culled: usize,
    /// The region actually cleared and painted, if any.
    pub region: Option<Rect>,
}

impl PaintStats {
    fn absorb(&mut self, other: Self) {
        self.nodes_painted += other.nodes_painted;
        self.nodes_culled += other.nodes_culled;
        self.region = match (self.region, other.region) {
            (Some(a), Some(b)) => Some(a.union(b)),
            (a, b) => a.or(b),
        };
    }
}

// ─── Tree ────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Tree {
    arena: Arena,
    roots: Vec<NodeId>,
    damage: Vec<Rect>,
}

impl Tree {
    fn node(&self, id: NodeId) -> Result<&Node> {
        self.arena.get(id).ok_or(SceneError::NodeNotFound(id))
    }

    /// The node, if `tenant` owns it.
    fn owned(&self, id: NodeId, tenant: TenantId) -> Result<&Node> {
        let node = self.node(id)?;
        if node.owner != tenant {
            warn!(node = %id, %tenant, owner = %node.owner, "refused mutation by non-owner");
            return Err(SceneError::NotOwner { node: id, tenant });
        }
        Ok(node)
    }

    fn absolute_rect(&self, id: NodeId) -> Result<Rect> {
        let node = self.node(id)?;
        let mut rect = node.rect;
        let mut next = node.parent;
        while let Some(pid) = next {
            let parent = self
                .arena
                .get(pid)
                .ok_or(SceneError::BrokenChain { node: id, missing: pid })?;
            rect = rect.translate(parent.rect.min_x(), parent.rect.min_y());
            next = parent.parent;
        }
        Ok(rect)
    }

    /// The rectangle a node's placement must fit in.
    fn container(&self, id: NodeId, parent: Option<NodeId>, screen: Rect) -> Result<Rect> {
        match parent {
            None => Ok(screen),
            Some(pid) => self
                .arena
                .get(pid)
                .map(|p| p.rect.zero())
                .ok_or(SceneError::BrokenChain { node: id, missing: pid }),
        }
    }

    fn siblings_mut(&mut self, id: NodeId, parent: Option<NodeId>) -> Result<&mut Vec<NodeId>> {
        match parent {
            None => Ok(&mut self.roots),
            Some(pid) => self
                .arena
                .get_mut(pid)
                .map(|p| &mut p.children)
                .ok_or(SceneError::BrokenChain { node: id, missing: pid }),
        }
    }

    /// `id` and all its descendants, parents before children.
    fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(node) = self.arena.get(next) {
                out.push(next);
                stack.extend(node.children.iter().rev());
            }
        }
        out
    }

    /// Validate and apply a new relative placement, queueing both the old
    /// and the new region as damage.
    fn place(&mut self, id: NodeId, tenant: TenantId, rect: Rect, screen: Rect) -> Result<()> {
        let parent = self.owned(id, tenant)?.parent;
        let container = self.container(id, parent, screen)?;
        if !container.contains_rect(rect) {
            debug!(node = %id, %rect, %container, "placement out of bounds");
            return Err(SceneError::OutOfBounds { rect, container });
        }

        let before = self.absolute_rect(id)?;
        if let Some(node) = self.arena.get_mut(id) {
            node.rect = rect;
        }
        let after = self.absolute_rect(id)?;

        self.queue_damage(before);
        self.queue_damage(after);
        trace!(node = %id, %before, %after, "node moved");
        Ok(())
    }

    /// Add a damage rect, merging it into an overlapping one if possible.
    fn queue_damage(&mut self, rect: Rect) {
        if let Some(existing) = self.damage.iter_mut().find(|d| d.intersects(rect)) {
            *existing = existing.union(rect);
        } else {
            self.damage.push(rect);
        }
    }

    fn paint_nodes(
        &self,
        ids: &[NodeId],
        origin: Point,
        clip: Rect,
        frame: &mut FrameBuffer,
        stats: &mut PaintStats,
    ) {
        for &id in ids {
            let Some(node) = self.arena.get(id) else {
                trace!(node = %id, "node vanished during paint, skipped");
                continue;
            };
            let abs = node.rect.translate(origin.x, origin.y);
            let Some(visible) = abs.clip(clip) else {
                stats.nodes_culled += 1;
                continue;
            };

            let mut surface = Surface::new(frame, abs.origin(), abs.size(), visible);
            node.drawable.render(&mut surface);
            stats.nodes_painted += 1;

            self.paint_nodes(&node.children, abs.origin(), visible, frame, stats);
        }
    }

    fn hit_nodes(&self, ids: &[NodeId], origin: Point, clip: Rect, point: Point, best: &mut Option<Hit>) {
        for &id in ids {
            let Some(node) = self.arena.get(id) else { continue };
            let abs = node.rect.translate(origin.x, origin.y);
            let Some(visible) = abs.clip(clip) else { continue };
            if !visible.contains_point(point) {
                continue;
            }
            *best = Some(Hit {
                node: id,
                owner: node.owner,
                local: point.delta_from(abs.origin()),
            });
            self.hit_nodes(&node.children, abs.origin(), visible, point, best);
        }
    }
}

// ─── Scene ───────────────────────────────────────────────────────────────────

/// The drawable tree for one session.
///
/// Shared between tenants (typically as `Arc<Scene>`); every method takes
/// `&self`. Mutators take the caller's [`TenantId`] and refuse to touch
/// nodes attached by someone else.
#[derive(Debug)]
pub struct Scene {
    caps: Arc<Capabilities>,
    tree: RwLock<Tree>,
}

impl Scene {
    #[must_use]
    pub fn new(caps: Arc<Capabilities>) -> Self {
        Self { caps, tree: RwLock::new(Tree::default()) }
    }

    #[must_use]
    pub const fn capabilities(&self) -> &Arc<Capabilities> {
        &self.caps
    }

    fn read(&self) -> RwLockReadGuard<'_, Tree> {
        self.tree.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tree> {
        self.tree.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// The terminal as a rectangle. Read before taking the tree lock.
    fn screen(&self) -> Rect {
        Rect::of_size(self.caps.size())
    }

    // ─── Structure ───────────────────────────────────────────────────────

    /// Attach `drawable` as the topmost child of `parent`.
    ///
    /// The drawable's [`bounds`](Drawable::bounds) must fit inside the
    /// parent's local bounds, or inside the terminal for a root. Any tenant
    /// may attach under any node; the new node belongs to `owner`.
    ///
    /// # Errors
    ///
    /// [`SceneError::NodeNotFound`] for a stale parent,
    /// [`SceneError::OutOfBounds`] if the placement does not fit.
    pub fn attach(&self, parent: Parent, drawable: Arc<dyn Drawable>, owner: TenantId) -> Result<NodeId> {
        let rect = drawable.bounds();
        let screen = self.screen();

        let mut tree = self.write();
        let parent_id = match parent {
            Parent::Root => None,
            Parent::Node(pid) => Some(pid),
        };
        let container = match parent_id {
            None => screen,
            Some(pid) => tree.node(pid)?.rect.zero(),
        };
        if !container.contains_rect(rect) {
            drop(tree);
            warn!(%owner, label = drawable.label(), %rect, %container, "attach out of bounds");
            return Err(SceneError::OutOfBounds { rect, container });
        }

        let id = tree.arena.insert(Node {
            drawable: Arc::clone(&drawable),
            owner,
            rect,
            parent: parent_id,
            children: Vec::new(),
        });
        match parent_id {
            None => tree.roots.push(id),
            Some(pid) => {
                if let Some(p) = tree.arena.get_mut(pid) {
                    p.children.push(id);
                }
            }
        }
        let region = tree.absolute_rect(id)?;
        tree.queue_damage(region);
        drop(tree);

        debug!(node = %id, %owner, label = drawable.label(), %region, "attached");
        Ok(id)
    }

    /// Remove `id` and everything under it.
    ///
    /// Only the owner of `id` itself is checked; descendants attached by
    /// other tenants go with it. The region the subtree covered is queued
    /// as damage so what was underneath shows through on the next repaint.
    ///
    /// # Errors
    ///
    /// [`SceneError::NodeNotFound`] if not attached,
    /// [`SceneError::NotOwner`] if `owner` did not attach it.
    pub fn detach(&self, id: NodeId, owner: TenantId) -> Result<()> {
        let mut tree = self.write();
        let parent = tree.owned(id, owner)?.parent;
        let region = tree.absolute_rect(id)?;

        tree.siblings_mut(id, parent)?.retain(|&s| s != id);
        let subtree = tree.subtree(id);
        for &n in &subtree {
            tree.arena.remove(n);
        }
        tree.queue_damage(region);
        drop(tree);

        debug!(node = %id, %owner, removed = subtree.len(), %region, "detached");
        Ok(())
    }

    /// Move `id` to the top of its siblings.
    ///
    /// # Errors
    ///
    /// As [`detach`](Self::detach).
    pub fn raise(&self, id: NodeId, owner: TenantId) -> Result<()> {
        self.restack(id, owner, true)
    }

    /// Move `id` to the bottom of its siblings.
    ///
    /// # Errors
    ///
    /// As [`detach`](Self::detach).
    pub fn lower(&self, id: NodeId, owner: TenantId) -> Result<()> {
        self.restack(id, owner, false)
    }

    fn restack(&self, id: NodeId, owner: TenantId, to_top: bool) -> Result<()> {
        let mut tree = self.write();
        let parent = tree.owned(id, owner)?.parent;
        let region = tree.absolute_rect(id)?;

        let siblings = tree.siblings_mut(id, parent)?;
        siblings.retain(|&s| s != id);
        if to_top {
            siblings.push(id);
        } else {
            siblings.insert(0, id);
        }
        tree.queue_damage(region);
        trace!(node = %id, to_top, "restacked");
        Ok(())
    }

    // ─── Geometry queries ────────────────────────────────────────────────

    /// Placement in the parent's coordinates.
    ///
    /// # Errors
    ///
    /// [`SceneError::NodeNotFound`] for a stale handle.
    pub fn relative_rect(&self, id: NodeId) -> Result<Rect> {
        self.read().node(id).map(|n| n.rect)
    }

    /// Placement in terminal coordinates.
    ///
    /// # Errors
    ///
    /// [`SceneError::NodeNotFound`] for a stale handle,
    /// [`SceneError::BrokenChain`] if an ancestor link dangles.
    pub fn absolute_rect(&self, id: NodeId) -> Result<Rect> {
        self.read().absolute_rect(id)
    }

    /// # Errors
    ///
    /// As [`relative_rect`](Self::relative_rect).
    pub fn relative_point(&self, id: NodeId) -> Result<Point> {
        self.relative_rect(id).map(Rect::origin)
    }

    /// # Errors
    ///
    /// As [`absolute_rect`](Self::absolute_rect).
    pub fn absolute_point(&self, id: NodeId) -> Result<Point> {
        self.absolute_rect(id).map(Rect::origin)
    }

    // ─── Geometry updates ────────────────────────────────────────────────

    /// Replace the placement in parent coordinates.
    ///
    /// # Errors
    ///
    /// [`SceneError::NodeNotFound`], [`SceneError::NotOwner`], or
    /// [`SceneError::OutOfBounds`] if `rect` does not fit the parent.
    pub fn set_relative_rect(&self, id: NodeId, owner: TenantId, rect: Rect) -> Result<()> {
        let screen = self.screen();
        self.write().place(id, owner, rect, screen)
    }

    /// Move without resizing, in parent coordinates.
    ///
    /// # Errors
    ///
    /// As [`set_relative_rect`](Self::set_relative_rect).
    pub fn set_relative_point(&self, id: NodeId, owner: TenantId, point: Point) -> Result<()> {
        let screen = self.screen();
        let mut tree = self.write();
        let rect = tree.node(id)?.rect.with_origin(point);
        tree.place(id, owner, rect, screen)
    }

    /// Place in terminal coordinates.
    ///
    /// The current absolute position is read and the difference applied to
    /// the relative placement under one write lock, so an ancestor moving
    /// concurrently is never overwritten.
    ///
    /// # Errors
    ///
    /// As [`set_relative_rect`](Self::set_relative_rect), plus
    /// [`SceneError::BrokenChain`].
    pub fn set_absolute_rect(&self, id: NodeId, owner: TenantId, rect: Rect) -> Result<()> {
        let screen = self.screen();
        let mut tree = self.write();
        let current = tree.absolute_rect(id)?;
        let relative = tree.node(id)?.rect;
        let delta = rect.origin().delta_from(current.origin());
        let target = Rect::from_parts(relative.origin().offset(delta), rect.size());
        tree.place(id, owner, target, screen)
    }

    /// Move without resizing, in terminal coordinates.
    ///
    /// # Errors
    ///
    /// As [`set_absolute_rect`](Self::set_absolute_rect).
    pub fn set_absolute_point(&self, id: NodeId, owner: TenantId, point: Point) -> Result<()> {
        let screen = self.screen();
        let mut tree = self.write();
        let current = tree.absolute_rect(id)?;
        let relative = tree.node(id)?.rect;
        let delta = point.delta_from(current.origin());
        let target = relative.translate(delta.x, delta.y);
        tree.place(id, owner, target, screen)
    }

    // ─── Lookup ──────────────────────────────────────────────────────────

    /// The topmost visible node containing `point` (terminal coordinates).
    #[must_use]
    pub fn hit_test(&self, point: Point) -> Option<Hit> {
        let screen = self.screen();
        let tree = self.read();
        let mut best = None;
        tree.hit_nodes(&tree.roots, Point::ORIGIN, screen, point, &mut best);
        best
    }

    /// # Errors
    ///
    /// [`SceneError::NodeNotFound`] for a stale handle.
    pub fn owner(&self, id: NodeId) -> Result<TenantId> {
        self.read().node(id).map(|n| n.owner)
    }

    /// Children bottom to top.
    ///
    /// # Errors
    ///
    /// [`SceneError::NodeNotFound`] for a stale handle.
    pub fn children(&self, id: NodeId) -> Result<Vec<NodeId>> {
        self.read().node(id).map(|n| n.children.clone())
    }

    /// Top-level nodes bottom to top.
    #[must_use]
    pub fn roots(&self) -> Vec<NodeId> {
        self.read().roots.clone()
    }

    #[must_use]
    pub fn is_attached(&self, id: NodeId) -> bool {
        self.read().arena.contains(id)
    }

    /// Number of attached nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().arena.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ─── Painting ────────────────────────────────────────────────────────

    /// Clear `region` and repaint every node that intersects it.
    ///
    /// Nodes paint ancestors first, siblings bottom to top, each clipped to
    /// `region ∩ node ∩ ancestors ∩ terminal`. Does not touch queued damage.
    pub fn paint(&self, region: Rect, frame: &mut FrameBuffer) -> PaintStats {
        let screen = self.screen();
        let mut stats = PaintStats::default();
        let Some(clip) = region.clip(screen).and_then(|r| r.clip(frame.bounds())) else {
            return stats;
        };

        let tree = self.read();
        frame.fill(clip, Cell::EMPTY, clip);
        tree.paint_nodes(&tree.roots, Point::ORIGIN, clip, frame, &mut stats);
        drop(tree);

        stats.region = Some(clip);
        trace!(%clip, painted = stats.nodes_painted, culled = stats.nodes_culled, "painted");
        stats
    }

    /// Repaint the whole terminal.
    pub fn paint_all(&self, frame: &mut FrameBuffer) -> PaintStats {
        self.paint(self.screen(), frame)
    }

    /// Drain the queued damage.
    pub fn take_damage(&self) -> Vec<Rect> {
        mem::take(&mut self.write().damage)
    }

    /// Repaint every queued damage region.
    pub fn repaint_damage(&self, frame: &mut FrameBuffer) -> PaintStats {
        let mut stats = PaintStats::default();
        for rect in self.take_damage() {
            stats.absorb(self.paint(rect, frame));
        }
        stats
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use loom_term::caps::{Charset, ColorFlags};
    use loom_term::color::Color;
    use loom_term::geometry::Size;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use std::sync::Mutex;
    use std::thread;

    const A: TenantId = TenantId(1);
    const B: TenantId = TenantId(2);

    fn rect(x: i32, y: i32, w: i32, h: i32) -> Rect {
        Rect::new(x, y, w, h).unwrap()
    }

    /// Fills its whole area with one character.
    struct Block {
        rect: Rect,
        ch: char,
        log: Option<Arc<Mutex<Vec<char>>>>,
    }

    impl Block {
        fn new(rect: Rect, ch: char) -> Arc<Self> {
            Arc::new(Self { rect, ch, log: None })
        }

        fn logged(rect: Rect, ch: char, log: &Arc<Mutex<Vec<char>>>) -> Arc<Self> {
            Arc::new(Self { rect, ch, log: Some(Arc::clone(log)) })
        }
    }

    impl Drawable for Block {
        fn bounds(&self) -> Rect {
            self.rect
        }

        fn render(&self, surface: &mut Surface<'_>) {
            if let Some(log) = &self.log {
                log.lock().unwrap().push(self.ch);
            }
            surface.fill(surface.bounds(), Cell::new(self.ch).with_bg(Color::rgb(0, 0, 64)));
        }

        fn label(&self) -> &str {
            "block"
        }
    }

    fn scene(w: i32, h: i32) -> Scene {
        let caps = Capabilities::new(Size::new(w, h).unwrap(), [Charset::Utf8], ColorFlags::all());
        Scene::new(Arc::new(caps))
    }

    fn frame_for(scene: &Scene) -> FrameBuffer {
        FrameBuffer::new(scene.capabilities().size())
    }

    fn ch_at(f: &FrameBuffer, x: i32, y: i32) -> char {
        f.get(Point::new(x, y)).and_then(|c| c.character()).unwrap_or('\0')
    }

    // ── Attach & detach ─────────────────────────────────────────────────

    #[test]
    fn container_and_child_end_to_end() {
        let s = scene(80, 24);
        let c = s.attach(Parent::Root, Block::new(rect(0, 0, 80, 24), 'C'), A).unwrap();
        let d = s.attach(Parent::Node(c), Block::new(rect(5, 5, 10, 4), 'D'), A).unwrap();

        assert_eq!(s.absolute_rect(d).unwrap(), rect(5, 5, 10, 4));
        assert_eq!(s.relative_rect(d).unwrap(), rect(5, 5, 10, 4));
        assert_eq!(s.children(c).unwrap(), vec![d]);

        s.detach(d, A).unwrap();
        assert_eq!(s.relative_rect(d), Err(SceneError::NodeNotFound(d)));
        assert_eq!(s.absolute_rect(d), Err(SceneError::NodeNotFound(d)));
        assert_eq!(s.absolute_point(d), Err(SceneError::NodeNotFound(d)));
        assert!(s.children(c).unwrap().is_empty());
    }

    #[test]
    fn attach_checks_bounds_against_parent() {
        let s = scene(80, 24);
        let c = s.attach(Parent::Root, Block::new(rect(10, 10, 20, 5), 'C'), A).unwrap();
        // Fits the terminal, but not the parent's local 20×5.
        let err = s.attach(Parent::Node(c), Block::new(rect(15, 0, 10, 1), 'D'), A);
        assert_eq!(
            err,
            Err(SceneError::OutOfBounds { rect: rect(15, 0, 10, 1), container: rect(0, 0, 20, 5) })
        );
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn attach_root_checks_terminal_size() {
        let s = scene(80, 24);
        assert!(matches!(
            s.attach(Parent::Root, Block::new(rect(0, 0, 81, 24), 'X'), A),
            Err(SceneError::OutOfBounds { .. })
        ));
        assert!(matches!(
            s.attach(Parent::Root, Block::new(rect(-1, 0, 2, 2), 'X'), A),
            Err(SceneError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn attach_under_stale_parent_fails() {
        let s = scene(80, 24);
        let c = s.attach(Parent::Root, Block::new(rect(0, 0, 10, 10), 'C'), A).unwrap();
        s.detach(c, A).unwrap();
        assert_eq!(
            s.attach(Parent::Node(c), Block::new(rect(0, 0, 1, 1), 'D'), A),
            Err(SceneError::NodeNotFound(c))
        );
    }

    #[test]
    fn detach_removes_subtree() {
        let s = scene(80, 24);
        let c = s.attach(Parent::Root, Block::new(rect(0, 0, 40, 20), 'C'), A).unwrap();
        let d = s.attach(Parent::Node(c), Block::new(rect(1, 1, 20, 10), 'D'), A).unwrap();
        let e = s.attach(Parent::Node(d), Block::new(rect(1, 1, 5, 5), 'E'), B).unwrap();
        let other = s.attach(Parent::Root, Block::new(rect(50, 0, 5, 5), 'O'), B).unwrap();

        s.detach(c, A).unwrap();
        for id in [c, d, e] {
            assert!(!s.is_attached(id), "{id} still attached");
        }
        assert!(s.is_attached(other));
        assert_eq!(s.roots(), vec![other]);
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn detach_twice_fails() {
        let s = scene(80, 24);
        let c = s.attach(Parent::Root, Block::new(rect(0, 0, 1, 1), 'C'), A).unwrap();
        s.detach(c, A).unwrap();
        assert_eq!(s.detach(c, A), Err(SceneError::NodeNotFound(c)));
    }

    #[test]
    fn stale_handle_stays_stale_after_slot_reuse() {
        let s = scene(80, 24);
        let old = s.attach(Parent::Root, Block::new(rect(0, 0, 1, 1), 'X'), A).unwrap();
        s.detach(old, A).unwrap();
        let new = s.attach(Parent::Root, Block::new(rect(0, 0, 2, 2), 'Y'), B).unwrap();
        assert_eq!(new.index(), old.index());
        assert_eq!(s.relative_rect(old), Err(SceneError::NodeNotFound(old)));
        assert_eq!(s.detach(old, B), Err(SceneError::NodeNotFound(old)));
    }

    // ── Ownership ───────────────────────────────────────────────────────

    #[test]
    fn other_tenant_cannot_mutate() {
        let s = scene(80, 24);
        let c = s.attach(Parent::Root, Block::new(rect(0, 0, 10, 10), 'C'), A).unwrap();
        let denied = SceneError::NotOwner { node: c, tenant: B };

        assert_eq!(s.detach(c, B), Err(denied.clone()));
        assert_eq!(s.set_relative_point(c, B, Point::new(1, 1)), Err(denied.clone()));
        assert_eq!(s.set_absolute_rect(c, B, rect(0, 0, 5, 5)), Err(denied.clone()));
        assert_eq!(s.raise(c, B), Err(denied));
        assert_eq!(s.relative_rect(c).unwrap(), rect(0, 0, 10, 10));
    }

    #[test]
    fn tenants_may_attach_under_each_other() {
        let s = scene(80, 24);
        let c = s.attach(Parent::Root, Block::new(rect(0, 0, 10, 10), 'C'), A).unwrap();
        let d = s.attach(Parent::Node(c), Block::new(rect(0, 0, 2, 2), 'D'), B).unwrap();
        assert_eq!(s.owner(d).unwrap(), B);
        assert!(matches!(s.detach(d, A), Err(SceneError::NotOwner { .. })));
        s.detach(d, B).unwrap();
    }

    // ── Coordinates ─────────────────────────────────────────────────────

    #[test]
    fn child_follows_moving_parent() {
        let s = scene(80, 24);
        let c = s.attach(Parent::Root, Block::new(rect(10, 10, 40, 10), 'C'), A).unwrap();
        let d = s.attach(Parent::Node(c), Block::new(rect(2, 2, 5, 5), 'D'), A).unwrap();
        assert_eq!(s.absolute_point(d).unwrap(), Point::new(12, 12));

        s.set_relative_point(c, A, Point::new(20, 5)).unwrap();
        assert_eq!(s.absolute_point(d).unwrap(), Point::new(22, 7));
        assert_eq!(s.relative_point(d).unwrap(), Point::new(2, 2));

        s.set_absolute_point(d, A, Point::new(25, 8)).unwrap();
        assert_eq!(s.relative_point(d).unwrap(), Point::new(5, 3));
        assert_eq!(s.absolute_rect(d).unwrap(), rect(25, 8, 5, 5));
    }

    #[test]
    fn set_absolute_rect_resizes_and_moves() {
        let s = scene(80, 24);
        let c = s.attach(Parent::Root, Block::new(rect(10, 5, 30, 10), 'C'), A).unwrap();
        let d = s.attach(Parent::Node(c), Block::new(rect(0, 0, 5, 5), 'D'), A).unwrap();
        s.set_absolute_rect(d, A, rect(12, 6, 8, 3)).unwrap();
        assert_eq!(s.relative_rect(d).unwrap(), rect(2, 1, 8, 3));
    }

    #[test]
    fn out_of_bounds_move_leaves_node_in_place() {
        let s = scene(80, 24);
        let c = s.attach(Parent::Root, Block::new(rect(0, 0, 10, 10), 'C'), A).unwrap();
        let d = s.attach(Parent::Node(c), Block::new(rect(0, 0, 5, 5), 'D'), A).unwrap();
        assert!(matches!(
            s.set_relative_point(d, A, Point::new(6, 0)),
            Err(SceneError::OutOfBounds { .. })
        ));
        assert_eq!(s.relative_rect(d).unwrap(), rect(0, 0, 5, 5));
    }

    // ── Painting ────────────────────────────────────────────────────────

    #[test]
    fn later_siblings_paint_on_top() {
        let s = scene(10, 3);
        s.attach(Parent::Root, Block::new(rect(0, 0, 6, 1), 'a'), A).unwrap();
        let b = s.attach(Parent::Root, Block::new(rect(3, 0, 6, 1), 'b'), B).unwrap();
        let mut f = frame_for(&s);

        s.paint_all(&mut f);
        assert_eq!(ch_at(&f, 2, 0), 'a');
        assert_eq!(ch_at(&f, 4, 0), 'b');

        s.lower(b, B).unwrap();
        s.paint_all(&mut f);
        assert_eq!(ch_at(&f, 4, 0), 'a');
        assert_eq!(ch_at(&f, 7, 0), 'b');
    }

    #[test]
    fn paint_order_is_ancestor_first() {
        let s = scene(20, 10);
        let log = Arc::new(Mutex::new(Vec::new()));
        let c = s.attach(Parent::Root, Block::logged(rect(0, 0, 10, 10), 'c', &log), A).unwrap();
        s.attach(Parent::Node(c), Block::logged(rect(0, 0, 2, 2), 'd', &log), A).unwrap();
        s.attach(Parent::Root, Block::logged(rect(5, 5, 5, 5), 'e', &log), B).unwrap();

        s.paint_all(&mut frame_for(&s));
        assert_eq!(*log.lock().unwrap(), vec!['c', 'd', 'e']);
    }

    #[test]
    fn paint_skips_nodes_outside_region() {
        let s = scene(20, 10);
        let log = Arc::new(Mutex::new(Vec::new()));
        s.attach(Parent::Root, Block::logged(rect(0, 0, 5, 5), 'l', &log), A).unwrap();
        s.attach(Parent::Root, Block::logged(rect(10, 0, 5, 5), 'r', &log), A).unwrap();

        let stats = s.paint(rect(11, 1, 2, 2), &mut frame_for(&s));
        assert_eq!(*log.lock().unwrap(), vec!['r']);
        assert_eq!(stats.nodes_painted, 1);
        assert_eq!(stats.nodes_culled, 1);
        assert_eq!(stats.region, Some(rect(11, 1, 2, 2)));
    }

    #[test]
    fn paint_only_touches_region() {
        let s = scene(10, 1);
        s.attach(Parent::Root, Block::new(rect(0, 0, 10, 1), 'x'), A).unwrap();
        let mut f = frame_for(&s);
        s.paint(rect(2, 0, 3, 1), &mut f);
        assert_eq!(ch_at(&f, 1, 0), ' ');
        assert_eq!(ch_at(&f, 2, 0), 'x');
        assert_eq!(ch_at(&f, 4, 0), 'x');
        assert_eq!(ch_at(&f, 5, 0), ' ');
    }

    #[test]
    fn children_are_clipped_to_shrunk_parent() {
        let s = scene(20, 5);
        let c = s.attach(Parent::Root, Block::new(rect(0, 0, 10, 5), 'c'), A).unwrap();
        s.attach(Parent::Node(c), Block::new(rect(5, 0, 5, 1), 'd'), A).unwrap();
        s.set_relative_rect(c, A, rect(0, 0, 7, 5)).unwrap();

        let mut f = frame_for(&s);
        s.paint_all(&mut f);
        assert_eq!(ch_at(&f, 6, 0), 'd');
        assert_eq!(ch_at(&f, 7, 0), ' ');
    }

    #[test]
    fn detach_damage_uncovers_what_was_beneath() {
        let s = scene(20, 5);
        s.attach(Parent::Root, Block::new(rect(0, 0, 20, 5), 'b'), A).unwrap();
        let w = s.attach(Parent::Root, Block::new(rect(2, 1, 4, 2), 'w'), B).unwrap();
        let mut f = frame_for(&s);
        s.take_damage();
        s.paint_all(&mut f);
        assert_eq!(ch_at(&f, 3, 1), 'w');

        s.detach(w, B).unwrap();
        assert_eq!(s.take_damage(), vec![rect(2, 1, 4, 2)]);

        // Queue it again through a fresh detach to exercise repaint_damage.
        let w = s.attach(Parent::Root, Block::new(rect(2, 1, 4, 2), 'w'), B).unwrap();
        s.repaint_damage(&mut f);
        s.detach(w, B).unwrap();
        let stats = s.repaint_damage(&mut f);
        assert_eq!(stats.region, Some(rect(2, 1, 4, 2)));
        assert_eq!(ch_at(&f, 3, 1), 'b');
        assert!(s.take_damage().is_empty());
    }

    #[test]
    fn move_damages_old_and_new_regions() {
        let s = scene(40, 10);
        let c = s.attach(Parent::Root, Block::new(rect(0, 0, 2, 2), 'c'), A).unwrap();
        s.take_damage();
        s.set_relative_point(c, A, Point::new(30, 5)).unwrap();
        assert_eq!(s.take_damage(), vec![rect(0, 0, 2, 2), rect(30, 5, 2, 2)]);
    }

    #[test]
    fn resize_alone_queues_nothing() {
        let s = scene(40, 10);
        s.attach(Parent::Root, Block::new(rect(0, 0, 2, 2), 'c'), A).unwrap();
        s.take_damage();
        s.capabilities().set_size(Size::new(100, 30).unwrap());
        assert!(s.take_damage().is_empty());
    }

    // ── Hit testing ─────────────────────────────────────────────────────

    #[test]
    fn hit_test_finds_topmost() {
        let s = scene(20, 10);
        let c = s.attach(Parent::Root, Block::new(rect(0, 0, 10, 10), 'c'), A).unwrap();
        let d = s.attach(Parent::Node(c), Block::new(rect(2, 2, 3, 3), 'd'), B).unwrap();

        assert_eq!(
            s.hit_test(Point::new(3, 4)),
            Some(Hit { node: d, owner: B, local: Point::new(1, 2) })
        );
        assert_eq!(s.hit_test(Point::new(8, 8)).map(|h| h.node), Some(c));
        assert_eq!(s.hit_test(Point::new(15, 0)), None);
    }

    proptest! {
        #[test]
        fn absolute_is_relative_plus_parent(
            px in 0..40i32, py in 0..12i32, cx in 0..20i32, cy in 0..8i32,
        ) {
            let s = scene(80, 24);
            let c = s.attach(Parent::Root, Block::new(rect(px, py, 40, 12), 'c'), A).unwrap();
            let d = s.attach(Parent::Node(c), Block::new(rect(cx, cy, 20, 4), 'd'), A).unwrap();
            prop_assert_eq!(s.absolute_rect(d).unwrap(), rect(px + cx, py + cy, 20, 4));
            prop_assert_eq!(s.hit_test(Point::new(px + cx, py + cy)).map(|h| h.node), Some(d));
        }
    }

    // ── Concurrency ─────────────────────────────────────────────────────

    #[test]
    fn concurrent_tenants_and_painter() {
        let s = Arc::new(scene(80, 24));
        let base = s.attach(Parent::Root, Block::new(rect(0, 0, 80, 24), '.'), A).unwrap();

        let workers: Vec<_> = (0..4u64)
            .map(|t| {
                let s = Arc::clone(&s);
                thread::spawn(move || {
                    let tenant = TenantId(10 + t);
                    for i in 0..50 {
                        let x = i32::try_from((t * 10) % 70).unwrap();
                        let id = s
                            .attach(Parent::Node(base), Block::new(rect(x, i % 20, 5, 3), 'w'), tenant)
                            .unwrap();
                        s.set_relative_point(id, tenant, Point::new(x + 1, i % 20)).unwrap();
                        s.detach(id, tenant).unwrap();
                    }
                })
            })
            .collect();

        let painter = {
            let s = Arc::clone(&s);
            thread::spawn(move || {
                let mut f = FrameBuffer::new(s.capabilities().size());
                for _ in 0..50 {
                    s.paint_all(&mut f);
                }
            })
        };

        for w in workers {
            w.join().unwrap();
        }
        painter.join().unwrap();

        assert_eq!(s.len(), 1);
        assert!(s.children(base).unwrap().is_empty());
    }
}
