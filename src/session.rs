// SPDX-License-Identifier: MIT
//
// Session — one remote terminal and the scene drawn on it.
//
// The session owns the pieces that are per-connection: the capability
// descriptor, the scene tenants attach to, the frame the scene paints into,
// the diff renderer that turns frames into bytes, and the output sink.
//
//   tenants ──attach/move/detach──► Scene ──paint──► FrameBuffer
//                                                        │
//                                    Capabilities ──► DiffRenderer ──► W
//
// Tenants get an `Arc<Scene>` and never see the frame or the sink.

use std::io::{self, Write};
use std::sync::Arc;

use loom_scene::{Hit, Scene};
use loom_term::buffer::FrameBuffer;
use loom_term::caps::Capabilities;
use loom_term::diff::{DiffRenderer, RenderStats};
use loom_term::escape::{self, MouseMode};
use loom_term::geometry::Size;
use loom_term::input::MouseEvent;
use tracing::{debug, trace};

/// One connected terminal: its capabilities, scene, last frame and sink.
pub struct Session<W: Write> {
    caps: Arc<Capabilities>,
    scene: Arc<Scene>,
    frame: FrameBuffer,
    renderer: DiffRenderer,
    out: W,
    mouse: Option<MouseMode>,
}

impl<W: Write> Session<W> {
    #[must_use]
    pub fn new(caps: Capabilities, out: W) -> Self {
        let caps = Arc::new(caps);
        let frame = FrameBuffer::new(caps.size());
        Self {
            scene: Arc::new(Scene::new(Arc::clone(&caps))),
            caps,
            frame,
            renderer: DiffRenderer::new(),
            out,
            mouse: None,
        }
    }

    /// The scene, for handing to tenants.
    pub const fn scene(&self) -> &Arc<Scene> {
        &self.scene
    }

    /// The negotiated capabilities, shared with the scene.
    pub const fn capabilities(&self) -> &Arc<Capabilities> {
        &self.caps
    }

    #[cfg(test)]
    pub const fn frame(&self) -> &FrameBuffer {
        &self.frame
    }

    #[cfg(test)]
    pub const fn output(&self) -> &W {
        &self.out
    }

    /// Hide the cursor before the first frame.
    ///
    /// # Errors
    ///
    /// Whatever the sink reports.
    pub fn start(&mut self) -> io::Result<()> {
        escape::cursor_hide(&mut self.out)?;
        self.out.flush()
    }

    /// Paint the whole terminal and send what changed.
    ///
    /// Pending damage is dropped; a full paint covers it.
    ///
    /// # Errors
    ///
    /// Whatever the sink reports.
    pub fn repaint(&mut self) -> io::Result<RenderStats> {
        self.scene.take_damage();
        let painted = self.scene.paint_all(&mut self.frame);
        trace!(nodes = painted.nodes_painted, "full repaint");
        self.present()
    }

    /// Paint only what tenants changed since the last paint.
    ///
    /// # Errors
    ///
    /// Whatever the sink reports.
    pub fn repaint_damage(&mut self) -> io::Result<RenderStats> {
        let painted = self.scene.repaint_damage(&mut self.frame);
        trace!(nodes = painted.nodes_painted, region = ?painted.region, "damage repaint");
        self.present()
    }

    fn present(&mut self) -> io::Result<RenderStats> {
        let stats = self.renderer.render(&self.frame, &self.caps)?;
        self.renderer.flush_to(&mut self.out)?;
        self.out.flush()?;
        Ok(stats)
    }

    /// Apply a new terminal size and redraw everything.
    ///
    /// Nodes are not re-validated: a root that no longer fits is clipped.
    ///
    /// # Errors
    ///
    /// Whatever the sink reports.
    pub fn resize(&mut self, size: Size) -> io::Result<RenderStats> {
        debug!(%size, "terminal resized");
        self.caps.set_size(size);
        self.frame.resize(size);
        self.renderer.force_redraw();
        self.repaint()
    }

    /// Switch mouse reporting, turning off whatever was on.
    ///
    /// # Errors
    ///
    /// Whatever the sink reports.
    pub fn set_mouse(&mut self, mode: Option<MouseMode>) -> io::Result<()> {
        if let Some(old) = self.mouse.take() {
            escape::disable_mouse(&mut self.out, old)?;
        }
        if let Some(new) = mode {
            escape::enable_mouse(&mut self.out, new)?;
        }
        self.mouse = mode;
        self.out.flush()
    }

    /// Route a mouse event to the node under it.
    pub fn on_mouse(&self, event: &MouseEvent) -> Option<Hit> {
        let hit = self.scene.hit_test(event.position);
        trace!(position = %event.position, kind = ?event.kind, hit = ?hit, "mouse");
        hit
    }

    /// Restore the terminal and hand back the sink.
    ///
    /// # Errors
    ///
    /// Whatever the sink reports.
    pub fn finish(mut self) -> io::Result<W> {
        self.set_mouse(None)?;
        escape::reset(&mut self.out)?;
        escape::cursor_show(&mut self.out)?;
        self.out.flush()?;
        Ok(self.out)
    }
}
