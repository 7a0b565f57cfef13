// SPDX-License-Identifier: MIT
//
// Demo scene.
//
// Two tenants share one terminal. The desktop tenant owns a backdrop and a
// notes window; the chat tenant opens its own window on the desktop's
// backdrop, moves it, and tries (and fails) to close the desktop's window.
// The desktop then closes its notes window, uncovering the backdrop.

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use loom_scene::{Drawable, NodeId, Parent, Scene, SceneError, Surface, TenantId};
use loom_term::buffer::string_width;
use loom_term::caps::Charset;
use loom_term::cell::{Attr, Cell};
use loom_term::color::{Color, Hsb};
use loom_term::geometry::{Point, Rect, Size};
use loom_term::input::{MouseButton, MouseEvent, MouseKind};
use tracing::{info, warn};

use crate::session::Session;

const DESKTOP: TenantId = TenantId(1);
const CHAT: TenantId = TenantId(2);

const TEXT: Color = Color::rgb(235, 235, 235);

// ─── Drawables ───────────────────────────────────────────────────────────────

/// Solid fill with a caption along the bottom row.
struct Backdrop {
    rect: Rect,
    bg: Color,
    caption: String,
}

impl Drawable for Backdrop {
    fn bounds(&self) -> Rect {
        self.rect
    }

    fn render(&self, surface: &mut Surface<'_>) {
        surface.clear(self.bg);
        let row = surface.size().height() - 1;
        surface.text(Point::new(1, row), &self.caption, Color::rgb(200, 200, 200), self.bg, Attr::DIM);
    }

    fn label(&self) -> &str {
        "backdrop"
    }
}

/// Box-drawing set, picked once from the session's active charset.
#[derive(Debug, Clone, Copy)]
struct Frame {
    corners: [char; 4],
    horizontal: char,
    vertical: char,
}

impl Frame {
    const LINES: Self = Self { corners: ['┌', '┐', '└', '┘'], horizontal: '─', vertical: '│' };
    const ASCII: Self = Self { corners: ['+', '+', '+', '+'], horizontal: '-', vertical: '|' };

    fn for_charset(charset: Charset) -> Self {
        if charset.can_encode(Self::LINES.horizontal) { Self::LINES } else { Self::ASCII }
    }
}

/// A bordered window with a title and some lines of body text.
struct Window {
    rect: Rect,
    title: String,
    body: Vec<String>,
    accent: Color,
    bg: Color,
    frame: Frame,
}

impl Window {
    fn new(rect: Rect, title: &str, hue: f32, frame: Frame) -> Self {
        Self {
            rect,
            title: title.to_owned(),
            body: Vec::new(),
            accent: Hsb::new(hue, 0.6, 0.95).to_rgb().into(),
            bg: Hsb::new(hue, 0.5, 0.25).to_rgb().into(),
            frame,
        }
    }

    fn with_line(mut self, line: &str) -> Self {
        self.body.push(line.to_owned());
        self
    }
}

impl Drawable for Window {
    fn bounds(&self) -> Rect {
        self.rect
    }

    fn render(&self, surface: &mut Surface<'_>) {
        surface.clear(self.bg);
        let (w, h) = (surface.size().width(), surface.size().height());
        let edge = |ch| Cell::styled(ch, self.accent, self.bg, Attr::empty());

        for x in 1..w - 1 {
            surface.put(Point::new(x, 0), edge(self.frame.horizontal));
            surface.put(Point::new(x, h - 1), edge(self.frame.horizontal));
        }
        for y in 1..h - 1 {
            surface.put(Point::new(0, y), edge(self.frame.vertical));
            surface.put(Point::new(w - 1, y), edge(self.frame.vertical));
        }
        let [tl, tr, bl, br] = self.frame.corners;
        surface.put(Point::new(0, 0), edge(tl));
        surface.put(Point::new(w - 1, 0), edge(tr));
        surface.put(Point::new(0, h - 1), edge(bl));
        surface.put(Point::new(w - 1, h - 1), edge(br));

        // A title that would reach the right corner is left off.
        let title = format!(" {} ", self.title);
        if usize::try_from(w - 3).is_ok_and(|room| string_width(&title) <= room) {
            surface.text(Point::new(2, 0), &title, self.accent, self.bg, Attr::BOLD);
        }
        for (row, line) in (1..h - 1).zip(&self.body) {
            surface.text(Point::new(2, row), line, TEXT, self.bg, Attr::empty());
        }
    }

    fn label(&self) -> &str {
        &self.title
    }
}

// ─── Script ──────────────────────────────────────────────────────────────────

fn open(scene: &Scene, parent: Parent, owner: TenantId, window: Window) -> loom_scene::Result<NodeId> {
    scene.attach(parent, Arc::new(window), owner)
}

/// Play the demo on `session`, repainting after every step.
///
/// # Errors
///
/// A scene operation the script expects to succeed fails, or the sink does.
pub fn run<W: Write>(session: &mut Session<W>) -> Result<()> {
    let scene = Arc::clone(session.scene());
    let screen = Rect::of_size(session.capabilities().size());
    let frame = Frame::for_charset(session.capabilities().active_charset());

    let backdrop = scene
        .attach(
            Parent::Root,
            Arc::new(Backdrop {
                rect: screen,
                bg: Color::rgb(16, 24, 48),
                caption: format!("loom · {}", screen.size()),
            }),
            DESKTOP,
        )
        .context("desktop: attach backdrop")?;

    let notes_rect = fit(screen, Rect::new(2, 1, 30, 8)?);
    let notes = open(
        &scene,
        Parent::Node(backdrop),
        DESKTOP,
        Window::new(notes_rect, "notes", 0.12, frame)
            .with_line("owned by the desktop")
            .with_line("closes at the end"),
    )
    .context("desktop: open notes")?;

    let chat_rect = fit(screen, Rect::new(20, 5, 34, 7)?);
    let chat = open(
        &scene,
        Parent::Node(backdrop),
        CHAT,
        Window::new(chat_rect, "chat", 0.55, frame).with_line("<chat> hello from tenant 2"),
    )
    .context("chat: open window")?;

    session.start()?;
    let stats = session.repaint()?;
    info!(bytes = stats.bytes_written, "initial frame");

    // The chat window drifts right; only what it uncovered and covers is resent.
    let target = Point::new(chat_rect.min_x() + 6, chat_rect.min_y() + 2);
    let moved = fit(screen, chat_rect.with_origin(target)).origin();
    scene.set_absolute_point(chat, CHAT, moved).context("chat: move window")?;
    let stats = session.repaint_damage()?;
    info!(bytes = stats.bytes_written, to = %moved, "chat window moved");

    // A click on the notes window goes to its owner, which brings it forward.
    let click = MouseEvent::new(
        Point::new(notes_rect.min_x() + 1, notes_rect.min_y() + 1),
        MouseKind::Press(MouseButton::Left),
    );
    if let Some(hit) = session.on_mouse(&click) {
        scene.raise(hit.node, hit.owner).context("raise clicked window")?;
        let stats = session.repaint_damage()?;
        info!(node = %hit.node, owner = %hit.owner, bytes = stats.bytes_written, "window raised");
    }

    match scene.detach(notes, CHAT) {
        Err(SceneError::NotOwner { .. }) => info!("chat was refused the desktop's window"),
        other => warn!(result = ?other, "cross-tenant detach was not refused"),
    }

    scene.detach(notes, DESKTOP).context("desktop: close notes")?;
    let stats = session.repaint_damage()?;
    info!(bytes = stats.bytes_written, "notes closed");

    // The far terminal narrows. Nodes keep their placement and are clipped.
    let size = screen.size();
    let narrower = Size::new((size.width() * 7 / 8).max(1), size.height())?;
    let stats = session.resize(narrower)?;
    info!(to = %narrower, bytes = stats.bytes_written, "terminal resized");

    Ok(())
}

/// Shrink and shift `want` until it fits in `screen`.
fn fit(screen: Rect, want: Rect) -> Rect {
    let w = want.width().min(screen.width());
    let h = want.height().min(screen.height());
    let x = want.min_x().clamp(0, screen.width() - w);
    let y = want.min_y().clamp(0, screen.height() - h);
    Rect::new(x, y, w, h).unwrap_or(screen)
}
