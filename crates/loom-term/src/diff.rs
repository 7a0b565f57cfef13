// SPDX-License-Identifier: MIT
//
// Differential renderer.
//
// Compares the session's frame against the one last sent and encodes only
// the cells that changed. Unchanged rows are skipped with one slice
// comparison. The first frame, a size change, or a forced redraw clears the
// remote screen and sends everything.
//
// Encoding goes through a `CellWriter` retargeted to the session's
// capabilities at the start of every frame, so a negotiation that lands
// between frames (say, the terminal turns out to support 256 colors) takes
// effect on the next one.

use std::io::{self, Write};

use tracing::trace;

use crate::buffer::FrameBuffer;
use crate::caps::Capabilities;
use crate::escape;
use crate::output::{CellWriter, OutputBuffer};

/// Counters from one render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderStats {
    pub cells_rendered: usize,
    pub cells_skipped: usize,
    pub bytes_written: usize,
}

/// Frame-to-frame diff encoder for one session.
#[derive(Debug)]
pub struct DiffRenderer {
    output: OutputBuffer,
    writer: CellWriter,
    previous: Option<FrameBuffer>,
}

impl DiffRenderer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            output: OutputBuffer::new(),
            writer: CellWriter::new(),
            previous: None,
        }
    }

    /// Encode the differences between `current` and the last frame.
    ///
    /// Bytes stay buffered until [`flush_to`](Self::flush_to).
    ///
    /// # Errors
    ///
    /// Only if encoding into the in-memory buffer fails, which it does not
    /// in practice.
    pub fn render(&mut self, current: &FrameBuffer, caps: &Capabilities) -> io::Result<RenderStats> {
        self.output.clear();
        self.writer.reset_state();
        self.writer.retarget(caps);

        let width = current.width();
        let mut stats = RenderStats::default();

        let full_redraw = !self
            .previous
            .as_ref()
            .is_some_and(|prev| prev.width() == width && prev.height() == current.height());

        escape::begin_sync(&mut self.output)?;
        if full_redraw {
            escape::reset(&mut self.output)?;
            escape::clear_screen(&mut self.output)?;
        }

        for y in 0..current.height() {
            let Some(row) = current.row(y) else { continue };
            let prev_row = if full_redraw {
                None
            } else {
                self.previous.as_ref().and_then(|p| p.row(y))
            };

            if prev_row == Some(row) {
                stats.cells_skipped += usize::from(width);
                continue;
            }

            for (x, cell) in (0..width).zip(row) {
                let changed = prev_row.and_then(|r| r.get(usize::from(x))) != Some(cell);
                if changed {
                    self.writer.render_cell(&mut self.output, x, y, cell)?;
                    stats.cells_rendered += 1;
                } else {
                    stats.cells_skipped += 1;
                }
            }
        }

        escape::reset(&mut self.output)?;
        escape::end_sync(&mut self.output)?;

        stats.bytes_written = self.output.len();
        trace!(
            rendered = stats.cells_rendered,
            skipped = stats.cells_skipped,
            bytes = stats.bytes_written,
            full_redraw,
            "frame encoded"
        );

        match &mut self.previous {
            Some(prev) => prev.copy_from(current),
            None => self.previous = Some(current.clone()),
        }

        Ok(stats)
    }

    /// Bytes produced by the last render.
    #[must_use]
    pub fn output_bytes(&self) -> &[u8] {
        self.output.as_bytes()
    }

    /// Hand the last render's bytes to the output sink.
    ///
    /// # Errors
    ///
    /// Whatever `w` reports.
    pub fn flush_to(&mut self, w: &mut impl Write) -> io::Result<()> {
        self.output.flush_to(w)
    }

    /// Make the next render send the whole frame.
    pub fn force_redraw(&mut self) {
        self.previous = None;
    }
}

impl Default for DiffRenderer {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
