// SPDX-License-Identifier: MIT
//
// Mouse input.
//
// The host's input layer owns byte framing and keyboard decoding; the scene
// only needs to know where the pointer is. This module holds the parsed
// event shape the host hands over, plus a decoder for the one report format
// worth decoding here: SGR (`ESC [ < b ; x ; y M|m`), which is what
// `MouseMode::Sgr` asks the terminal to send.

use bitflags::bitflags;

use crate::geometry::Point;

bitflags! {
    /// Modifier keys held during a mouse event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b001;
        const ALT   = 0b010;
        const CTRL  = 0b100;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseKind {
    Press(MouseButton),
    Release(MouseButton),
    /// Moved with a button held.
    Drag(MouseButton),
    /// Moved with no button held (any-motion tracking only).
    Move,
    ScrollUp,
    ScrollDown,
}

/// A parsed mouse report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseEvent {
    /// 0-indexed terminal cell.
    pub position: Point,
    pub kind: MouseKind,
    pub modifiers: Modifiers,
}

impl MouseEvent {
    #[must_use]
    pub const fn new(position: Point, kind: MouseKind) -> Self {
        Self { position, kind, modifiers: Modifiers::empty() }
    }
}

// ─── SGR decoding ────────────────────────────────────────────────────────────

/// Result of looking at the front of an input buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoded {
    /// A complete report and the number of bytes it used.
    Event(MouseEvent, usize),
    /// The buffer starts with a report that has not fully arrived.
    Incomplete,
    /// Not an SGR mouse report; skip this many bytes.
    Invalid(usize),
}

const SGR_PREFIX: &[u8] = b"\x1b[<";

/// Decode one SGR mouse report from the front of `buf`.
#[must_use]
pub fn decode_sgr(buf: &[u8]) -> Decoded {
    if buf.len() < SGR_PREFIX.len() {
        return if SGR_PREFIX.starts_with(buf) { Decoded::Incomplete } else { Decoded::Invalid(1) };
    }
    if !buf.starts_with(SGR_PREFIX) {
        return Decoded::Invalid(1);
    }

    let body = &buf[SGR_PREFIX.len()..];
    let Some(end) = body.iter().position(|&b| !(b.is_ascii_digit() || b == b';')) else {
        return Decoded::Incomplete;
    };
    let consumed = SGR_PREFIX.len() + end + 1;
    let release = match body[end] {
        b'M' => false,
        b'm' => true,
        _ => return Decoded::Invalid(consumed),
    };

    let mut fields = body[..end].split(|&b| b == b';').map(parse_u16);
    let (Some(Some(cb)), Some(Some(col)), Some(Some(row)), None) =
        (fields.next(), fields.next(), fields.next(), fields.next())
    else {
        return Decoded::Invalid(consumed);
    };

    let Some(kind) = decode_kind(cb, release) else {
        return Decoded::Invalid(consumed);
    };

    let mut modifiers = Modifiers::empty();
    modifiers.set(Modifiers::SHIFT, cb & 4 != 0);
    modifiers.set(Modifiers::ALT, cb & 8 != 0);
    modifiers.set(Modifiers::CTRL, cb & 16 != 0);

    // Reports are 1-indexed.
    let position = Point::new(i32::from(col) - 1, i32::from(row) - 1);
    Decoded::Event(MouseEvent { position, kind, modifiers }, consumed)
}

fn decode_kind(cb: u16, release: bool) -> Option<MouseKind> {
    let button = match cb & 3 {
        0 => Some(MouseButton::Left),
        1 => Some(MouseButton::Middle),
        2 => Some(MouseButton::Right),
        _ => None,
    };

    if cb & 64 != 0 {
        return match cb & 3 {
            0 => Some(MouseKind::ScrollUp),
            1 => Some(MouseKind::ScrollDown),
            // Horizontal wheel: not routed.
            _ => None,
        };
    }
    if cb & 32 != 0 {
        return Some(button.map_or(MouseKind::Move, MouseKind::Drag));
    }
    let button = button?;
    Some(if release { MouseKind::Release(button) } else { MouseKind::Press(button) })
}

fn parse_u16(digits: &[u8]) -> Option<u16> {
    if digits.is_empty() {
        return None;
    }
    digits
        .iter()
        .try_fold(0u16, |acc, &d| acc.checked_mul(10)?.checked_add(u16::from(d - b'0')))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn press_is_zero_indexed() {
        let Decoded::Event(ev, used) = decode_sgr(b"\x1b[<0;1;1M") else { panic!("no event") };
        assert_eq!(used, 9);
        assert_eq!(ev, MouseEvent::new(Point::ORIGIN, MouseKind::Press(MouseButton::Left)));
    }

    #[test]
    fn release_drag_and_move() {
        let kind = |bytes: &[u8]| match decode_sgr(bytes) {
            Decoded::Event(ev, _) => Some(ev.kind),
            _ => None,
        };
        assert_eq!(kind(b"\x1b[<2;5;5m"), Some(MouseKind::Release(MouseButton::Right)));
        assert_eq!(kind(b"\x1b[<32;5;5M"), Some(MouseKind::Drag(MouseButton::Left)));
        assert_eq!(kind(b"\x1b[<35;5;5M"), Some(MouseKind::Move));
        assert_eq!(kind(b"\x1b[<65;5;5M"), Some(MouseKind::ScrollDown));
    }

    #[test]
    fn modifiers_and_trailing_bytes() {
        let Decoded::Event(ev, used) = decode_sgr(b"\x1b[<20;12;7Mtail") else { panic!("no event") };
        assert_eq!(used, 11);
        assert_eq!(ev.position, Point::new(11, 6));
        assert_eq!(ev.modifiers, Modifiers::SHIFT | Modifiers::CTRL);
    }

    #[test]
    fn partial_reports_wait() {
        assert_eq!(decode_sgr(b"\x1b"), Decoded::Incomplete);
        assert_eq!(decode_sgr(b"\x1b[<"), Decoded::Incomplete);
        assert_eq!(decode_sgr(b"\x1b[<0;10"), Decoded::Incomplete);
    }

    #[test]
    fn garbage_is_skipped() {
        assert_eq!(decode_sgr(b"abc"), Decoded::Invalid(1));
        assert_eq!(decode_sgr(b"\x1b[<0;1;1X"), Decoded::Invalid(9));
        assert_eq!(decode_sgr(b"\x1b[<0;1M"), Decoded::Invalid(7));
        assert_eq!(decode_sgr(b"\x1b[<0;99999;1M"), Decoded::Invalid(13));
    }
}
