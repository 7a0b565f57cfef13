// SPDX-License-Identifier: MIT
//
// Local terminal queries.
//
// Remote sessions learn their size through negotiation, but when the host
// renders to its own controlling terminal it asks the kernel directly.
#![allow(unsafe_code)]

use crate::geometry::Size;

/// Size of the terminal on stdout via `ioctl(TIOCGWINSZ)`.
///
/// `None` if stdout is not a terminal or reports a zero dimension.
#[cfg(unix)]
#[must_use]
pub fn query_size() -> Option<Size> {
    // SAFETY: winsize is plain old data; all-zero is a valid value.
    let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
    // SAFETY: TIOCGWINSZ writes at most one winsize into the pointer we own.
    let result = unsafe { libc::ioctl(libc::STDOUT_FILENO, libc::TIOCGWINSZ, &mut ws) };

    if result == 0 {
        Size::from_cells(ws.ws_col, ws.ws_row).ok()
    } else {
        None
    }
}

#[cfg(not(unix))]
#[must_use]
pub fn query_size() -> Option<Size> {
    None
}

/// Whether stdout is a terminal.
#[cfg(unix)]
#[must_use]
pub fn is_tty() -> bool {
    // SAFETY: isatty only inspects the descriptor.
    unsafe { libc::isatty(libc::STDOUT_FILENO) != 0 }
}

#[cfg(not(unix))]
#[must_use]
pub fn is_tty() -> bool {
    false
}
