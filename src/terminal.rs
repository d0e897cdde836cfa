//! Terminal seam: raw-mode ownership, size queries, and screen control.

use std::io::{self, Write};

/// ANSI sequences for session screen management.
pub mod screen {
    pub const ALT_SCREEN_ENTER: &str = "\x1b[?1049h";
    pub const ALT_SCREEN_EXIT: &str = "\x1b[?1049l";
    pub const CURSOR_HIDE: &str = "\x1b[?25l";
    pub const CURSOR_SHOW: &str = "\x1b[?25h";
    pub const CLEAR: &str = "\x1b[2J\x1b[H";
    pub const CLEAR_LINE: &str = "\r\x1b[2K";
}

/// Minimal terminal interface for the dashboard session.
///
/// Raw mode is a single system-wide resource: one owner at a time, and
/// `leave_raw` must be idempotent so teardown can run on every exit path
/// without double-restoring.
pub trait SessionTerminal {
    /// Switch the controlling terminal into raw (unbuffered) input mode.
    fn enter_raw(&mut self) -> io::Result<()>;

    /// Restore the pre-raw terminal state. No-op when raw mode is not held.
    fn leave_raw(&mut self) -> io::Result<()>;

    /// Write output to the terminal and flush.
    fn write(&mut self, data: &str);

    /// Terminal dimensions as (columns, rows).
    fn size(&self) -> (u16, u16);
}

/// Process-backed terminal over stdin/stdout.
#[cfg(unix)]
pub struct ProcessTerminal {
    stdin_fd: libc::c_int,
    stdout_fd: libc::c_int,
    original_termios: Option<libc::termios>,
}

#[cfg(unix)]
impl Default for ProcessTerminal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
impl ProcessTerminal {
    pub fn new() -> Self {
        Self {
            stdin_fd: libc::STDIN_FILENO,
            stdout_fd: libc::STDOUT_FILENO,
            original_termios: None,
        }
    }
}

#[cfg(unix)]
impl SessionTerminal for ProcessTerminal {
    fn enter_raw(&mut self) -> io::Result<()> {
        if self.original_termios.is_none() {
            self.original_termios = Some(get_termios(self.stdin_fd)?);
        }
        let mut raw = self
            .original_termios
            .ok_or_else(|| io::Error::other("original termios missing"))?;
        unsafe {
            libc::cfmakeraw(&mut raw);
        }
        // Keep output post-processing so \n still advances lines.
        raw.c_oflag |= libc::OPOST;
        set_termios(self.stdin_fd, &raw)
    }

    fn leave_raw(&mut self) -> io::Result<()> {
        // take() makes repeated release a no-op.
        match self.original_termios.take() {
            Some(original) => set_termios(self.stdin_fd, &original),
            None => Ok(()),
        }
    }

    fn write(&mut self, data: &str) {
        let mut stdout = io::stdout().lock();
        let _ = stdout.write_all(data.as_bytes());
        let _ = stdout.flush();
    }

    fn size(&self) -> (u16, u16) {
        read_winsize(self.stdout_fd).unwrap_or((80, 24))
    }
}

#[cfg(unix)]
impl Drop for ProcessTerminal {
    fn drop(&mut self) {
        let _ = self.leave_raw();
    }
}

#[cfg(unix)]
fn get_termios(fd: libc::c_int) -> io::Result<libc::termios> {
    let mut termios = unsafe { std::mem::zeroed::<libc::termios>() };
    let result = unsafe { libc::tcgetattr(fd, &mut termios) };
    if result != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(termios)
}

#[cfg(unix)]
fn set_termios(fd: libc::c_int, termios: &libc::termios) -> io::Result<()> {
    let result = unsafe { libc::tcsetattr(fd, libc::TCSANOW, termios) };
    if result != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(unix)]
fn read_winsize(fd: libc::c_int) -> Option<(u16, u16)> {
    let mut size = libc::winsize {
        ws_row: 0,
        ws_col: 0,
        ws_xpixel: 0,
        ws_ypixel: 0,
    };
    let result = unsafe { libc::ioctl(fd, libc::TIOCGWINSZ, &mut size) };
    if result == 0 && size.ws_col > 0 && size.ws_row > 0 {
        Some((size.ws_col, size.ws_row))
    } else {
        None
    }
}
