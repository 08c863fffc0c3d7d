//! Raw terminal mode
//!
//! A `RawModeSession` captures the terminal attributes, switches the driver to
//! raw mode with a bounded read window, and puts the captured attributes back
//! when it is restored or dropped.

use std::io;
use std::time::Duration;

use tracing::{debug, error};

use super::error::{PromptError, Result};

/// Default raw-mode read window
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(500);

/// How long a single read waits for input before reporting "no data".
///
/// The terminal driver counts in tenths of a second, so the window is rounded
/// up to whole deciseconds and clamped to `1..=255`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadTimeout(Duration);

impl ReadTimeout {
    pub fn from_millis(ms: u64) -> Self {
        Self(Duration::from_millis(ms))
    }

    /// Value for the VTIME control character
    pub fn deciseconds(&self) -> u8 {
        let ms = self.0.as_millis();
        let ds = (ms + 99) / 100;
        ds.clamp(1, u8::MAX as u128) as u8
    }

    /// The window the driver actually applies
    pub fn window(&self) -> Duration {
        Duration::from_millis(u64::from(self.deciseconds()) * 100)
    }
}

impl Default for ReadTimeout {
    fn default() -> Self {
        Self(DEFAULT_READ_TIMEOUT)
    }
}

/// Access to the live terminal driver mode.
pub trait ModeDriver {
    /// Snapshot of terminal attributes
    type State: Clone;

    /// Read the current attributes.
    fn current(&self) -> io::Result<Self::State>;

    /// Apply attributes immediately.
    fn apply(&mut self, state: &Self::State) -> io::Result<()>;

    /// Derive raw-mode attributes from `state`: no canonical processing, no
    /// echo, no signal characters, reads return after `timeout` with no data.
    fn raw_from(&self, state: &Self::State, timeout: ReadTimeout) -> Self::State;
}

/// An active raw-mode session.
///
/// Holding the session borrows the driver exclusively, so only one session can
/// be outstanding at a time.
pub struct RawModeSession<'d, D: ModeDriver> {
    driver: &'d mut D,
    saved: Option<D::State>,
}

impl<'d, D: ModeDriver> RawModeSession<'d, D> {
    /// Capture the current attributes and switch to raw mode.
    ///
    /// If applying the raw attributes fails nothing is owed: the driver is
    /// still in its previous mode.
    pub fn enter(driver: &'d mut D, timeout: ReadTimeout) -> Result<Self> {
        let saved = driver.current().map_err(PromptError::TerminalQuery)?;
        let raw = driver.raw_from(&saved, timeout);
        driver.apply(&raw).map_err(PromptError::TerminalConfigure)?;
        debug!("Entered raw mode (read window {} ds)", timeout.deciseconds());

        Ok(Self {
            driver,
            saved: Some(saved),
        })
    }

    /// Put the captured attributes back.
    pub fn restore(mut self) -> Result<()> {
        match self.saved.take() {
            Some(saved) => {
                self.driver
                    .apply(&saved)
                    .map_err(PromptError::TerminalRestore)?;
                debug!("Restored terminal mode");
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl<D: ModeDriver> Drop for RawModeSession<'_, D> {
    fn drop(&mut self) {
        // Early return or unwinding: restore here.
        if let Some(saved) = self.saved.take() {
            if let Err(e) = self.driver.apply(&saved) {
                error!("Failed to restore terminal mode: {}", e);
            }
        }
    }
}

/// termios driver for a file descriptor
#[cfg(unix)]
pub struct Termios {
    fd: std::os::unix::io::RawFd,
}

#[cfg(unix)]
impl Termios {
    pub fn stdin() -> Self {
        Self {
            fd: libc::STDIN_FILENO,
        }
    }
}

#[cfg(unix)]
impl ModeDriver for Termios {
    type State = libc::termios;

    fn current(&self) -> io::Result<libc::termios> {
        unsafe {
            let mut state: libc::termios = std::mem::zeroed();
            if libc::tcgetattr(self.fd, &mut state) != 0 {
                return Err(io::Error::last_os_error());
            }
            Ok(state)
        }
    }

    fn apply(&mut self, state: &libc::termios) -> io::Result<()> {
        unsafe {
            if libc::tcsetattr(self.fd, libc::TCSANOW, state) != 0 {
                return Err(io::Error::last_os_error());
            }
        }
        Ok(())
    }

    fn raw_from(&self, state: &libc::termios, timeout: ReadTimeout) -> libc::termios {
        let mut raw = *state;
        unsafe {
            libc::cfmakeraw(&mut raw);
        }
        raw.c_cc[libc::VMIN] = 0;
        raw.c_cc[libc::VTIME] = timeout.deciseconds();
        raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeDriver, FakeMode};

    #[test]
    fn test_read_timeout_deciseconds() {
        assert_eq!(ReadTimeout::default().deciseconds(), 5);
        assert_eq!(ReadTimeout::from_millis(100).deciseconds(), 1);
        assert_eq!(ReadTimeout::from_millis(150).deciseconds(), 2);
        // Zero would turn reads into a busy poll
        assert_eq!(ReadTimeout::from_millis(0).deciseconds(), 1);
        assert_eq!(ReadTimeout::from_millis(60_000).deciseconds(), 255);
    }

    #[test]
    fn test_read_timeout_window() {
        assert_eq!(ReadTimeout::default().window(), Duration::from_millis(500));
        assert_eq!(ReadTimeout::from_millis(150).window(), Duration::from_millis(200));
        assert_eq!(ReadTimeout::from_millis(0).window(), Duration::from_millis(100));
    }

    #[cfg(unix)]
    #[test]
    fn test_termios_raw_from() {
        let mut cooked: libc::termios = unsafe { std::mem::zeroed() };
        cooked.c_lflag = libc::ICANON | libc::ECHO | libc::ISIG;
        cooked.c_cc[libc::VMIN] = 1;
        cooked.c_cc[libc::VTIME] = 0;

        let raw = Termios::stdin().raw_from(&cooked, ReadTimeout::default());

        assert_eq!(raw.c_lflag & libc::ICANON, 0);
        assert_eq!(raw.c_lflag & libc::ECHO, 0);
        assert_eq!(raw.c_lflag & libc::ISIG, 0);
        assert_eq!(raw.c_cc[libc::VMIN], 0);
        assert_eq!(raw.c_cc[libc::VTIME], 5);
        // The saved copy is left alone
        assert_ne!(cooked.c_lflag & libc::ICANON, 0);
    }

    #[test]
    fn test_enter_applies_raw_attributes() {
        let mut driver = FakeDriver::new();
        let session = RawModeSession::enter(&mut driver, ReadTimeout::default()).unwrap();
        drop(session);

        let raw = driver.applied[0];
        assert!(!raw.canonical);
        assert!(!raw.echo);
        assert!(!raw.signals);
        assert_eq!(raw.vmin, 0);
        assert_eq!(raw.vtime, 5);
    }

    #[test]
    fn test_enter_then_restore_is_identity() {
        let mut driver = FakeDriver::new();
        let before = driver.state;

        let session = RawModeSession::enter(&mut driver, ReadTimeout::default()).unwrap();
        session.restore().unwrap();

        assert_eq!(driver.state, before);
        assert_eq!(driver.applied.len(), 2);
    }

    #[test]
    fn test_drop_restores() {
        let mut driver = FakeDriver::new();
        let before = driver.state;

        {
            let _session = RawModeSession::enter(&mut driver, ReadTimeout::default()).unwrap();
        }

        assert_eq!(driver.state, before);
    }

    #[test]
    fn test_query_failure_enters_nothing() {
        let mut driver = FakeDriver::new();
        driver.fail_current = true;

        let err = RawModeSession::enter(&mut driver, ReadTimeout::default())
            .err()
            .unwrap();
        assert!(matches!(err, PromptError::TerminalQuery(_)));
        assert!(driver.applied.is_empty());
    }

    #[test]
    fn test_configure_failure_owes_no_restore() {
        let mut driver = FakeDriver::new();
        driver.fail_apply_at = Some(0);

        let err = RawModeSession::enter(&mut driver, ReadTimeout::default())
            .err()
            .unwrap();
        assert!(matches!(err, PromptError::TerminalConfigure(_)));
        assert_eq!(driver.state, FakeMode::cooked());
        assert_eq!(driver.apply_calls, 1);
    }

    #[test]
    fn test_restore_failure_is_fatal() {
        let mut driver = FakeDriver::new();
        driver.fail_apply_at = Some(1);

        let session = RawModeSession::enter(&mut driver, ReadTimeout::default()).unwrap();
        let err = session.restore().unwrap_err();
        assert!(err.is_fatal());
        // The failed restore is not retried on drop
        assert_eq!(driver.apply_calls, 2);
    }
}
