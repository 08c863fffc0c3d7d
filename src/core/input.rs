//! Rune input from the terminal
//!
//! Reads are bounded by the raw-mode read window, so every read ends in one of
//! three ways besides a fatal error: a rune, a timeout with no data, or the
//! end of the stream.

use std::collections::VecDeque;
use std::io::{self, Read};
use std::time::{Duration, Instant};

use tracing::debug;

use super::raw::ReadTimeout;

/// Outcome of a single rune read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuneEvent {
    /// A decoded code point
    Rune(char),
    /// No data arrived within the read window
    TimedOut,
    /// The stream has ended
    Closed,
}

/// Source of runes for the cursor query and the line editor.
pub trait RuneSource {
    /// Read the next rune. `Err` means the stream is unusable.
    fn read_rune(&mut self) -> io::Result<RuneEvent>;

    /// Push runes back so they are returned, in order, before any new input.
    fn unread(&mut self, runes: &[char]);
}

/// What a zero-length read means for the underlying reader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ZeroRead {
    Closed,
    /// Timeout if the read waited at least this long, end of stream otherwise.
    /// A hung-up tty returns zero bytes at once instead of after the window.
    TimedOutAfter(Duration),
}

/// Result of one attempt to read more bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fill {
    Data,
    /// Zero-length read
    Empty,
    /// Non-blocking descriptor had nothing
    Idle,
}

const CHUNK: usize = 64;

/// UTF-8 decoding rune reader over any byte reader
pub struct RuneReader<R> {
    inner: R,
    /// Pushed-back runes
    pending: VecDeque<char>,
    /// Bytes read but not decoded yet
    bytes: Vec<u8>,
    zero_read: ZeroRead,
}

impl<R: Read> RuneReader<R> {
    /// Reader where a zero-length read is end of stream
    #[allow(dead_code)]
    pub fn new(inner: R) -> Self {
        Self::with_zero_read(inner, ZeroRead::Closed)
    }

    /// Reader for a raw-mode terminal: a zero-length read means the read
    /// window elapsed, unless it came back in under `min_wait`.
    pub fn polling(inner: R, min_wait: Duration) -> Self {
        Self::with_zero_read(inner, ZeroRead::TimedOutAfter(min_wait))
    }

    fn with_zero_read(inner: R, zero_read: ZeroRead) -> Self {
        Self {
            inner,
            pending: VecDeque::new(),
            bytes: Vec::with_capacity(CHUNK),
            zero_read,
        }
    }

    /// Read one more chunk.
    fn fill(&mut self) -> io::Result<Fill> {
        let mut chunk = [0u8; CHUNK];
        loop {
            match self.inner.read(&mut chunk) {
                Ok(0) => return Ok(Fill::Empty),
                Ok(n) => {
                    self.bytes.extend_from_slice(&chunk[..n]);
                    return Ok(Fill::Data);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                    ) =>
                {
                    return Ok(Fill::Idle)
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Decode the rune at the front of the byte buffer, if complete.
    fn decode(&mut self) -> Option<char> {
        let lead = *self.bytes.first()?;
        let width = utf8_width(lead);
        if width == 0 {
            self.bytes.remove(0);
            return Some(char::REPLACEMENT_CHARACTER);
        }
        if self.bytes.len() < width {
            return None;
        }

        let ch = match std::str::from_utf8(&self.bytes[..width]) {
            Ok(s) => s.chars().next(),
            Err(_) => None,
        };
        match ch {
            Some(ch) => {
                self.bytes.drain(..width);
                Some(ch)
            }
            None => {
                self.bytes.remove(0);
                Some(char::REPLACEMENT_CHARACTER)
            }
        }
    }
}

impl<R: Read> RuneSource for RuneReader<R> {
    fn read_rune(&mut self) -> io::Result<RuneEvent> {
        if let Some(ch) = self.pending.pop_front() {
            return Ok(RuneEvent::Rune(ch));
        }

        loop {
            if let Some(ch) = self.decode() {
                return Ok(RuneEvent::Rune(ch));
            }
            let started = Instant::now();
            let closed = match self.fill()? {
                Fill::Data => continue,
                Fill::Idle => false,
                Fill::Empty => match self.zero_read {
                    ZeroRead::Closed => true,
                    ZeroRead::TimedOutAfter(min_wait) => {
                        let waited = started.elapsed();
                        if waited < min_wait {
                            debug!("Zero-length read after {:?}, treating as hangup", waited);
                        }
                        waited < min_wait
                    }
                },
            };
            if !closed {
                return Ok(RuneEvent::TimedOut);
            }

            // Truncated sequence at end of stream
            return Ok(if self.bytes.is_empty() {
                RuneEvent::Closed
            } else {
                self.bytes.remove(0);
                RuneEvent::Rune(char::REPLACEMENT_CHARACTER)
            });
        }
    }

    fn unread(&mut self, runes: &[char]) {
        for &ch in runes.iter().rev() {
            self.pending.push_front(ch);
        }
    }
}

/// Terminal input on the process's stdin, read with the given raw-mode
/// window. A zero-length read back in under half the window is a hangup.
pub fn stdin(timeout: ReadTimeout) -> RuneReader<io::Stdin> {
    RuneReader::polling(io::stdin(), timeout.window() / 2)
}

/// Encoded length implied by a UTF-8 lead byte, 0 if it cannot start a rune
fn utf8_width(lead: u8) -> usize {
    match lead {
        0x00..=0x7F => 1,
        0xC2..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF4 => 4,
        _ => 0,
    }
}
