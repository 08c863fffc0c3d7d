//! Single-line editor
//!
//! Turns a rune stream into one line of input, echoing as it goes. Each rune
//! is classified into a `Key` first; the editor is a state transition over
//! that classification.
//!
//! Escape sequences (arrow keys, function keys, a late cursor report) are
//! consumed whole before classification, so their tails never reach the line.

use std::io::{self, Write};

use tracing::{debug, trace};

use crate::core::error::{PromptError, Result};
use crate::core::input::{RuneEvent, RuneSource};

/// Ctrl+H
pub const CTRL_H: char = '\x08';
/// What most terminals send for the Backspace key
pub const DEL: char = '\x7f';

/// Cursor left one column, then erase to end of line
const ERASE_BACK: &[u8] = b"\x1b[1D\x1b[0K";
/// Echo for the return key
const NEWLINE: &[u8] = b"\r\n";

/// Editor-level meaning of a rune
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// Carriage return: finish the line
    Submit,
    /// Remove the last rune
    Erase,
    /// Control character with no binding yet
    Reserved(char),
    /// Echoed and appended
    Printable(char),
}

impl Key {
    pub fn classify(ch: char) -> Self {
        match ch {
            '\r' => Key::Submit,
            CTRL_H | DEL => Key::Erase,
            '\x00'..='\x1f' => Key::Reserved(ch),
            _ => Key::Printable(ch),
        }
    }
}

/// The line being edited
#[derive(Debug, Default)]
pub struct LineBuffer {
    runes: Vec<char>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self {
            runes: Vec::with_capacity(8),
        }
    }

    pub fn push(&mut self, ch: char) {
        self.runes.push(ch);
    }

    pub fn pop(&mut self) -> Option<char> {
        self.runes.pop()
    }

    pub fn len(&self) -> usize {
        self.runes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runes.is_empty()
    }

    pub fn into_string(self) -> String {
        self.runes.into_iter().collect()
    }
}

/// Whether the editor wants more keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Done,
}

/// Position inside an escape sequence
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Escape {
    #[default]
    Ground,
    /// After ESC
    Start,
    /// After `ESC [`, until a final byte in `@..=~`
    Csi,
    /// After `ESC O`, one more rune
    Ss3,
}

#[derive(Debug, Default)]
pub struct LineEditor {
    buffer: LineBuffer,
    escape: Escape,
}

impl LineEditor {
    pub fn new() -> Self {
        Self {
            buffer: LineBuffer::new(),
            escape: Escape::Ground,
        }
    }

    /// Consume `ch` if it belongs to an escape sequence.
    fn swallow(&mut self, ch: char) -> bool {
        self.escape = match (self.escape, ch) {
            (Escape::Ground, '\x1b') => Escape::Start,
            (Escape::Ground, _) => return false,
            (Escape::Start, '[') => Escape::Csi,
            (Escape::Start, 'O') => Escape::Ss3,
            (Escape::Csi, '\x40'..='\x7e') | (Escape::Start, _) | (Escape::Ss3, _) => {
                Escape::Ground
            }
            (Escape::Csi, _) => Escape::Csi,
        };
        if self.escape == Escape::Ground {
            trace!("Dropped escape sequence ending in {:?}", ch);
        }
        true
    }

    /// Apply one key, writing its echo to `out`.
    pub fn handle<W: Write + ?Sized>(&mut self, key: Key, out: &mut W) -> io::Result<Flow> {
        match key {
            Key::Submit => {
                out.write_all(NEWLINE)?;
                return Ok(Flow::Done);
            }
            Key::Erase => {
                if !self.buffer.is_empty() {
                    out.write_all(ERASE_BACK)?;
                    self.buffer.pop();
                }
            }
            Key::Reserved(ch) => {
                trace!("Ignoring control character {:#04x}", ch as u32);
            }
            Key::Printable(ch) => {
                let mut utf8 = [0u8; 4];
                out.write_all(ch.encode_utf8(&mut utf8).as_bytes())?;
                self.buffer.push(ch);
            }
        }
        Ok(Flow::Continue)
    }

    /// Collect runes until return is pressed.
    ///
    /// A read timeout is not an event, except that it ends a lone ESC. Any
    /// failure discards the partial line.
    pub fn read_line<R, W>(mut self, input: &mut R, out: &mut W) -> Result<String>
    where
        R: RuneSource + ?Sized,
        W: Write + ?Sized,
    {
        loop {
            let ch = match input.read_rune().map_err(PromptError::StreamRead)? {
                RuneEvent::Rune(ch) => ch,
                RuneEvent::TimedOut => {
                    self.escape = Escape::Ground;
                    continue;
                }
                RuneEvent::Closed => return Err(PromptError::EndOfStream),
            };
            if self.swallow(ch) {
                continue;
            }

            let flow = self
                .handle(Key::classify(ch), out)
                .and_then(|flow| out.flush().map(|_| flow))
                .map_err(PromptError::Output)?;
            if flow == Flow::Done {
                debug!("Line complete ({} runes)", self.buffer.len());
                return Ok(self.buffer.into_string());
            }
        }
    }
}

/// Read one line with a fresh editor.
pub fn read_line<R, W>(input: &mut R, out: &mut W) -> Result<String>
where
    R: RuneSource + ?Sized,
    W: Write + ?Sized,
{
    LineEditor::new().read_line(input, out)
}
