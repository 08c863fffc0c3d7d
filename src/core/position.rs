//! Cursor position report (DSR 6)
//!
//! The request `ESC [ 6 n` makes the terminal answer in-band with
//! `ESC [ <line> ; <column> R`.

use std::fmt;
use std::io::Write;

use tracing::debug;

use super::error::{PromptError, Result};
use super::input::{RuneEvent, RuneSource};

/// Device status report: cursor position
pub const REQUEST: &[u8] = b"\x1b[6n";

/// 1-based cursor position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorPosition {
    line: u16,
    column: u16,
}

impl CursorPosition {
    pub fn new(line: u16, column: u16) -> Self {
        Self { line, column }
    }

    #[allow(dead_code)]
    pub fn line(&self) -> u16 {
        self.line
    }

    pub fn column(&self) -> u16 {
        self.column
    }

    /// Cursor is at the start of a line
    pub fn is_leftmost(&self) -> bool {
        self.column == 1
    }
}

impl fmt::Display for CursorPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.line, self.column)
    }
}

/// Ask the terminal where the cursor is.
///
/// Runes that arrive before the reply's ESC are handed back to `input` once
/// the query is over, so keystrokes typed ahead are not lost.
pub fn query_cursor_position<R, W>(input: &mut R, out: &mut W) -> Result<CursorPosition>
where
    R: RuneSource + ?Sized,
    W: Write + ?Sized,
{
    out.write_all(REQUEST)
        .and_then(|_| out.flush())
        .map_err(PromptError::Output)?;

    let mut skipped = Vec::new();
    let result = read_reply(input, &mut skipped);
    if !skipped.is_empty() {
        debug!("Replaying {} rune(s) typed ahead of the position reply", skipped.len());
        input.unread(&skipped);
    }

    let position = result?;
    debug!("Cursor position: {}", position);
    Ok(position)
}

fn read_reply<R: RuneSource + ?Sized>(
    input: &mut R,
    skipped: &mut Vec<char>,
) -> Result<CursorPosition> {
    loop {
        match next(input)? {
            '\x1b' => break,
            ch => skipped.push(ch),
        }
    }
    // CSI '[' is not checked
    next(input)?;

    let line = read_field(input, ';', "line")?;
    let column = read_field(input, 'R', "column")?;
    Ok(CursorPosition::new(line, column))
}

fn next<R: RuneSource + ?Sized>(input: &mut R) -> Result<char> {
    match input.read_rune().map_err(PromptError::StreamRead)? {
        RuneEvent::Rune(ch) => Ok(ch),
        RuneEvent::TimedOut => Err(PromptError::ReplyTimedOut),
        RuneEvent::Closed => Err(PromptError::EndOfStream),
    }
}

/// Read runes up to `terminator` and parse them as a positive decimal number.
fn read_field<R: RuneSource + ?Sized>(
    input: &mut R,
    terminator: char,
    field: &'static str,
) -> Result<u16> {
    let mut text = String::new();
    loop {
        let ch = next(input)?;
        if ch == terminator {
            break;
        }
        text.push(ch);
    }
    parse_field(&text, field)
}

fn parse_field(text: &str, field: &'static str) -> Result<u16> {
    let malformed = || PromptError::MalformedPositionReply {
        field,
        text: text.to_string(),
    };

    // u16::from_str would accept a leading '+'
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }
    match text.parse::<u16>() {
        Ok(0) | Err(_) => Err(malformed()),
        Ok(n) => Ok(n),
    }
}
