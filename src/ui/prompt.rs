//! One prompt cycle: raw mode, cursor query, marker, prompt, line.

use std::io::Write;

use crossterm::queue;
use crossterm::style::{Attribute, Print, SetAttribute};
use tracing::debug;

use crate::core::error::{PromptError, Result};
use crate::core::input::RuneSource;
use crate::core::position::query_cursor_position;
use crate::core::raw::{ModeDriver, RawModeSession, ReadTimeout};
use crate::ui::editor;

/// Default prompt glyph
pub const PROMPT_GLYPH: &str = "Σ ";

/// Prompt settings
#[derive(Debug, Clone)]
pub struct Prompt {
    glyph: String,
    read_timeout: ReadTimeout,
}

impl Default for Prompt {
    fn default() -> Self {
        Self::new(PROMPT_GLYPH, ReadTimeout::default())
    }
}

impl Prompt {
    pub fn new(glyph: impl Into<String>, read_timeout: ReadTimeout) -> Self {
        Self {
            glyph: glyph.into(),
            read_timeout,
        }
    }

    /// Run one prompt cycle and return the entered line.
    ///
    /// The terminal mode is restored on every path. A failed restore is
    /// reported as `TerminalRestore` even if the line itself was read.
    pub fn prompt_and_read<D, R, W>(
        &self,
        driver: &mut D,
        input: &mut R,
        out: &mut W,
    ) -> Result<String>
    where
        D: ModeDriver,
        R: RuneSource,
        W: Write,
    {
        let session = RawModeSession::enter(driver, self.read_timeout)?;
        let result = self.cycle(input, out);
        session.restore()?;
        result
    }

    fn cycle<R: RuneSource, W: Write>(&self, input: &mut R, out: &mut W) -> Result<String> {
        let position = query_cursor_position(input, out)?;

        if !position.is_leftmost() {
            debug!("Previous output ended at column {}", position.column());
            queue!(
                out,
                SetAttribute(Attribute::Reverse),
                Print('%'),
                SetAttribute(Attribute::Reset),
                Print("\r\n")
            )
            .map_err(PromptError::Output)?;
        }

        out.write_all(self.glyph.as_bytes())
            .and_then(|_| out.flush())
            .map_err(PromptError::Output)?;

        editor::read_line(input, out)
    }
}
