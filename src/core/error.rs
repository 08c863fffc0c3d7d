//! Errors raised during a prompt cycle.

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PromptError {
    #[error("Failed to read terminal attributes: {0}")]
    TerminalQuery(#[source] io::Error),

    #[error("Failed to enter raw mode: {0}")]
    TerminalConfigure(#[source] io::Error),

    /// The terminal mode is unknown after this; no further prompt cycle is safe.
    #[error("Failed to restore terminal mode: {0}")]
    TerminalRestore(#[source] io::Error),

    #[error("Failed to read from terminal: {0}")]
    StreamRead(#[source] io::Error),

    #[error("Input stream closed")]
    EndOfStream,

    #[error("Terminal did not answer the cursor position request in time")]
    ReplyTimedOut,

    #[error("Malformed cursor position reply: invalid {field} {text:?}")]
    MalformedPositionReply { field: &'static str, text: String },

    #[error("Failed to write to terminal: {0}")]
    Output(#[source] io::Error),
}

impl PromptError {
    /// Whether the caller must stop issuing prompt cycles.
    pub fn is_fatal(&self) -> bool {
        matches!(self, PromptError::TerminalRestore(_))
    }
}

pub type Result<T> = std::result::Result<T, PromptError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_restore_failure_is_fatal() {
        let other = || io::Error::new(io::ErrorKind::Other, "boom");

        assert!(PromptError::TerminalRestore(other()).is_fatal());
        assert!(!PromptError::TerminalQuery(other()).is_fatal());
        assert!(!PromptError::TerminalConfigure(other()).is_fatal());
        assert!(!PromptError::StreamRead(other()).is_fatal());
        assert!(!PromptError::EndOfStream.is_fatal());
        assert!(!PromptError::ReplyTimedOut.is_fatal());
    }

    #[test]
    fn test_malformed_reply_message() {
        let err = PromptError::MalformedPositionReply {
            field: "column",
            text: "x1".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Malformed cursor position reply: invalid column \"x1\""
        );
    }
}
