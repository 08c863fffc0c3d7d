//! Core terminal plumbing.
//!
//! - **raw**: raw-mode session over the terminal driver (termios on unix)
//! - **input**: rune stream with timeout / end-of-stream signalling
//! - **position**: cursor position request and reply parser
//! - **winsize**: window size query
//! - **error**: errors of a prompt cycle
//!
//! # Architecture
//!
//! ```text
//! Prompt cycle
//! ├── RawModeSession (borrows the ModeDriver exclusively)
//! ├── query_cursor_position (RuneSource + output)
//! └── LineEditor (RuneSource + output)
//! ```

pub mod error;
pub mod input;
pub mod position;
pub mod raw;
pub mod winsize;
