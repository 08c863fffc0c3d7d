//! Line editing and prompting.
//!
//! - **editor**: key classification, line buffer and echo
//! - **prompt**: one full prompt cycle on top of the core terminal plumbing

pub mod editor;
pub mod prompt;

pub use prompt::Prompt;
