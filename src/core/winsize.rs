//! Terminal window size

use std::fmt;
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub width: u16,
    pub height: u16,
}

impl Window {
    pub fn current() -> io::Result<Self> {
        let (width, height) = crossterm::terminal::size()?;
        Ok(Self { width, height })
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}
