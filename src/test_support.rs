//! Test doubles for the terminal driver and input stream.

use std::collections::VecDeque;
use std::io;

use crate::core::input::{RuneEvent, RuneSource};
use crate::core::raw::{ModeDriver, ReadTimeout};

/// Simplified terminal attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FakeMode {
    pub canonical: bool,
    pub echo: bool,
    pub signals: bool,
    pub vmin: u8,
    pub vtime: u8,
}

impl FakeMode {
    pub fn cooked() -> Self {
        Self {
            canonical: true,
            echo: true,
            signals: true,
            vmin: 1,
            vtime: 0,
        }
    }
}

/// In-memory terminal driver that records every applied state
pub struct FakeDriver {
    pub state: FakeMode,
    pub applied: Vec<FakeMode>,
    pub apply_calls: usize,
    pub fail_current: bool,
    /// Fail the apply call with this zero-based index
    pub fail_apply_at: Option<usize>,
}

impl FakeDriver {
    pub fn new() -> Self {
        Self {
            state: FakeMode::cooked(),
            applied: Vec::new(),
            apply_calls: 0,
            fail_current: false,
            fail_apply_at: None,
        }
    }
}

impl ModeDriver for FakeDriver {
    type State = FakeMode;

    fn current(&self) -> io::Result<FakeMode> {
        if self.fail_current {
            return Err(io::Error::new(io::ErrorKind::Other, "not a terminal"));
        }
        Ok(self.state)
    }

    fn apply(&mut self, state: &FakeMode) -> io::Result<()> {
        let call = self.apply_calls;
        self.apply_calls += 1;
        if self.fail_apply_at == Some(call) {
            return Err(io::Error::new(io::ErrorKind::Other, "tcsetattr failed"));
        }
        self.state = *state;
        self.applied.push(*state);
        Ok(())
    }

    fn raw_from(&self, _state: &FakeMode, timeout: ReadTimeout) -> FakeMode {
        FakeMode {
            canonical: false,
            echo: false,
            signals: false,
            vmin: 0,
            vtime: timeout.deciseconds(),
        }
    }
}

/// One scripted outcome of `read_rune`
pub enum Step {
    Event(RuneEvent),
    Fail(io::ErrorKind),
}

/// Rune source that replays a fixed script, then reports `Closed`
pub struct ScriptedInput {
    steps: VecDeque<Step>,
}

impl ScriptedInput {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: steps.into(),
        }
    }

    /// Every char of `text` as a rune event
    pub fn text(text: &str) -> Self {
        Self::new(text.chars().map(|c| Step::Event(RuneEvent::Rune(c))).collect())
    }

    /// Runes not consumed yet, in order
    pub fn remaining(&self) -> String {
        self.steps
            .iter()
            .filter_map(|s| match s {
                Step::Event(RuneEvent::Rune(c)) => Some(*c),
                _ => None,
            })
            .collect()
    }
}

impl RuneSource for ScriptedInput {
    fn read_rune(&mut self) -> io::Result<RuneEvent> {
        match self.steps.pop_front() {
            Some(Step::Event(event)) => Ok(event),
            Some(Step::Fail(kind)) => Err(io::Error::new(kind, "scripted failure")),
            None => Ok(RuneEvent::Closed),
        }
    }

    fn unread(&mut self, runes: &[char]) {
        for &c in runes.iter().rev() {
            self.steps.push_front(Step::Event(RuneEvent::Rune(c)));
        }
    }
}

pub fn rune(c: char) -> Step {
    Step::Event(RuneEvent::Rune(c))
}

pub fn timeout() -> Step {
    Step::Event(RuneEvent::TimedOut)
}

/// Output sink as a lossless string
pub fn output(buf: &[u8]) -> String {
    String::from_utf8(buf.to_vec()).unwrap()
}
