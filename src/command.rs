//! Mapping entered lines to commands and running them.

use std::io;
use std::process::{self, ExitStatus, Stdio};

use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("exit: invalid exit code {0:?}")]
    InvalidExitCode(String),

    #[error("exit: too many arguments")]
    TooManyArguments,

    #[error("{program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program}: {status}")]
    Failed { program: String, status: ExitStatus },
}

/// A parsed line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Nothing to do
    Empty,
    /// Leave the shell with this status
    Exit(i32),
    /// Print recent history
    History,
    /// Run a program
    External { program: String, args: Vec<String> },
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let mut words = line.split_whitespace();
        let program = match words.next() {
            Some(word) => word,
            None => return Ok(Command::Empty),
        };
        let args: Vec<String> = words.map(str::to_string).collect();

        match program {
            "exit" => match args.as_slice() {
                [] => Ok(Command::Exit(0)),
                [code] => code
                    .parse()
                    .map(Command::Exit)
                    .map_err(|_| CommandError::InvalidExitCode(code.clone())),
                _ => Err(CommandError::TooManyArguments),
            },
            "history" if args.is_empty() => Ok(Command::History),
            _ => Ok(Command::External {
                program: program.to_string(),
                args,
            }),
        }
    }
}

/// Run a program on the shell's own terminal and wait for it.
///
/// The terminal must be back in its normal mode before this is called.
pub fn run_external(program: &str, args: &[String]) -> Result<(), CommandError> {
    debug!("Running {} {:?}", program, args);

    let _shield = match InterruptShield::install() {
        Ok(shield) => Some(shield),
        Err(e) => {
            warn!("Failed to shield shell from SIGINT: {}", e);
            None
        }
    };

    let status = process::Command::new(program)
        .args(args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .map_err(|source| CommandError::Spawn {
            program: program.to_string(),
            source,
        })?;

    if status.success() {
        Ok(())
    } else {
        info!("{} exited with {}", program, status);
        Err(CommandError::Failed {
            program: program.to_string(),
            status,
        })
    }
}

/// Keeps SIGINT from terminating the shell while a child runs.
///
/// A no-op handler is installed rather than SIG_IGN so that the child, whose
/// handlers are reset on exec, still receives Ctrl+C. The previous disposition
/// is restored on drop.
#[cfg(unix)]
pub struct InterruptShield {
    previous: libc::sigaction,
}

#[cfg(unix)]
extern "C" fn swallow_interrupt(_: libc::c_int) {}

#[cfg(unix)]
impl InterruptShield {
    pub fn install() -> io::Result<Self> {
        unsafe {
            let mut action: libc::sigaction = std::mem::zeroed();
            let handler: extern "C" fn(libc::c_int) = swallow_interrupt;
            action.sa_sigaction = handler as libc::sighandler_t;
            action.sa_flags = libc::SA_RESTART;
            libc::sigemptyset(&mut action.sa_mask);

            let mut previous: libc::sigaction = std::mem::zeroed();
            if libc::sigaction(libc::SIGINT, &action, &mut previous) != 0 {
                return Err(io::Error::last_os_error());
            }
            Ok(Self { previous })
        }
    }
}

#[cfg(unix)]
impl Drop for InterruptShield {
    fn drop(&mut self) {
        unsafe {
            if libc::sigaction(libc::SIGINT, &self.previous, std::ptr::null_mut()) != 0 {
                warn!("Failed to restore SIGINT handler: {}", io::Error::last_os_error());
            }
        }
    }
}

#[cfg(not(unix))]
pub struct InterruptShield;

#[cfg(not(unix))]
impl InterruptShield {
    pub fn install() -> io::Result<Self> {
        Ok(Self)
    }
}
