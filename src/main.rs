//! sigmash - a minimal interactive shell
//!
//! sigmash reads one line at a time in raw terminal mode, echoing and editing
//! it itself, then runs the line as a program.
//!
//! # Prompt cycle
//!
//! 1. Switch the terminal to raw mode (500 ms read window)
//! 2. Ask the terminal for the cursor position (`ESC [ 6 n`)
//! 3. If the previous output did not end a line, print an inverse `%` marker
//! 4. Print the `Σ ` prompt and collect the line
//! 5. Restore the terminal mode
//!
//! # Editing keys
//!
//! | Key | Action |
//! |-----|--------|
//! | Enter | Run the line |
//! | Backspace / Ctrl+H | Erase the last character |
//!
//! # Builtins
//!
//! - `exit [code]` leaves the shell
//! - `history` lists recent lines

mod command;
mod config;
mod core;
mod history;
mod ui;

#[cfg(test)]
mod test_support;

use std::env;
use std::io;
use std::path::PathBuf;

use anyhow::{bail, Context};
use crossterm::tty::IsTty;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::command::{run_external, Command};
use crate::config::Config;
use crate::core::error::PromptError;
use crate::core::winsize::Window;
use crate::history::CommandHistory;

/// Entries shown by the `history` builtin
const HISTORY_SHOWN: usize = 20;

/// Command line options
#[derive(Default)]
struct Options {
    /// Config file instead of `~/.sigmash/config.toml`
    config_path: Option<PathBuf>,
    /// Do not record entered lines
    no_history: bool,
}

/// Version string from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_version() {
    eprintln!("sigmash {}", VERSION);
}

fn print_help() {
    eprintln!("sigmash {} - a minimal interactive shell", VERSION);
    eprintln!();
    eprintln!("Usage: sigmash [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -c, --config <PATH>   Use this config file");
    eprintln!("      --no-history      Do not record entered lines");
    eprintln!("  -v, --version         Show version");
    eprintln!("  -h, --help            Show this help");
    eprintln!();
    eprintln!("Builtins:");
    eprintln!("  exit [CODE]           Leave the shell");
    eprintln!("  history               List recent lines");
    eprintln!();
    eprintln!("Configuration: ~/.sigmash/config.toml");
    eprintln!("Log file:      ~/.sigmash/sigmash.log");
}

fn parse_args() -> Result<Options, String> {
    let args: Vec<String> = env::args().collect();
    let mut options = Options::default();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-v" | "--version" => {
                print_version();
                std::process::exit(0);
            }
            "-c" | "--config" => {
                i += 1;
                if i >= args.len() {
                    return Err("Missing config path".to_string());
                }
                options.config_path = Some(PathBuf::from(&args[i]));
            }
            "--no-history" => {
                options.no_history = true;
            }
            arg => {
                return Err(format!("Unknown argument: {}. Use -h for help.", arg));
            }
        }
        i += 1;
    }

    Ok(options)
}

/// Send logs to a file; the terminal itself is busy being a prompt.
fn init_logging(config: &Config) {
    let log_path = config.log_path();
    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .ok();

    if let Some(file) = log_file {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&config.log.level))
            .unwrap_or_else(|_| EnvFilter::new("info"));
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}

fn open_history(config: &Config, options: &Options) -> Option<CommandHistory> {
    if options.no_history {
        return None;
    }
    let path = config.history_path()?;
    match CommandHistory::open(&path, config.history.limit) {
        Ok(history) => Some(history),
        Err(e) => {
            warn!("History disabled: {}", e);
            eprintln!("Warning: {}; history disabled", e);
            None
        }
    }
}

fn print_history(history: Option<&CommandHistory>) {
    let Some(history) = history else {
        eprintln!("history: not enabled");
        return;
    };
    let shown = history.recent(HISTORY_SHOWN);
    let first = history.len() - shown.len() + 1;
    for (n, entry) in shown.iter().enumerate() {
        println!("{:5}  {}", first + n, entry.line);
    }
}

/// Prompt, record and run lines until `exit` or end of input.
/// Returns the process exit status.
#[cfg(unix)]
fn run(config: &Config, options: &Options) -> anyhow::Result<i32> {
    use crate::core::raw::Termios;

    let mut driver = Termios::stdin();
    let mut input = crate::core::input::stdin(config.read_timeout());
    let mut stdout = io::stdout();
    let prompt = config.prompt();
    let mut history = open_history(config, options);

    loop {
        let line = match prompt.prompt_and_read(&mut driver, &mut input, &mut stdout) {
            Ok(line) => line,
            Err(PromptError::EndOfStream) => {
                info!("Input closed");
                return Ok(0);
            }
            Err(e) if e.is_fatal() => {
                return Err(e).context("Terminal left in an unknown mode");
            }
            Err(e) => {
                error!("Prompt failed: {}", e);
                eprintln!("error: {}", e);
                continue;
            }
        };

        if let Some(history) = history.as_mut() {
            if let Err(e) = history.add(&line) {
                error!("{}", e);
                eprintln!("error: {}", e);
            }
        }

        match Command::parse(&line) {
            Ok(Command::Empty) => {}
            Ok(Command::Exit(code)) => {
                info!("exit {}", code);
                return Ok(code);
            }
            Ok(Command::History) => print_history(history.as_ref()),
            Ok(Command::External { program, args }) => {
                if let Err(e) = run_external(&program, &args) {
                    eprintln!("error: {}", e);
                }
            }
            Err(e) => eprintln!("error: {}", e),
        }
    }
}

#[cfg(not(unix))]
fn run(_config: &Config, _options: &Options) -> anyhow::Result<i32> {
    bail!("sigmash currently only supports unix terminals (termios)");
}

fn main() -> anyhow::Result<()> {
    let options = match parse_args() {
        Ok(o) => o,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Use --help for usage information");
            std::process::exit(1);
        }
    };

    let config = Config::load(options.config_path.as_deref());
    init_logging(&config);

    info!("sigmash {} starting...", VERSION);

    if !io::stdin().is_tty() {
        bail!("stdin is not a terminal");
    }
    match Window::current() {
        Ok(window) => info!("Terminal size: {}", window),
        Err(e) => warn!("Could not get terminal size: {}", e),
    }

    let code = run(&config, &options)?;
    std::process::exit(code);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_numbering() {
        let dir = tempfile::tempdir().unwrap();
        let mut history = CommandHistory::open(&dir.path().join("history"), 100).unwrap();
        for n in 0..25 {
            history.add(&format!("echo {}", n)).unwrap();
        }

        let shown = history.recent(HISTORY_SHOWN);
        assert_eq!(shown.len(), 20);
        assert_eq!(history.len() - shown.len() + 1, 6);
        assert_eq!(shown[0].line, "echo 5");
    }
}
