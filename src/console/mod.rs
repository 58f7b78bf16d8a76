/*!
 * Debug Console
 *
 * Line-oriented inspection of a running virtual machine. `exit` requests
 * shutdown; the shutdown handler does the actual teardown.
 */

mod commands;

pub use commands::{Command, HELP};

use crate::core::errors::{Status, VmError};
use crate::core::types::VmResult;
use crate::vm::VirtualMachine;
use std::io::{BufRead, Write};
use tracing::debug;

pub const PROMPT: &str = "sigil -> ";

/// Result of one console line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Text to print; the console keeps reading
    Continue(String),
    /// Shutdown was requested; the console stops
    Shutdown,
}

/// Execute one console line
///
/// Blank lines produce empty output.
pub fn exec(vm: &VirtualMachine, line: &str) -> VmResult<Outcome> {
    if line.trim().is_empty() {
        return Ok(Outcome::Continue(String::new()));
    }

    let command: Command = line.parse()?;
    debug!(?command, "console command");

    let output = match command {
        Command::Exit => {
            vm.request_shutdown()?;
            return Ok(Outcome::Shutdown);
        }
        Command::TreeInfo { json: false } => vm.dump_tree()?.to_string(),
        Command::TreeInfo { json: true } => serde_json::to_string(&vm.dump_tree()?)
            .map_err(|e| VmError::Failed(format!("tree dump: {}", e)))?,
        Command::Cookie => {
            let (previous, current) = vm.regenerate_cookie()?;
            format!("cookie: {:#010x} -> {:#010x}", previous, current)
        }
        Command::Debug(on) => {
            vm.set_debug_mode(on);
            format!("debug mode {}", if on { "on" } else { "off" })
        }
        Command::State => format!(
            "state: {}, active: {}, workers: {}",
            vm.state(),
            vm.is_active(),
            vm.tracked_threads()
        ),
        Command::Help => HELP.to_owned(),
    };

    Ok(Outcome::Continue(output))
}

/// Read commands from `input` until `exit` or end of input
///
/// Command failures are printed with their status and do not end the loop.
pub fn run<R: BufRead, W: Write>(vm: &VirtualMachine, input: R, mut output: W) -> VmResult<()> {
    let io_err = |e: std::io::Error| VmError::Failed(format!("console io: {}", e));

    write!(output, "{}", PROMPT).map_err(io_err)?;
    output.flush().map_err(io_err)?;

    for line in input.lines() {
        let line = line.map_err(io_err)?;

        match exec(vm, &line) {
            Ok(Outcome::Shutdown) => {
                writeln!(output, "shutting down").map_err(io_err)?;
                return Ok(());
            }
            Ok(Outcome::Continue(text)) if text.is_empty() => {}
            Ok(Outcome::Continue(text)) => {
                writeln!(output, "{}", text.trim_end()).map_err(io_err)?;
            }
            Err(e) => {
                writeln!(output, "error: {} ({})", e, Status::from(&e)).map_err(io_err)?;
            }
        }

        write!(output, "{}", PROMPT).map_err(io_err)?;
        output.flush().map_err(io_err)?;
    }

    Ok(())
}
