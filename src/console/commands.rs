/*!
 * Console Commands
 */

use crate::core::errors::VmError;
use std::str::FromStr;

pub const HELP: &str = "\
commands:
  exit              request shutdown and leave the console
  treeinfo [json]   dump the registry tree
  cookie            regenerate the session cookie
  debug on|off      toggle debug mode
  state             show the lifecycle state
  help              show this list";

/// A parsed console line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Exit,
    TreeInfo { json: bool },
    Cookie,
    Debug(bool),
    State,
    Help,
}

impl FromStr for Command {
    type Err = VmError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let name = words.next().ok_or(VmError::ArgNull("command"))?;
        let arg = words.next();

        if words.next().is_some() {
            return Err(VmError::ArgInvalid(format!("too many arguments to {}", name)));
        }

        match (name, arg) {
            ("exit", None) => Ok(Command::Exit),
            ("treeinfo", None) => Ok(Command::TreeInfo { json: false }),
            ("treeinfo", Some("json")) => Ok(Command::TreeInfo { json: true }),
            ("cookie", None) => Ok(Command::Cookie),
            ("debug", Some("on")) => Ok(Command::Debug(true)),
            ("debug", Some("off")) => Ok(Command::Debug(false)),
            ("state", None) => Ok(Command::State),
            ("help", None) => Ok(Command::Help),
            ("exit" | "treeinfo" | "cookie" | "debug" | "state" | "help", _) => {
                Err(VmError::ArgInvalid(format!("bad argument to {}", name)))
            }
            _ => Err(VmError::NotSupported(format!("unknown command: {}", name))),
        }
    }
}
