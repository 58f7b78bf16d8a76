/*!
 * Virtual Machine Configuration
 * Builder-time settings, environment overrides and launch argument parsing
 */

use super::manager::VirtualMachine;
use crate::core::limits::{ENV_DEBUG, ENV_MAX_THREADS, MAX_LOOKUP_DEPTH, MAX_TRACKED_THREADS};
use std::collections::BTreeMap;
use tracing::warn;

/// Settings fixed for the lifetime of a [`VirtualMachine`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmConfig {
    /// Initial debug mode; `--debug` or `set_debug_mode` can turn it on later
    pub debug_mode: bool,
    /// Maximum number of worker threads tracked at once
    pub max_threads: usize,
    /// Lookup depth for duplicate-name checks, capped at [`MAX_LOOKUP_DEPTH`]
    pub lookup_depth: u32,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            debug_mode: false,
            max_threads: MAX_TRACKED_THREADS,
            lookup_depth: MAX_LOOKUP_DEPTH,
        }
    }
}

impl VmConfig {
    /// Defaults overridden by `SIGIL_DEBUG` and `SIGIL_MAX_THREADS`
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(value) = std::env::var(ENV_DEBUG) {
            config.debug_mode = value == "1" || value.eq_ignore_ascii_case("true");
        }

        if let Ok(value) = std::env::var(ENV_MAX_THREADS) {
            match value.parse::<usize>() {
                Ok(n) if n > 0 => config.max_threads = n,
                _ => warn!(value = %value, "ignoring invalid {}", ENV_MAX_THREADS),
            }
        }

        config
    }
}

/// Builder for [`VirtualMachine`]
#[derive(Debug, Clone, Default)]
pub struct VirtualMachineBuilder {
    config: VmConfig,
}

impl VirtualMachineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration
    pub fn with_config(mut self, config: VmConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_debug(mut self, debug_mode: bool) -> Self {
        self.config.debug_mode = debug_mode;
        self
    }

    pub fn with_max_threads(mut self, max_threads: usize) -> Self {
        self.config.max_threads = max_threads.max(1);
        self
    }

    pub fn with_lookup_depth(mut self, depth: u32) -> Self {
        self.config.lookup_depth = depth.min(MAX_LOOKUP_DEPTH);
        self
    }

    pub fn build(self) -> VirtualMachine {
        VirtualMachine::with_config(self.config)
    }
}

/// Launch arguments handed to `initialize`
///
/// Parameters follow the `-tag=value` form and land in the root's init
/// parameters; `--debug` turns on debug mode; remaining free-standing words
/// form the launch command. Other `--flags` belong to the shell and are
/// ignored here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VmArgs {
    pub debug: bool,
    pub init_params: BTreeMap<String, String>,
    pub launch_command: Vec<String>,
}

impl VmArgs {
    pub fn parse<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut parsed = Self::default();

        for arg in args {
            let arg = arg.as_ref();

            if arg == "--debug" {
                parsed.debug = true;
            } else if arg.starts_with("--") {
                continue;
            } else if let Some(param) = arg.strip_prefix('-') {
                match param.split_once('=') {
                    Some((tag, value)) if !tag.is_empty() => {
                        parsed.init_params.insert(tag.to_owned(), value.to_owned());
                    }
                    _ => warn!(arg = arg, "ignoring malformed launch parameter"),
                }
            } else if !arg.is_empty() {
                parsed.launch_command.push(arg.to_owned());
            }
        }

        parsed
    }
}
