/*!
 * Registry Node Data
 * Built-in payloads of the three fixed registry nodes
 */

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Data attached to `vmroot`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootData {
    /// `-tag=value` launch parameters
    pub init_params: BTreeMap<String, String>,
    /// Free-standing launch arguments
    pub launch_command: Vec<String>,
    /// Session cookie, regenerated on request from the console
    pub cookie: u32,
    pub global_debug: bool,
}

/// Data attached to `runtime`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeData {
    /// Worker threads currently tracked by the virtual machine
    pub num_workers: u32,
    pub debug_mode: bool,
}

/// Data attached to `platform`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformData {
    pub hw_cores: u32,
    pub hostname: String,
    pub debug_mode: bool,
}

impl PlatformData {
    /// Probe the host for core count and hostname
    pub fn probe(debug_mode: bool) -> Self {
        let mut data = Self {
            debug_mode,
            ..Self::default()
        };
        data.refresh();
        data
    }

    /// Re-read host information
    pub fn refresh(&mut self) {
        self.hw_cores = std::thread::available_parallelism()
            .map(|n| n.get() as u32)
            .unwrap_or(1);
        self.hostname = host_name();
    }
}

#[cfg(unix)]
fn host_name() -> String {
    match nix::unistd::gethostname() {
        Ok(name) => name.to_string_lossy().into_owned(),
        Err(e) => {
            tracing::warn!(error = %e, "could not read hostname");
            String::from("localhost")
        }
    }
}

#[cfg(not(unix))]
fn host_name() -> String {
    std::env::var("COMPUTERNAME").unwrap_or_else(|_| String::from("localhost"))
}
