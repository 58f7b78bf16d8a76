/*!
 * Virtual Machine Lifecycle
 * Owns the registry tree and worker threads and drives the init/shutdown state machine
 */

mod config;
mod extensions;
mod manager;
mod state;
mod workers;

pub use config::{VirtualMachineBuilder, VmArgs, VmConfig};
pub use extensions::{load_extensions, Extension};
pub use manager::VirtualMachine;
pub use state::VmState;
