/*!
 * SigilVM Runtime Core
 * Registry tree, node lifecycle and the virtual machine state machine
 */

pub mod console;
pub mod core;
pub mod monitoring;
pub mod registry;
pub mod tree;
pub mod vm;

// Re-exports
pub use crate::core::errors::{Status, VmError};
pub use crate::core::types::{NodeDescriptor, NodeId, VmResult};
pub use monitoring::init_tracing;
pub use registry::{PlatformData, RegistryTree, RootData, RuntimeData};
pub use tree::{Payload, Subsystem, Tree, TreeDump};
pub use vm::{load_extensions, Extension, VirtualMachine, VmArgs, VmConfig, VmState};
