/*!
 * Extensions
 * Subsystem initializers loaded against a running registry
 */

use super::manager::VirtualMachine;
use crate::core::errors::VmError;
use crate::core::types::{NodeId, VmResult};
use tracing::{info, instrument, warn};

/// A subsystem initializer
///
/// Implementations register their node under `runtime` or `platform` and
/// attach a payload. `root` is the handle of `vmroot`; validate it with
/// [`VirtualMachine::validate_root`] before use.
pub trait Extension: Send + Sync {
    fn name(&self) -> &str;

    fn initialize(&self, vm: &VirtualMachine, root: NodeId) -> VmResult<()>;
}

/// Run every extension in order
///
/// An extension reporting `AlreadyExists` was loaded before and is skipped.
/// Any other failure stops loading and is returned. Returns the number of
/// extensions that initialized.
#[instrument(skip(vm, extensions), fields(session = %vm.session_id(), count = extensions.len()))]
pub fn load_extensions(vm: &VirtualMachine, extensions: &[&dyn Extension]) -> VmResult<usize> {
    let root = vm.root()?;
    vm.validate_root(Some(root))?;

    let mut loaded = 0;
    for extension in extensions {
        match extension.initialize(vm, root) {
            Ok(()) => {
                info!(extension = extension.name(), "extension loaded");
                loaded += 1;
            }
            Err(VmError::AlreadyExists(what)) => {
                warn!(extension = extension.name(), existing = %what, "extension already loaded");
            }
            Err(e) => {
                warn!(extension = extension.name(), error = %e, "extension failed to load");
                return Err(e);
            }
        }
    }

    Ok(loaded)
}
