/*!
 * Node Payloads
 *
 * Tagged per-node resources. Built-in variants carry the bookkeeping of the
 * three fixed registry nodes; subsystems attach their own state through the
 * [`Subsystem`] trait and get a cleanup hook at teardown.
 */

use crate::registry::{PlatformData, RootData, RuntimeData};
use std::fmt;
use tracing::debug;

/// State a subsystem attaches to its registry node
///
/// `cleanup` runs at most once, during teardown, and only when no external
/// reference to the node is outstanding. When a single subtree is shut down
/// it runs with the registry locked, so it must not call back into the
/// [`VirtualMachine`](crate::vm::VirtualMachine).
pub trait Subsystem: Send + 'static {
    /// Short type tag shown in tree dumps
    fn kind(&self) -> &str;

    fn cleanup(&mut self) {}
}

/// Resource attached to a node
pub enum Payload {
    Root(RootData),
    Runtime(RuntimeData),
    Platform(PlatformData),
    Subsystem(Box<dyn Subsystem>),
}

impl Payload {
    /// Wrap subsystem state
    pub fn subsystem<S: Subsystem>(state: S) -> Self {
        Payload::Subsystem(Box::new(state))
    }

    pub fn kind(&self) -> &str {
        match self {
            Payload::Root(_) => "root",
            Payload::Runtime(_) => "runtime",
            Payload::Platform(_) => "platform",
            Payload::Subsystem(state) => state.kind(),
        }
    }

    /// Address of the payload data, for diagnostics only
    pub fn address(&self) -> usize {
        match self {
            Payload::Root(data) => data as *const RootData as usize,
            Payload::Runtime(data) => data as *const RuntimeData as usize,
            Payload::Platform(data) => data as *const PlatformData as usize,
            Payload::Subsystem(state) => &**state as *const dyn Subsystem as *const () as usize,
        }
    }

    pub fn as_root(&self) -> Option<&RootData> {
        match self {
            Payload::Root(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_root_mut(&mut self) -> Option<&mut RootData> {
        match self {
            Payload::Root(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_runtime(&self) -> Option<&RuntimeData> {
        match self {
            Payload::Runtime(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_runtime_mut(&mut self) -> Option<&mut RuntimeData> {
        match self {
            Payload::Runtime(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_platform(&self) -> Option<&PlatformData> {
        match self {
            Payload::Platform(data) => Some(data),
            _ => None,
        }
    }

    /// Run the cleanup hook, consuming the payload
    pub(super) fn cleanup(self) {
        match self {
            Payload::Subsystem(mut state) => {
                debug!(kind = state.kind(), "subsystem cleanup");
                state.cleanup();
            }
            builtin => debug!(kind = builtin.kind(), "released built-in payload"),
        }
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Payload")
            .field("kind", &self.kind())
            .field("address", &format_args!("{:#x}", self.address()))
            .finish()
    }
}
