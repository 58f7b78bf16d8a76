/*!
 * Lifecycle State
 */

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a [`VirtualMachine`](super::VirtualMachine)
///
/// ```text
/// Uninitialized -> Initialized -> Active -> ShutdownRequested -> ShuttingDown -> Shutdown
///                       \__________\______________________________/
///                                 deinitialize()
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VmState {
    /// No registry tree has ever been built
    Uninitialized,
    /// Registry tree built, no shutdown handler waiting yet
    Initialized,
    /// Registry tree built and exactly one shutdown handler waiting
    Active,
    /// Shutdown requested; the waiting handler is about to tear down
    ShutdownRequested,
    /// Workers are being joined and the tree torn down
    ShuttingDown,
    /// Torn down; `initialize` may build a fresh tree
    Shutdown,
}

impl VmState {
    /// Whether subsystems may treat the machine as running
    #[inline]
    pub fn is_running(self) -> bool {
        matches!(self, VmState::Active | VmState::ShutdownRequested)
    }

    /// Whether `initialize` has completed and teardown has not started
    #[inline]
    pub fn is_initialized(self) -> bool {
        matches!(
            self,
            VmState::Initialized | VmState::Active | VmState::ShutdownRequested
        )
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            VmState::Uninitialized => "uninitialized",
            VmState::Initialized => "initialized",
            VmState::Active => "active",
            VmState::ShutdownRequested => "shutdown-requested",
            VmState::ShuttingDown => "shutting-down",
            VmState::Shutdown => "shutdown",
        }
    }
}

impl fmt::Display for VmState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
