/*!
 * Core Types
 * Common types used across the runtime core
 */

use serde::{Deserialize, Serialize};
use std::fmt;

/// Common result type for runtime core operations
pub type VmResult<T> = Result<T, super::errors::VmError>;

/// Handle to a node inside a [`Tree`](crate::tree::Tree)
///
/// Handles are generational and carry the id of the tree that issued them:
/// once a node is freed, or its tree torn down, any handle to it stops
/// resolving even if the slot is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId {
    pub(crate) tree: u32,
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl NodeId {
    #[inline]
    pub(crate) const fn new(tree: u32, index: u32, generation: u32) -> Self {
        Self {
            tree,
            index,
            generation,
        }
    }

    /// Slot index inside the arena
    #[inline]
    pub fn index(self) -> u32 {
        self.index
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}t{}", self.index, self.generation, self.tree)
    }
}

/// Name descriptor passed by subsystems when registering a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDescriptor {
    pub name: String,
}

impl NodeDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl From<&str> for NodeDescriptor {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for NodeDescriptor {
    fn from(name: String) -> Self {
        Self { name }
    }
}
