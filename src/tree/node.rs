/*!
 * Tree Node
 */

use super::payload::Payload;
use crate::core::types::NodeId;

/// A single element of the registry tree
#[derive(Debug)]
pub struct Node {
    pub(super) name: Option<String>,
    pub(super) depth: u32,
    pub(super) refcount: u32,
    pub(super) parent: Option<NodeId>,
    pub(super) children: Vec<NodeId>,
    pub(super) payload: Option<Payload>,
    pub(super) deinitialized: bool,
}

impl Node {
    pub(super) fn new(name: Option<String>, depth: u32, parent: Option<NodeId>) -> Self {
        Self {
            name,
            depth,
            refcount: 0,
            parent,
            children: Vec::new(),
            payload: None,
            deinitialized: false,
        }
    }

    /// Node name, `None` for nodes created with `spawn_child`
    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Distance from the root (root = 0)
    #[inline]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    #[inline]
    pub fn refcount(&self) -> u32 {
        self.refcount
    }

    /// Owning parent, `None` only for the root
    #[inline]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in insertion order
    #[inline]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    #[inline]
    pub fn payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }

    /// True once `deinit` has run on this node
    #[inline]
    pub fn is_deinitialized(&self) -> bool {
        self.deinitialized
    }

    pub(super) fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed>")
    }
}
