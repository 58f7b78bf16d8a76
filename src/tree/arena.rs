/*!
 * Node Arena
 * Slot storage with generational handles
 */

use super::node::Node;
use super::payload::Payload;
use crate::core::errors::VmError;
use crate::core::limits::MAX_LOOKUP_DEPTH;
use crate::core::types::{NodeId, VmResult};
use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_TREE_ID: AtomicU32 = AtomicU32::new(1);

struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Index-arena backed node tree
///
/// The tree owns every node. Nodes refer to their parent and children by
/// [`NodeId`], so freeing a node never leaves a dangling pointer behind: a
/// stale handle simply stops resolving.
pub struct Tree {
    id: u32,
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: NodeId,
    live: usize,
    lookup_depth: u32,
}

impl Tree {
    /// Create a tree with a single named root at depth 0
    pub fn new(root_name: &str) -> VmResult<Self> {
        Self::with_lookup_depth(root_name, MAX_LOOKUP_DEPTH)
    }

    /// Create a tree whose name lookups stop at `lookup_depth`
    ///
    /// The depth is capped at [`MAX_LOOKUP_DEPTH`].
    pub fn with_lookup_depth(root_name: &str, lookup_depth: u32) -> VmResult<Self> {
        if root_name.is_empty() {
            return Err(VmError::ArgNull("root name"));
        }

        let id = NEXT_TREE_ID.fetch_add(1, Ordering::Relaxed);
        let mut tree = Self {
            id,
            slots: Vec::new(),
            free: Vec::new(),
            root: NodeId::new(id, 0, 0),
            live: 0,
            lookup_depth: lookup_depth.min(MAX_LOOKUP_DEPTH),
        };
        tree.root = tree.alloc(Node::new(Some(root_name.to_owned()), 0, None));
        Ok(tree)
    }

    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of live nodes, root included
    #[inline]
    pub fn len(&self) -> usize {
        self.live
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Depth used for duplicate-name checks and default lookups
    #[inline]
    pub fn lookup_depth(&self) -> u32 {
        self.lookup_depth
    }

    #[inline]
    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    /// Resolve a handle, `None` if the node was freed
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        if id.tree != self.id {
            return None;
        }
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    /// Resolve a handle or report it as not found
    pub fn get(&self, id: NodeId) -> VmResult<&Node> {
        self.node(id)
            .ok_or_else(|| VmError::NotFound(format!("node {}", id)))
    }

    pub(super) fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        if id.tree != self.id {
            return None;
        }
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    pub(super) fn get_mut(&mut self, id: NodeId) -> VmResult<&mut Node> {
        self.node_mut(id)
            .ok_or_else(|| VmError::NotFound(format!("node {}", id)))
    }

    /// Mutable access to a node's payload
    pub fn payload_mut(&mut self, id: NodeId) -> VmResult<Option<&mut Payload>> {
        Ok(self.get_mut(id)?.payload.as_mut())
    }

    pub(super) fn alloc(&mut self, node: Node) -> NodeId {
        self.live += 1;

        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            return NodeId::new(self.id, index, slot.generation);
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        NodeId::new(self.id, index, 0)
    }

    /// Drop a node's slot; the generation bump invalidates outstanding handles
    pub(super) fn free(&mut self, id: NodeId) -> Option<Node> {
        if id.tree != self.id {
            return None;
        }
        let slot = self
            .slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)?;
        let node = slot.node.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.live -= 1;
        Some(node)
    }

    /// Every live handle in slot order, reachable or not
    pub(super) fn live_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.node
                .as_ref()
                .map(|_| NodeId::new(self.id, index as u32, slot.generation))
        })
    }
}
