/*!
 * Tree Lookup
 * Bounded-depth name search and root resolution
 */

use super::arena::Tree;
use crate::core::limits::MAX_LOOKUP_DEPTH;
use crate::core::types::NodeId;
use tracing::warn;

impl Tree {
    /// Depth-first, pre-order search starting at `start`
    ///
    /// Returns the first node named exactly `name`. Gives up once
    /// `depth_current` exceeds `depth_max` (never searching beyond
    /// [`MAX_LOOKUP_DEPTH`]). Children are visited in insertion order.
    pub fn search(
        &self,
        start: NodeId,
        name: &str,
        depth_current: u32,
        depth_max: u32,
    ) -> Option<NodeId> {
        if name.is_empty() || depth_current > depth_max.min(MAX_LOOKUP_DEPTH) {
            return None;
        }

        let node = self.node(start)?;
        if node.name() == Some(name) {
            return Some(start);
        }

        node.children()
            .iter()
            .find_map(|&child| self.search(child, name, depth_current + 1, depth_max))
    }

    /// Read-only lookup below `start`; reference counts are untouched
    #[inline]
    pub fn peek_subnode(&self, start: NodeId, name: &str, depth_max: u32) -> Option<NodeId> {
        self.search(start, name, 0, depth_max)
    }

    /// Lookup below `start` that acquires a reference on the found node
    ///
    /// Pair every successful call with [`Tree::release`].
    pub fn get_subnode(&mut self, start: NodeId, name: &str, depth_max: u32) -> Option<NodeId> {
        let found = self.peek_subnode(start, name, depth_max)?;
        if let Some(node) = self.node_mut(found) {
            node.refcount = node.refcount.saturating_add(1);
        }
        Some(found)
    }

    /// Walk parent links up to depth 0
    ///
    /// Returns `None` for an orphaned node: a non-root node whose parent is
    /// missing. That only happens after a bookkeeping bug and is logged.
    pub fn get_root(&self, id: NodeId) -> Option<NodeId> {
        let mut current = id;

        loop {
            let node = self.node(current)?;
            if node.depth() == 0 {
                return Some(current);
            }

            match node.parent() {
                Some(parent) if self.contains(parent) => current = parent,
                _ => {
                    warn!(node = node.display_name(), depth = node.depth(), "orphaned node");
                    return None;
                }
            }
        }
    }

    /// Slash separated names from the root down to `id`
    pub fn path(&self, id: NodeId) -> Option<String> {
        let mut names = Vec::new();
        let mut current = Some(id);

        while let Some(node_id) = current {
            let node = self.node(node_id)?;
            names.push(node.display_name());
            current = node.parent();
        }

        names.reverse();
        Some(names.join("/"))
    }

    /// Node ids below and including `start`, pre-order
    pub fn pre_order(&self, start: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![start];

        while let Some(id) = stack.pop() {
            let Some(node) = self.node(id) else {
                continue;
            };
            out.push(id);
            stack.extend(node.children().iter().rev().copied());
        }

        out
    }
}
