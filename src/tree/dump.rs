/*!
 * Tree Dump
 * Human-readable diagnostics of every node, including orphans
 */

use super::arena::Tree;
use crate::core::types::NodeId;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

/// Snapshot of one node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeInfo {
    pub name: String,
    pub depth: u32,
    pub refcount: u32,
    pub parent: Option<String>,
    pub payload_kind: Option<String>,
    pub payload_addr: usize,
}

/// Pre-order snapshot of a tree
///
/// Not a stable machine-readable format; intended for the console and tests.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TreeDump {
    pub nodes: Vec<NodeInfo>,
    /// Live nodes that cannot be reached from the root
    pub orphans: Vec<NodeInfo>,
}

impl TreeDump {
    pub fn find(&self, name: &str) -> Option<&NodeInfo> {
        self.nodes.iter().find(|info| info.name == name)
    }
}

impl Tree {
    /// Snapshot every node reachable from the root, then any orphans
    pub fn dump(&self) -> TreeDump {
        let reachable = self.pre_order(self.root());
        let seen: HashSet<NodeId> = reachable.iter().copied().collect();

        let nodes = reachable.into_iter().filter_map(|id| self.info(id)).collect();
        let orphans = self
            .live_ids()
            .filter(|id| !seen.contains(id))
            .filter_map(|id| self.info(id))
            .collect();

        TreeDump { nodes, orphans }
    }

    fn info(&self, id: NodeId) -> Option<NodeInfo> {
        let node = self.node(id)?;
        let parent = node
            .parent()
            .map(|p| self.node(p).map_or("<missing>", |n| n.display_name()).to_owned());

        Some(NodeInfo {
            name: node.display_name().to_owned(),
            depth: node.depth(),
            refcount: node.refcount(),
            parent,
            payload_kind: node.payload().map(|p| p.kind().to_owned()),
            payload_addr: node.payload().map_or(0, |p| p.address()),
        })
    }
}

impl fmt::Display for TreeDump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for info in &self.nodes {
            writeln!(
                f,
                "vm-tree: {:indent$}{}({}, RC:{}), master: {}, data: {:#x}",
                "",
                info.name,
                info.depth,
                info.refcount,
                info.parent.as_deref().unwrap_or("self/root"),
                info.payload_addr,
                indent = info.depth as usize * 4,
            )?;
        }

        for info in &self.orphans {
            writeln!(
                f,
                "vm-tree: orphan {}({}, RC:{}), master: {}, data: {:#x}",
                info.name,
                info.depth,
                info.refcount,
                info.parent.as_deref().unwrap_or("<missing>"),
                info.payload_addr,
            )?;
        }

        Ok(())
    }
}
