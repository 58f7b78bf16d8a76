/*!
 * Registry Bootstrap
 *
 * Builds the root and its two permanent subtrees. This is the only place
 * `vmroot`, `runtime` and `platform` are created; the duplicate-name check in
 * the tree keeps anyone else from reusing those names afterwards.
 */

use super::data::{PlatformData, RootData, RuntimeData};
use crate::core::errors::VmError;
use crate::core::limits::{PLATFORM_NAME, RUNTIME_NAME, VMROOT_NAME};
use crate::core::types::{NodeId, VmResult};
use crate::tree::{Payload, Tree};
use tracing::debug;

/// The registry tree together with handles to its fixed nodes
pub struct RegistryTree {
    tree: Tree,
    runtime: NodeId,
    platform: NodeId,
}

impl RegistryTree {
    /// Create `vmroot`, then `runtime`, then `platform`
    ///
    /// Failure to create either subtree aborts with `FailedAlloc`.
    pub fn spawn(lookup_depth: u32, root_data: RootData) -> VmResult<Self> {
        let debug_mode = root_data.global_debug;
        let mut tree = Tree::with_lookup_depth(VMROOT_NAME, lookup_depth)?;
        let root = tree.root();
        tree.attach_payload(root, Payload::Root(root_data))?;

        let runtime = tree
            .spawn_named_child(root, RUNTIME_NAME)
            .map_err(|e| VmError::FailedAlloc(format!("{}: {}", RUNTIME_NAME, e)))?;
        tree.attach_payload(
            runtime,
            Payload::Runtime(RuntimeData {
                num_workers: 0,
                debug_mode,
            }),
        )?;

        let platform = tree
            .spawn_named_child(root, PLATFORM_NAME)
            .map_err(|e| VmError::FailedAlloc(format!("{}: {}", PLATFORM_NAME, e)))?;
        tree.attach_payload(platform, Payload::Platform(PlatformData::probe(debug_mode)))?;

        debug!("registry tree spawned");
        Ok(Self {
            tree,
            runtime,
            platform,
        })
    }

    #[inline]
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    #[inline]
    pub fn tree_mut(&mut self) -> &mut Tree {
        &mut self.tree
    }

    #[inline]
    pub fn root(&self) -> NodeId {
        self.tree.root()
    }

    #[inline]
    pub fn runtime(&self) -> NodeId {
        self.runtime
    }

    #[inline]
    pub fn platform(&self) -> NodeId {
        self.platform
    }

    /// True for `vmroot`, `runtime` and `platform`
    pub fn is_reserved(&self, id: NodeId) -> bool {
        id == self.root() || id == self.runtime || id == self.platform
    }

    pub fn root_data(&self) -> Option<&RootData> {
        self.tree.node(self.root())?.payload()?.as_root()
    }

    pub fn root_data_mut(&mut self) -> Option<&mut RootData> {
        let root = self.root();
        self.tree.payload_mut(root).ok()??.as_root_mut()
    }

    pub fn runtime_data_mut(&mut self) -> Option<&mut RuntimeData> {
        self.tree.payload_mut(self.runtime).ok()??.as_runtime_mut()
    }

    pub fn platform_data(&self) -> Option<&PlatformData> {
        self.tree.node(self.platform)?.payload()?.as_platform()
    }

    /// Deinitialize every node, children before parents, and free the tree
    pub fn teardown(self) -> VmResult<()> {
        self.tree.teardown()
    }
}

/// Check that `node` is the root of a registry tree
///
/// Extension initializers that receive a root handle call this before
/// touching the tree.
pub fn validate_root(tree: &Tree, node: Option<NodeId>) -> VmResult<()> {
    let id = node.ok_or(VmError::ArgNull("root node"))?;
    let node = tree
        .node(id)
        .ok_or_else(|| VmError::ArgInvalid(format!("node {} does not exist", id)))?;

    if node.depth() != 0 {
        return Err(VmError::ArgInvalid(format!(
            "node {} is at depth {}",
            node.name().unwrap_or("<unnamed>"),
            node.depth()
        )));
    }
    if node.name() != Some(VMROOT_NAME) {
        return Err(VmError::ArgInvalid(format!(
            "root is named {:?}, expected {}",
            node.name(),
            VMROOT_NAME
        )));
    }
    Ok(())
}
