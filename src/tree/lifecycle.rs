/*!
 * Node Lifecycle
 * Child creation, payload attachment, reference release and teardown
 */

use super::arena::Tree;
use super::node::Node;
use super::payload::Payload;
use crate::core::errors::VmError;
use crate::core::types::{NodeId, VmResult};
use tracing::{debug, warn};

impl Tree {
    /// Append an unnamed child to `parent`
    ///
    /// The child sits one level below its parent and the parent's reference
    /// count grows by one for as long as the child is alive.
    pub fn spawn_child(&mut self, parent: NodeId) -> VmResult<NodeId> {
        let parent_node = self.get(parent)?;
        if parent_node.is_deinitialized() {
            return Err(VmError::SystemShutdown(format!(
                "{} is deinitialized",
                parent_node.display_name()
            )));
        }
        let depth = parent_node.depth() + 1;
        let id = self.alloc(Node::new(None, depth, Some(parent)));

        let parent_node = self.get_mut(parent)?;
        parent_node.children.push(id);
        parent_node.refcount = parent_node.refcount.saturating_add(1);
        Ok(id)
    }

    /// Append a named child to `parent`
    ///
    /// The name must not exist anywhere in the tree rooted at `parent`'s
    /// root. Conflicts are rejected without touching the tree.
    pub fn spawn_named_child(&mut self, parent: NodeId, name: &str) -> VmResult<NodeId> {
        if name.is_empty() {
            return Err(VmError::ArgNull("node name"));
        }

        self.get(parent)?;
        let root = self
            .get_root(parent)
            .ok_or_else(|| VmError::InvalidRoot(format!("parent of {} is orphaned", name)))?;

        if self.search(root, name, 0, self.lookup_depth()).is_some() {
            warn!(node = name, "node already exists");
            return Err(VmError::AlreadyExists(name.to_owned()));
        }

        let id = self.spawn_child(parent)?;
        self.get_mut(id)?.name = Some(name.to_owned());
        Ok(id)
    }

    /// Drop one external reference; a count of zero stays zero
    pub fn release(&mut self, id: NodeId) -> VmResult<()> {
        let node = self.get_mut(id)?;
        node.refcount = node.refcount.saturating_sub(1);
        Ok(())
    }

    /// Attach a payload to a node that has none yet
    pub fn attach_payload(&mut self, id: NodeId, payload: Payload) -> VmResult<()> {
        let node = self.get_mut(id)?;
        if node.payload.is_some() {
            return Err(VmError::AlreadyExists(format!(
                "payload on {}",
                node.display_name()
            )));
        }

        node.payload = Some(payload);
        Ok(())
    }

    /// Tear down every descendant of `id`, then `id` itself
    ///
    /// Children are deinitialized and freed depth-first in insertion order.
    /// Afterwards the parent's reference count drops by one and, if no
    /// reference to `id` remains, its payload cleanup runs. The node stays
    /// allocated (its parent owns the slot). Cleanup runs at most once per
    /// node; calling `deinit` again only frees descendants still linked.
    pub fn deinit(&mut self, id: NodeId) -> VmResult<()> {
        self.get(id)?;

        for current in self.post_order(id) {
            self.deinit_one(current);
            if current != id {
                self.free(current);
            }
        }

        Ok(())
    }

    /// Node ids below and including `start`, children before parents
    fn post_order(&self, start: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![(start, false)];

        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                out.push(id);
                continue;
            }
            let Some(node) = self.node(id) else {
                continue;
            };
            stack.push((id, true));
            stack.extend(node.children().iter().rev().map(|&child| (child, false)));
        }

        out
    }

    /// Unlink the children of one node, release its parent and run its
    /// cleanup; its children have already been freed
    fn deinit_one(&mut self, id: NodeId) {
        let Some(node) = self.node_mut(id) else {
            return;
        };
        node.children.clear();
        if node.deinitialized {
            return;
        }
        node.deinitialized = true;

        let parent = node.parent;
        let payload = if node.refcount == 0 {
            debug!(node = node.display_name(), "deinit");
            node.payload.take()
        } else {
            debug!(
                node = node.display_name(),
                refcount = node.refcount,
                "node still referenced, cleanup skipped"
            );
            None
        };

        if let Some(parent) = parent {
            if let Some(parent_node) = self.node_mut(parent) {
                parent_node.refcount = parent_node.refcount.saturating_sub(1);
            }
        }

        if let Some(payload) = payload {
            payload.cleanup();
        }
    }

    /// Deinitialize a subtree and unlink it from its parent
    ///
    /// The root cannot be removed this way; tear the whole tree down instead.
    pub fn remove_subtree(&mut self, id: NodeId) -> VmResult<()> {
        let parent = self
            .get(id)?
            .parent()
            .ok_or_else(|| VmError::ArgInvalid("cannot remove the tree root".into()))?;

        self.deinit(id)?;

        if let Some(parent_node) = self.node_mut(parent) {
            parent_node.children.retain(|&child| child != id);
        }
        self.free(id);
        Ok(())
    }

    /// Deinitialize the whole tree and free every node
    pub fn teardown(mut self) -> VmResult<()> {
        let root = self.root();
        self.deinit(root)?;
        self.free(root);

        if !self.is_empty() {
            warn!(leaked = self.len(), "unreachable nodes freed at teardown");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Subsystem;
    use parking_lot::Mutex;
    use std::sync::Arc;

    struct Recorder {
        name: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl Subsystem for Recorder {
        fn kind(&self) -> &str {
            "recorder"
        }

        fn cleanup(&mut self) {
            self.log.lock().push(self.name);
        }
    }

    fn recorder(name: &'static str, log: &Arc<Mutex<Vec<&'static str>>>) -> Payload {
        Payload::subsystem(Recorder {
            name,
            log: Arc::clone(log),
        })
    }

    #[test]
    fn test_spawn_child_links_parent() {
        let mut tree = Tree::new("vmroot").unwrap();
        let root = tree.root();
        let child = tree.spawn_child(root).unwrap();

        let node = tree.get(child).unwrap();
        assert_eq!(node.depth(), 1);
        assert_eq!(node.parent(), Some(root));
        assert_eq!(node.name(), None);
        assert_eq!(tree.get(root).unwrap().children(), &[child]);
        assert_eq!(tree.get(root).unwrap().refcount(), 1);
    }

    #[test]
    fn test_duplicate_name_rejected_without_change() {
        let mut tree = Tree::new("vmroot").unwrap();
        let root = tree.root();
        let runtime = tree.spawn_named_child(root, "runtime").unwrap();
        let platform = tree.spawn_named_child(root, "platform").unwrap();
        tree.spawn_named_child(runtime, "vulkan").unwrap();

        let before = tree.len();
        let platform_rc = tree.get(platform).unwrap().refcount();

        let err = tree.spawn_named_child(platform, "vulkan").unwrap_err();
        assert!(matches!(err, VmError::AlreadyExists(ref n) if n == "vulkan"));
        assert_eq!(tree.len(), before);
        assert_eq!(tree.get(platform).unwrap().refcount(), platform_rc);
        assert!(tree.get(platform).unwrap().children().is_empty());
    }

    #[test]
    fn test_empty_name_is_argument_error() {
        let mut tree = Tree::new("vmroot").unwrap();
        let root = tree.root();
        assert!(matches!(
            tree.spawn_named_child(root, ""),
            Err(VmError::ArgNull(_))
        ));
    }

    #[test]
    fn test_attach_payload_twice_fails() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut tree = Tree::new("vmroot").unwrap();
        let root = tree.root();
        let id = tree.spawn_named_child(root, "sound").unwrap();

        tree.attach_payload(id, recorder("first", &log)).unwrap();
        let err = tree.attach_payload(id, recorder("second", &log)).unwrap_err();

        assert!(matches!(err, VmError::AlreadyExists(_)));
        assert_eq!(tree.get(id).unwrap().payload().unwrap().kind(), "recorder");
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_deinit_is_post_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut tree = Tree::new("vmroot").unwrap();
        let root = tree.root();

        let a = tree.spawn_named_child(root, "a").unwrap();
        let a1 = tree.spawn_named_child(a, "a1").unwrap();
        let a2 = tree.spawn_named_child(a, "a2").unwrap();
        let b = tree.spawn_named_child(root, "b").unwrap();

        tree.attach_payload(root, recorder("root", &log)).unwrap();
        tree.attach_payload(a, recorder("a", &log)).unwrap();
        tree.attach_payload(a1, recorder("a1", &log)).unwrap();
        tree.attach_payload(a2, recorder("a2", &log)).unwrap();
        tree.attach_payload(b, recorder("b", &log)).unwrap();

        tree.deinit(root).unwrap();

        assert_eq!(*log.lock(), vec!["a1", "a2", "a", "b", "root"]);
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_deinit_skips_cleanup_for_held_node() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut tree = Tree::new("vmroot").unwrap();
        let root = tree.root();
        let held = tree.spawn_named_child(root, "held").unwrap();
        tree.attach_payload(held, recorder("held", &log)).unwrap();
        tree.attach_payload(root, recorder("root", &log)).unwrap();

        tree.get_subnode(root, "held", 32).unwrap();
        tree.deinit(root).unwrap();

        assert_eq!(*log.lock(), vec!["root"]);
    }

    #[test]
    fn test_deinit_twice_runs_cleanup_once() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut tree = Tree::new("vmroot").unwrap();
        let root = tree.root();
        let a = tree.spawn_named_child(root, "a").unwrap();
        let _b = tree.spawn_named_child(root, "b").unwrap();
        tree.attach_payload(a, recorder("a", &log)).unwrap();

        tree.deinit(a).unwrap();
        tree.deinit(a).unwrap();

        assert_eq!(*log.lock(), vec!["a"]);
        assert_eq!(tree.get(root).unwrap().refcount(), 1);
    }

    #[test]
    fn test_deinit_deep_chain() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut tree = Tree::new("vmroot").unwrap();
        let root = tree.root();

        let top = tree.spawn_named_child(root, "top").unwrap();
        tree.attach_payload(top, recorder("top", &log)).unwrap();
        let mut parent = top;
        for _ in 0..200_000 {
            parent = tree.spawn_child(parent).unwrap();
        }
        tree.attach_payload(parent, recorder("bottom", &log)).unwrap();

        tree.deinit(root).unwrap();

        assert_eq!(*log.lock(), vec!["bottom", "top"]);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.get(root).unwrap().refcount(), 0);
    }

    #[test]
    fn test_spawn_under_deinitialized_node_rejected() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut tree = Tree::new("vmroot").unwrap();
        let root = tree.root();
        let a = tree.spawn_named_child(root, "a").unwrap();

        tree.deinit(a).unwrap();
        assert!(tree.get(a).unwrap().is_deinitialized());

        assert!(matches!(
            tree.spawn_named_child(a, "late"),
            Err(VmError::SystemShutdown(_))
        ));
        assert!(matches!(tree.spawn_child(a), Err(VmError::SystemShutdown(_))));
        assert!(tree.get(a).unwrap().children().is_empty());

        tree.attach_payload(root, recorder("root", &log)).unwrap();
        tree.deinit(root).unwrap();
        assert_eq!(*log.lock(), vec!["root"]);
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_remove_subtree_unlinks_and_frees() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut tree = Tree::new("vmroot").unwrap();
        let root = tree.root();
        let station = tree.spawn_named_child(root, "station").unwrap();
        let server = tree.spawn_named_child(station, "server").unwrap();
        tree.attach_payload(server, recorder("server", &log)).unwrap();
        tree.attach_payload(station, recorder("station", &log)).unwrap();

        tree.remove_subtree(station).unwrap();

        assert_eq!(*log.lock(), vec!["server", "station"]);
        assert!(tree.node(station).is_none());
        assert!(tree.node(server).is_none());
        assert!(tree.get(root).unwrap().children().is_empty());
        assert_eq!(tree.get(root).unwrap().refcount(), 0);

        // The name is free again
        assert!(tree.spawn_named_child(root, "station").is_ok());
    }

    #[test]
    fn test_remove_root_rejected() {
        let mut tree = Tree::new("vmroot").unwrap();
        let root = tree.root();
        assert!(matches!(
            tree.remove_subtree(root),
            Err(VmError::ArgInvalid(_))
        ));
    }

    #[test]
    fn test_release_on_zero_is_noop() {
        let mut tree = Tree::new("vmroot").unwrap();
        let root = tree.root();
        tree.release(root).unwrap();
        assert_eq!(tree.get(root).unwrap().refcount(), 0);
    }
}
