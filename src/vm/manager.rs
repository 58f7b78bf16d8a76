/*!
 * Virtual Machine Manager
 *
 * Owns the registry tree and every worker thread started on its behalf.
 *
 * # Architecture
 *
 * - **One lock**: the tree, the state machine and the worker list sit behind
 *   a single mutex; a condition variable is signalled on every transition
 * - **Explicit context**: `VirtualMachine` is a cheap clonable handle passed
 *   to subsystems instead of process-wide statics
 * - **One shutdown handler**: exactly one `wait_for_shutdown` call may be in
 *   flight; it performs teardown once shutdown is requested
 *
 * Teardown joins workers with the lock released, so workers may keep calling
 * into the manager (and observe `is_active() == false`) while they wind down.
 * A worker that never returns blocks teardown indefinitely.
 */

use super::config::{VirtualMachineBuilder, VmArgs, VmConfig};
use super::state::VmState;
use super::workers::WorkerPool;
use crate::core::errors::VmError;
use crate::core::limits::WORKER_THREAD_PREFIX;
use crate::core::types::{NodeDescriptor, NodeId, VmResult};
use crate::monitoring::LifecycleSpan;
use crate::registry::{validate_root, RegistryTree, RootData};
use crate::tree::{Payload, TreeDump};
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

struct Core {
    state: VmState,
    registry: Option<RegistryTree>,
    workers: WorkerPool,
    shutdown_handler: bool,
    /// Bumped by every successful `initialize`
    epoch: u64,
}

struct Shared {
    core: Mutex<Core>,
    state_changed: Condvar,
    debug_mode: AtomicBool,
    spawned: AtomicUsize,
    config: VmConfig,
    session: Uuid,
}

/// Handle to the process-wide lifecycle manager
///
/// Clones share the same machine. Construct one at process start and pass
/// it to every subsystem initializer.
#[derive(Clone)]
pub struct VirtualMachine {
    inner: Arc<Shared>,
}

impl Default for VirtualMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl VirtualMachine {
    /// Create an uninitialized machine with default settings
    pub fn new() -> Self {
        Self::with_config(VmConfig::default())
    }

    pub fn builder() -> VirtualMachineBuilder {
        VirtualMachineBuilder::new()
    }

    pub fn with_config(config: VmConfig) -> Self {
        let session = Uuid::new_v4();
        debug!(session = %session, max_threads = config.max_threads, "virtual machine created");

        Self {
            inner: Arc::new(Shared {
                core: Mutex::new(Core {
                    state: VmState::Uninitialized,
                    registry: None,
                    workers: WorkerPool::default(),
                    shutdown_handler: false,
                    epoch: 0,
                }),
                state_changed: Condvar::new(),
                debug_mode: AtomicBool::new(config.debug_mode),
                spawned: AtomicUsize::new(0),
                config,
                session,
            }),
        }
    }

    pub fn config(&self) -> &VmConfig {
        &self.inner.config
    }

    /// Identifier of this machine in logs
    pub fn session_id(&self) -> Uuid {
        self.inner.session
    }

    fn lock(&self) -> MutexGuard<'_, Core> {
        self.inner.core.lock()
    }

    fn notify(&self) {
        self.inner.state_changed.notify_all();
    }

    // =========================================================================
    // State machine
    // =========================================================================

    /// Build the registry tree
    ///
    /// Fails with `AlreadyExists` while a tree is present; callers that may
    /// initialize twice should treat that code as non-fatal.
    pub fn initialize<I, S>(&self, args: I) -> VmResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let span = LifecycleSpan::new("initialize", self.inner.session);
        let _entered = span.enter();
        let started = Instant::now();
        let args = VmArgs::parse(args);

        let mut core = self.lock();
        if core.registry.is_some() {
            span.record_error("registry tree already exists");
            return Err(VmError::AlreadyExists("registry tree".into()));
        }
        if core.state == VmState::ShuttingDown {
            return Err(VmError::Busy("teardown in progress".into()));
        }

        if args.debug {
            self.set_debug_mode(true);
        }
        let debug_mode = self.debug_mode();

        let root_data = RootData {
            init_params: args.init_params,
            launch_command: args.launch_command,
            cookie: rand::random(),
            global_debug: debug_mode,
        };
        let registry = RegistryTree::spawn(self.inner.config.lookup_depth, root_data)?;

        core.registry = Some(registry);
        core.state = VmState::Initialized;
        core.epoch += 1;
        drop(core);
        self.notify();

        info!(session = %self.inner.session, "virtual machine initialized");
        if debug_mode {
            info!(elapsed_us = started.elapsed().as_micros() as u64, "initialization timing");
        }
        span.record_result(true);
        Ok(())
    }

    /// Current lifecycle state
    pub fn state(&self) -> VmState {
        self.lock().state
    }

    /// True while the tree exists, initialization completed and a shutdown
    /// handler is waiting
    pub fn is_active(&self) -> bool {
        Self::active(&self.lock())
    }

    fn active(core: &Core) -> bool {
        core.registry.is_some() && core.state.is_running() && core.shutdown_handler
    }

    /// Ask the shutdown handler to tear the machine down; callable from any thread
    pub fn request_shutdown(&self) -> VmResult<()> {
        let mut core = self.lock();
        if !Self::active(&core) {
            warn!(state = %core.state, "shutdown requested, but the virtual machine is not running");
            return Err(VmError::Failed("virtual machine is not running".into()));
        }

        if core.state == VmState::Active {
            core.state = VmState::ShutdownRequested;
            drop(core);
            self.notify();
            info!("shutdown requested");
        }
        Ok(())
    }

    /// Block until the machine is active
    ///
    /// Returns `NotFound` when initialization never started, and
    /// `SystemShutdown` if the machine goes down before becoming active.
    pub fn wait_for_vm(&self) -> VmResult<()> {
        let mut core = self.lock();
        if core.state == VmState::Uninitialized {
            return Err(VmError::NotFound("virtual machine was never initialized".into()));
        }

        let epoch = core.epoch;
        loop {
            if Self::active(&core) {
                return Ok(());
            }
            if core.epoch != epoch || !core.state.is_initialized() {
                return Err(VmError::SystemShutdown(format!(
                    "virtual machine is {}",
                    core.state
                )));
            }
            self.inner.state_changed.wait(&mut core);
        }
    }

    /// Register as the shutdown handler and block until shutdown
    ///
    /// Once shutdown is requested this call performs the teardown. Returns
    /// `Locked` if another handler is already waiting and `NotFound` if the
    /// machine is not initialized.
    pub fn wait_for_shutdown(&self) -> VmResult<()> {
        let mut core = self.lock();
        if core.registry.is_none() || !core.state.is_initialized() {
            warn!(state = %core.state, "waiting for shutdown while the virtual machine is not running");
            return Err(VmError::NotFound("virtual machine is not running".into()));
        }
        if core.shutdown_handler {
            warn!("multiple waits for shutdown");
            return Err(VmError::Locked("a shutdown handler is already waiting".into()));
        }

        core.shutdown_handler = true;
        if core.state == VmState::Initialized {
            core.state = VmState::Active;
        }
        let epoch = core.epoch;
        self.notify();
        info!("shutdown handler started");

        loop {
            if core.epoch != epoch {
                return Ok(());
            }

            match core.state {
                VmState::ShutdownRequested => {
                    let workers = Self::begin_teardown(&mut core)?;
                    drop(core);
                    self.notify();
                    return self.finish_teardown(workers);
                }
                VmState::Shutdown | VmState::Uninitialized => return Ok(()),
                _ => self.inner.state_changed.wait(&mut core),
            }
        }
    }

    /// Join every worker and tear the registry tree down
    ///
    /// Usable without a shutdown handler. Returns `NotFound` when no tree
    /// exists and `Busy` if another teardown is already running.
    pub fn deinitialize(&self) -> VmResult<()> {
        let workers = {
            let mut core = self.lock();
            Self::begin_teardown(&mut core)?
        };
        self.notify();
        self.finish_teardown(workers)
    }

    fn begin_teardown(core: &mut Core) -> VmResult<WorkerPool> {
        if core.registry.is_none() {
            return Err(VmError::NotFound("no registry tree".into()));
        }
        if core.state == VmState::ShuttingDown {
            return Err(VmError::Busy("teardown already in progress".into()));
        }

        core.state = VmState::ShuttingDown;
        Ok(core.workers.take())
    }

    fn finish_teardown(&self, workers: WorkerPool) -> VmResult<()> {
        let span = LifecycleSpan::new("teardown", self.inner.session);
        let _entered = span.enter();

        let joined = workers.join_all();
        if self.debug_mode() {
            info!(joined = joined.len(), workers = ?joined, "worker threads joined");
        }

        let registry = self.lock().registry.take();
        let result = match registry {
            Some(registry) => registry.teardown(),
            None => Ok(()),
        };

        {
            let mut core = self.lock();
            core.state = VmState::Shutdown;
            core.shutdown_handler = false;
        }
        self.notify();

        match &result {
            Ok(()) => {
                span.record_result(true);
                info!(session = %self.inner.session, "virtual machine shut down");
            }
            Err(e) => {
                span.record_error(&e.to_string());
                warn!(error = %e, "error while tearing down the registry tree");
            }
        }
        result
    }

    // =========================================================================
    // Worker threads
    // =========================================================================

    /// Run `task` on a tracked worker thread
    ///
    /// The thread is joined exactly once, at teardown.
    pub fn spawn_thread<F>(&self, task: F) -> VmResult<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let n = self.inner.spawned.fetch_add(1, Ordering::Relaxed);
        self.spawn_named_thread(format!("{}-{}", WORKER_THREAD_PREFIX, n), task)
    }

    pub fn spawn_named_thread<F>(&self, name: impl Into<String>, task: F) -> VmResult<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let name = name.into();
        if name.is_empty() {
            return Err(VmError::ArgNull("thread name"));
        }

        let mut core = self.lock();
        if matches!(core.state, VmState::ShuttingDown | VmState::Shutdown) {
            return Err(VmError::SystemShutdown(format!(
                "cannot start {} while {}",
                name, core.state
            )));
        }
        if core.workers.len() >= self.inner.config.max_threads {
            return Err(VmError::Busy(format!(
                "{} worker threads already tracked",
                core.workers.len()
            )));
        }

        core.workers
            .spawn(name.clone(), task)
            .map_err(|e| VmError::FailedAlloc(format!("thread {}: {}", name, e)))?;

        let tracked = core.workers.len() as u32;
        if let Some(runtime) = core.registry.as_mut().and_then(|r| r.runtime_data_mut()) {
            runtime.num_workers = tracked;
        }

        if self.debug_mode() {
            info!(worker = %name, tracked, "worker thread started");
        }
        Ok(())
    }

    /// Number of worker threads awaiting join
    pub fn tracked_threads(&self) -> usize {
        self.lock().workers.len()
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Register a node under `runtime`
    pub fn add_runtime_node(&self, descriptor: impl Into<NodeDescriptor>) -> VmResult<NodeId> {
        self.add_node(descriptor.into(), |registry| registry.runtime(), "runtime")
    }

    /// Register a node under `platform`
    pub fn add_platform_node(&self, descriptor: impl Into<NodeDescriptor>) -> VmResult<NodeId> {
        self.add_node(descriptor.into(), |registry| registry.platform(), "platform")
    }

    fn add_node(
        &self,
        descriptor: NodeDescriptor,
        subtree: impl FnOnce(&RegistryTree) -> NodeId,
        subtree_name: &str,
    ) -> VmResult<NodeId> {
        let mut core = self.lock();
        let registry = core
            .registry
            .as_mut()
            .ok_or_else(|| VmError::InvalidRoot(format!("{} subtree is not present", subtree_name)))?;

        let parent = subtree(registry);
        let id = registry
            .tree_mut()
            .spawn_named_child(parent, &descriptor.name)?;

        info!(subtree = subtree_name, node = %descriptor.name, "registered node");
        Ok(id)
    }

    /// Register a child below a node previously registered by a subsystem
    pub fn add_subnode(&self, parent: NodeId, descriptor: impl Into<NodeDescriptor>) -> VmResult<NodeId> {
        let descriptor = descriptor.into();
        self.with_registry_mut(|registry| {
            if parent == registry.root() {
                return Err(VmError::ArgInvalid(
                    "subsystems register under runtime or platform, not the root".into(),
                ));
            }
            registry.tree_mut().spawn_named_child(parent, &descriptor.name)
        })?
    }

    /// Attach subsystem state to a registered node
    pub fn attach_payload(&self, id: NodeId, payload: Payload) -> VmResult<()> {
        self.with_registry_mut(|registry| registry.tree_mut().attach_payload(id, payload))?
    }

    /// Look a node up by name without acquiring it
    pub fn peek_node(&self, name: &str) -> VmResult<NodeId> {
        self.with_registry(|registry| {
            let tree = registry.tree();
            tree.peek_subnode(registry.root(), name, tree.lookup_depth())
                .ok_or_else(|| VmError::NotFound(name.to_owned()))
        })?
    }

    /// Look a node up by name and acquire a reference to it
    ///
    /// A held node skips its cleanup at teardown; pair with `release_node`.
    pub fn acquire_node(&self, name: &str) -> VmResult<NodeId> {
        self.with_registry_mut(|registry| {
            let root = registry.root();
            let tree = registry.tree_mut();
            let depth = tree.lookup_depth();
            tree.get_subnode(root, name, depth)
                .ok_or_else(|| VmError::NotFound(name.to_owned()))
        })?
    }

    pub fn release_node(&self, id: NodeId) -> VmResult<()> {
        self.with_registry_mut(|registry| registry.tree_mut().release(id))?
    }

    /// Tear down a registered subsystem subtree and unlink it
    pub fn shutdown_node(&self, id: NodeId) -> VmResult<()> {
        self.with_registry_mut(|registry| {
            if registry.is_reserved(id) {
                return Err(VmError::ArgInvalid("fixed registry nodes cannot be shut down".into()));
            }
            let path = registry.tree().path(id);
            registry.tree_mut().remove_subtree(id)?;
            info!(node = path.as_deref().unwrap_or("?"), "node shut down");
            Ok(())
        })?
    }

    /// Slash separated path of a node
    pub fn node_path(&self, id: NodeId) -> VmResult<String> {
        self.with_registry(|registry| {
            registry
                .tree()
                .path(id)
                .ok_or_else(|| VmError::NotFound(format!("node {}", id)))
        })?
    }

    /// Handle of `vmroot`
    pub fn root(&self) -> VmResult<NodeId> {
        self.with_registry(|registry| registry.root())
    }

    /// Check a root handle handed to an extension initializer
    pub fn validate_root(&self, node: Option<NodeId>) -> VmResult<()> {
        self.with_registry(|registry| validate_root(registry.tree(), node))?
    }

    /// Read-only access to the registry tree
    pub fn with_registry<R>(&self, f: impl FnOnce(&RegistryTree) -> R) -> VmResult<R> {
        let core = self.lock();
        let registry = core
            .registry
            .as_ref()
            .ok_or_else(|| VmError::InvalidRoot("registry tree is not present".into()))?;
        Ok(f(registry))
    }

    fn with_registry_mut<R>(&self, f: impl FnOnce(&mut RegistryTree) -> R) -> VmResult<R> {
        let mut core = self.lock();
        let registry = core
            .registry
            .as_mut()
            .ok_or_else(|| VmError::InvalidRoot("registry tree is not present".into()))?;
        Ok(f(registry))
    }

    // =========================================================================
    // Diagnostics
    // =========================================================================

    pub fn debug_mode(&self) -> bool {
        self.inner.debug_mode.load(Ordering::Relaxed)
    }

    pub fn set_debug_mode(&self, debug_mode: bool) {
        self.inner.debug_mode.store(debug_mode, Ordering::Relaxed);
    }

    /// Snapshot of every node with depth, reference count and payload address
    pub fn dump_tree(&self) -> VmResult<TreeDump> {
        let dump = self.with_registry(|registry| registry.tree().dump())?;
        if !dump.orphans.is_empty() {
            warn!(orphans = dump.orphans.len(), "orphaned nodes in registry tree");
        }
        Ok(dump)
    }

    /// Launch parameters recorded on the root
    pub fn init_params(&self) -> VmResult<BTreeMap<String, String>> {
        self.with_registry(|registry| {
            registry
                .root_data()
                .map(|data| data.init_params.clone())
                .unwrap_or_default()
        })
    }

    /// Current session cookie
    pub fn cookie(&self) -> VmResult<u32> {
        self.with_registry(|registry| registry.root_data().map_or(0, |data| data.cookie))
    }

    /// Replace the session cookie, returning `(previous, new)`
    pub fn regenerate_cookie(&self) -> VmResult<(u32, u32)> {
        self.with_registry_mut(|registry| {
            let data = registry
                .root_data_mut()
                .ok_or_else(|| VmError::NotFound("root data".into()))?;
            let previous = data.cookie;
            data.cookie = rand::random();
            Ok((previous, data.cookie))
        })?
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        let core = self.core.get_mut();
        if core.workers.len() > 0 {
            warn!(workers = core.workers.len(), "virtual machine dropped with running workers; joining");
            core.workers.take().join_all();
        }
    }
}
