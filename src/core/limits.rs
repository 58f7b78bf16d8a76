/*!
 * System Limits and Constants
 *
 * Centralized location for registry names, lookup bounds and lifecycle limits.
 */

// =============================================================================
// REGISTRY TREE
// =============================================================================

/// Name of the registry tree root
pub const VMROOT_NAME: &str = "vmroot";

/// First-level subtree for dynamically started workers and services
pub const RUNTIME_NAME: &str = "runtime";

/// First-level subtree for host and environment subsystems
pub const PLATFORM_NAME: &str = "platform";

/// Names that only the bootstrap sequence may create
pub const RESERVED_NAMES: [&str; 3] = [VMROOT_NAME, RUNTIME_NAME, PLATFORM_NAME];

/// Maximum depth searched below a node
/// Bounds recursive lookup cost regardless of the caller's requested depth
pub const MAX_LOOKUP_DEPTH: u32 = 32;

// =============================================================================
// LIFECYCLE
// =============================================================================

/// Maximum number of worker threads tracked by one virtual machine
pub const MAX_TRACKED_THREADS: usize = 128;

/// Prefix for worker thread names
pub const WORKER_THREAD_PREFIX: &str = "sigil-worker";

// =============================================================================
// ENVIRONMENT
// =============================================================================

/// Enables debug mode when set to "1" or "true"
pub const ENV_DEBUG: &str = "SIGIL_DEBUG";

/// Overrides the tracked thread limit
pub const ENV_MAX_THREADS: &str = "SIGIL_MAX_THREADS";

/// Enables JSON trace output when set to "1" or "true"
pub const ENV_TRACE_JSON: &str = "SIGIL_TRACE_JSON";
