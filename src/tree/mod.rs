/*!
 * Node Tree
 *
 * Hierarchical resource registry stored in an index arena. Every node is
 * owned by exactly one parent through its child list; teardown follows the
 * child lists depth-first so a subsystem's cleanup always runs before the
 * cleanup of its container.
 *
 * # Reference counting
 *
 * A node's reference count covers its live children plus external holders
 * that acquired it through [`Tree::get_subnode`]. Cleanup only runs when the
 * count drops to zero during [`Tree::deinit`].
 */

mod arena;
mod dump;
mod lifecycle;
mod lookup;
mod node;
mod payload;

pub use arena::Tree;
pub use dump::{NodeInfo, TreeDump};
pub use node::Node;
pub use payload::{Payload, Subsystem};
