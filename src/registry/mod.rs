/*!
 * Registry Tree
 * The fixed vmroot -> {runtime, platform} hierarchy and its bookkeeping data
 */

mod bootstrap;
mod data;

pub use bootstrap::{validate_root, RegistryTree};
pub use data::{PlatformData, RootData, RuntimeData};
