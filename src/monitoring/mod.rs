/*!
 * Monitoring
 * Structured tracing setup and lifecycle spans
 */

mod tracer;

pub use tracer::{init_tracing, LifecycleSpan};
