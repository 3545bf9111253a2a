/*!
 * Monitoring Module
 * Structured tracing and lifecycle event fan-out
 */

pub mod events;
pub mod tracer;

pub use events::{EventBus, LifecycleEvent};
pub use tracer::{generate_trace_id, init_tracing, span_operation, OperationSpan};
