//! Tower middleware layers for the flow service stack.
//!
//! - [`timeout`]: Per-invocation deadlines over deferred stages
//! - [`metrics`]: Invocation timing and outcome via `tracing` spans
//! - [`load_shed`]: Shared in-flight limit, excess invocations rejected
//! - [`pipeline`]: Composes all layers into a single service stack

pub mod load_shed;
pub mod metrics;
pub mod pipeline;
pub mod timeout;

pub use load_shed::LoadShedLayer;
pub use metrics::MetricsLayer;
pub use pipeline::build_flow_pipeline;
pub use timeout::TimeoutLayer;
