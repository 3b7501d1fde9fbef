//! Flow invocation and execution framework.
//!
//! This module puts `flowpipe_core` flows behind a `tower` service stack:
//!
//! 1. **Construction** (`factory`): payload -> `Invocation` with call ID and timeout
//! 2. **Middleware** (`middleware`): Tower layers (timeout, metrics, load-shedding)
//! 3. **Routing** (`router`): Dispatch to registered flows by `flow_name`

pub mod config;
pub mod factory;
pub mod invocation;
pub mod middleware;
pub mod router;

// Re-export key types for convenient access.
pub use config::ServiceConfig;
pub use factory::InvocationFactory;
pub use invocation::{Invocation, InvocationContext, InvocationError, InvocationFuture};
pub use middleware::build_flow_pipeline;
pub use router::FlowRouter;
