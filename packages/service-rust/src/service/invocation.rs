use std::future::Future;
use std::pin::Pin;

use flowpipe_core::FlowError;

/// Boxed response future shared by the router and every middleware layer.
pub type InvocationFuture<T> = Pin<Box<dyn Future<Output = Result<T, InvocationError>> + Send>>;

/// Context carried with every invocation through the service stack.
#[derive(Debug, Clone)]
pub struct InvocationContext {
    pub call_id: u64,
    /// Name of the registered flow this invocation targets.
    pub flow_name: String,
    pub call_timeout_ms: u64,
}

impl InvocationContext {
    #[must_use]
    pub fn new(call_id: u64, flow_name: impl Into<String>, call_timeout_ms: u64) -> Self {
        Self {
            call_id,
            flow_name: flow_name.into(),
            call_timeout_ms,
        }
    }
}

/// A payload addressed to a named flow.
#[derive(Debug, Clone)]
pub struct Invocation<T> {
    pub ctx: InvocationContext,
    pub payload: T,
}

impl<T> Invocation<T> {
    #[must_use]
    pub fn new(ctx: InvocationContext, payload: T) -> Self {
        Self { ctx, payload }
    }

    #[must_use]
    pub fn ctx(&self) -> &InvocationContext {
        &self.ctx
    }
}

/// Errors returned by the flow service stack.
#[derive(Debug, thiserror::Error)]
pub enum InvocationError {
    #[error("unknown flow: {name}")]
    UnknownFlow { name: String },
    #[error("flow {flow} timed out after {timeout_ms}ms")]
    Timeout { flow: String, timeout_ms: u64 },
    #[error("service overloaded: {limit} invocations already in flight")]
    Overloaded { limit: u32 },
    #[error(transparent)]
    Flow(#[from] FlowError),
}
