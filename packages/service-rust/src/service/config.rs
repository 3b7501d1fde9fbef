/// Configuration for the flow service stack.
///
/// Controls invocation timeouts and concurrency limits. The combinators
/// themselves impose neither; both are applied by the middleware layers.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Timeout for invocations that do not set their own, in milliseconds.
    pub default_timeout_ms: u64,
    /// Maximum number of in-flight invocations before load shedding.
    pub max_concurrent_invocations: u32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: 30_000,
            max_concurrent_invocations: 1000,
        }
    }
}
