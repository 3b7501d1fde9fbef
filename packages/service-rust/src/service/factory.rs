//! Invocation construction: assigns call IDs and default timeouts.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::config::ServiceConfig;
use super::invocation::{Invocation, InvocationContext};

// ---------------------------------------------------------------------------
// InvocationFactory
// ---------------------------------------------------------------------------

/// Builds `Invocation` values addressed to named flows.
///
/// Each invocation gets a fresh, monotonically increasing call ID. The
/// timeout defaults to `ServiceConfig::default_timeout_ms`.
pub struct InvocationFactory {
    config: Arc<ServiceConfig>,
    call_id_counter: AtomicU64,
}

impl InvocationFactory {
    #[must_use]
    pub fn new(config: Arc<ServiceConfig>) -> Self {
        Self {
            config,
            call_id_counter: AtomicU64::new(1),
        }
    }

    fn next_call_id(&self) -> u64 {
        self.call_id_counter.fetch_add(1, Ordering::Relaxed)
    }

    /// Address `payload` to `flow_name` with the configured default timeout.
    pub fn invocation<T>(&self, flow_name: impl Into<String>, payload: T) -> Invocation<T> {
        self.with_timeout(flow_name, payload, self.config.default_timeout_ms)
    }

    /// Address `payload` to `flow_name` with an explicit timeout.
    pub fn with_timeout<T>(
        &self,
        flow_name: impl Into<String>,
        payload: T,
        timeout_ms: u64,
    ) -> Invocation<T> {
        let ctx = InvocationContext::new(self.next_call_id(), flow_name, timeout_ms);
        Invocation::new(ctx, payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factory() -> InvocationFactory {
        InvocationFactory::new(Arc::new(ServiceConfig {
            default_timeout_ms: 1234,
            ..ServiceConfig::default()
        }))
    }

    #[test]
    fn call_ids_are_unique_and_increasing() {
        let factory = factory();
        let first = factory.invocation("transfer", 1);
        let second = factory.invocation("transfer", 2);
        let third = factory.invocation("refund", 3);

        assert_eq!(first.ctx().call_id, 1);
        assert_eq!(second.ctx().call_id, 2);
        assert_eq!(third.ctx().call_id, 3);
    }

    #[test]
    fn default_timeout_comes_from_config() {
        let inv = factory().invocation("transfer", ());
        assert_eq!(inv.ctx().call_timeout_ms, 1234);
        assert_eq!(inv.ctx().flow_name, "transfer");
    }

    #[test]
    fn explicit_timeout_overrides_default() {
        let inv = factory().with_timeout("transfer", "payload", 50);
        assert_eq!(inv.ctx().call_timeout_ms, 50);
        assert_eq!(inv.payload, "payload");
    }
}
