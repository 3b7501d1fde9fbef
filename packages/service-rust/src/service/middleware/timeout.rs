//! Deadline enforcement for invocations.
//!
//! The deadline is fixed when an invocation enters the layer, from its
//! `call_timeout_ms`. Synchronous stages run while the inner service builds
//! its future, so they spend the same budget the deferred remainder gets.

use std::task::{Context, Poll};
use std::time::Duration;

use tokio::time::Instant;
use tower::{Layer, Service};

use crate::service::invocation::{Invocation, InvocationError, InvocationFuture};

/// Applies each invocation's own deadline to the wrapped flow service.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeoutLayer;

impl<S> Layer<S> for TimeoutLayer {
    type Service = TimeoutService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TimeoutService { inner }
    }
}

#[derive(Debug, Clone)]
pub struct TimeoutService<S> {
    inner: S,
}

impl<S, T> Service<Invocation<T>> for TimeoutService<S>
where
    S: Service<Invocation<T>, Response = T, Error = InvocationError>,
    S::Future: Send + 'static,
    T: Send + 'static,
{
    type Response = T;
    type Error = InvocationError;
    type Future = InvocationFuture<T>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, inv: Invocation<T>) -> Self::Future {
        let timeout_ms = inv.ctx().call_timeout_ms;
        let flow = inv.ctx().flow_name.clone();
        let call_id = inv.ctx().call_id;
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);

        let fut = self.inner.call(inv);
        Box::pin(async move {
            if let Ok(result) = tokio::time::timeout_at(deadline, fut).await {
                result
            } else {
                tracing::warn!(flow = %flow, call_id, timeout_ms, "invocation deadline elapsed");
                Err(InvocationError::Timeout { flow, timeout_ms })
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use flowpipe_core::{pipe, Stage};
    use tower::ServiceExt;

    use super::*;
    use crate::service::invocation::InvocationContext;
    use crate::service::router::FlowRouter;

    /// One flow that echoes after `delay_ms`, preceded by a synchronous doubling.
    fn settling_router(delay_ms: u64) -> FlowRouter<u64> {
        let mut router = FlowRouter::new();
        router.register(
            "settle",
            pipe![
                |x: u64| x * 2,
                Stage::deferred(move |x: u64| async move {
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    x
                }),
            ],
        );
        router
    }

    fn make_inv(timeout_ms: u64) -> Invocation<u64> {
        Invocation::new(InvocationContext::new(1, "settle", timeout_ms), 7)
    }

    #[tokio::test(start_paused = true)]
    async fn completes_within_deadline() {
        let svc = TimeoutLayer.layer(settling_router(10));
        let resp = svc.oneshot(make_inv(1000)).await.unwrap();
        assert_eq!(resp, 14);
    }

    #[tokio::test(start_paused = true)]
    async fn elapsed_deadline_names_the_flow() {
        let svc = TimeoutLayer.layer(settling_router(200));
        let err = svc.oneshot(make_inv(50)).await.unwrap_err();
        assert!(matches!(
            err,
            InvocationError::Timeout { ref flow, timeout_ms: 50 } if flow == "settle"
        ));
        assert_eq!(err.to_string(), "flow settle timed out after 50ms");
    }

    #[tokio::test(start_paused = true)]
    async fn synchronous_flows_finish_even_with_zero_budget() {
        let mut router = FlowRouter::new();
        router.register("settle", pipe![|x: u64| x + 1]);
        let svc = TimeoutLayer.layer(router);

        let resp = svc.oneshot(make_inv(0)).await.unwrap();
        assert_eq!(resp, 8);
    }
}
