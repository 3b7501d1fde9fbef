//! Invocation timing and outcome, recorded on a `tracing` span.
//!
//! There is no metrics backend; the `invocation` span and its closing event
//! carry `flow`, `call_id`, `duration_ms` and `outcome` for whatever
//! subscriber the binary installs.

use std::task::{Context, Poll};
use std::time::Instant;

use tower::{Layer, Service};
use tracing::{info_span, Instrument};

use crate::service::invocation::{Invocation, InvocationError, InvocationFuture};

/// Classifies a finished invocation for the `outcome` field.
#[must_use]
pub fn outcome<T>(result: &Result<T, InvocationError>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(InvocationError::Flow(err)) if err.is_route_not_found() => "no_route",
        Err(InvocationError::Flow(_)) => "stage_error",
        Err(InvocationError::Timeout { .. }) => "timeout",
        Err(InvocationError::Overloaded { .. }) => "overloaded",
        Err(InvocationError::UnknownFlow { .. }) => "unknown_flow",
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsLayer;

impl<S> Layer<S> for MetricsLayer {
    type Service = MetricsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MetricsService { inner }
    }
}

#[derive(Debug, Clone)]
pub struct MetricsService<S> {
    inner: S,
}

impl<S, T> Service<Invocation<T>> for MetricsService<S>
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
        let span = info_span!(
            "invocation",
            flow = %inv.ctx().flow_name,
            call_id = inv.ctx().call_id,
            duration_ms = tracing::field::Empty,
            outcome = tracing::field::Empty,
        );

        // Synchronous stages run inside the inner `call`.
        let start = Instant::now();
        let fut = span.in_scope(|| self.inner.call(inv));

        Box::pin(
            async move {
                let result = fut.await;
                let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
                let outcome = outcome(&result);

                let span = tracing::Span::current();
                span.record("duration_ms", duration_ms);
                span.record("outcome", outcome);
                tracing::info!(duration_ms, outcome, "invocation complete");

                result
            }
            .instrument(span),
        )
    }
}

#[cfg(test)]
mod tests {
    use flowpipe_core::{pipe, FlowError, Stage};
    use tower::ServiceExt;

    use super::*;
    use crate::service::invocation::InvocationContext;
    use crate::service::router::FlowRouter;

    #[tokio::test]
    async fn passes_responses_through() {
        let mut router = FlowRouter::new();
        router.register("inc", pipe![|x: i64| x + 1]);
        let svc = MetricsLayer.layer(router);

        let inv = Invocation::new(InvocationContext::new(42, "inc", 5000), 41);
        assert_eq!(svc.oneshot(inv).await.unwrap(), 42);
    }

    #[tokio::test]
    async fn passes_errors_through() {
        let svc = MetricsLayer.layer(FlowRouter::<i64>::new());

        let inv = Invocation::new(InvocationContext::new(1, "missing", 5000), 0);
        let err = svc.oneshot(inv).await.unwrap_err();
        assert_eq!(outcome::<i64>(&Err(err)), "unknown_flow");
    }

    #[test]
    fn outcomes_distinguish_every_failure() {
        let failed = |err: InvocationError| outcome::<()>(&Err(err));

        assert_eq!(outcome(&Ok::<_, InvocationError>(())), "ok");
        assert_eq!(
            failed(FlowError::RouteNotFound { attempted: vec!["type".into()] }.into()),
            "no_route"
        );
        assert_eq!(
            failed(FlowError::stage(std::io::Error::other("ledger offline")).into()),
            "stage_error"
        );
        assert_eq!(
            failed(InvocationError::Timeout { flow: "transfer".into(), timeout_ms: 5 }),
            "timeout"
        );
        assert_eq!(failed(InvocationError::Overloaded { limit: 1 }), "overloaded");
        assert_eq!(
            failed(InvocationError::UnknownFlow { name: "refund".into() }),
            "unknown_flow"
        );
    }

    #[tokio::test]
    async fn stage_failures_are_not_route_misses() {
        let mut router = FlowRouter::new();
        router.register(
            "fail",
            pipe![Stage::try_map(|_: i64| {
                Err::<i64, _>(FlowError::stage(std::io::Error::other("boom")))
            })],
        );
        let svc = MetricsLayer.layer(router);

        let inv = Invocation::new(InvocationContext::new(1, "fail", 5000), 0);
        let result = svc.oneshot(inv).await;
        assert_eq!(outcome(&result), "stage_error");
    }
}
