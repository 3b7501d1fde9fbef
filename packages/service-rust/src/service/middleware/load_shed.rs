//! Load shedding: rejects invocations once `limit` are already in flight.
//!
//! A permit is taken when the invocation enters the layer and released when
//! its response future completes or is dropped. Excess invocations are never
//! queued; they fail at once with `InvocationError::Overloaded`.

use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::sync::Semaphore;
use tower::{Layer, Service};

use crate::service::invocation::{Invocation, InvocationError, InvocationFuture};

#[derive(Debug, Clone)]
pub struct LoadShedLayer {
    limit: u32,
    permits: Arc<Semaphore>,
}

impl LoadShedLayer {
    /// Allow at most `limit` invocations in flight across every service this
    /// layer wraps.
    #[must_use]
    pub fn new(limit: u32) -> Self {
        Self {
            limit,
            permits: Arc::new(Semaphore::new(limit as usize)),
        }
    }
}

impl<S> Layer<S> for LoadShedLayer {
    type Service = LoadShedService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        LoadShedService {
            inner,
            limit: self.limit,
            permits: Arc::clone(&self.permits),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadShedService<S> {
    inner: S,
    limit: u32,
    permits: Arc<Semaphore>,
}

impl<S> LoadShedService<S> {
    /// Invocations currently holding a permit.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        (self.limit as usize).saturating_sub(self.permits.available_permits())
    }
}

impl<S, T> Service<Invocation<T>> for LoadShedService<S>
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
        let limit = self.limit;
        let Ok(permit) = Arc::clone(&self.permits).try_acquire_owned() else {
            tracing::warn!(
                flow = %inv.ctx().flow_name,
                call_id = inv.ctx().call_id,
                limit,
                "invocation shed"
            );
            return Box::pin(async move { Err(InvocationError::Overloaded { limit }) });
        };

        let fut = self.inner.call(inv);
        Box::pin(async move {
            let _permit = permit;
            fut.await
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use flowpipe_core::{pipe, Stage};
    use tower::ServiceExt;

    use super::*;
    use crate::service::invocation::InvocationContext;
    use crate::service::router::FlowRouter;

    fn settling_router(delay_ms: u64) -> FlowRouter<u64> {
        let mut router = FlowRouter::new();
        router.register(
            "settle",
            pipe![Stage::deferred(move |x: u64| async move {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                x
            })],
        );
        router
    }

    fn make_inv(call_id: u64) -> Invocation<u64> {
        Invocation::new(InvocationContext::new(call_id, "settle", 5000), 3)
    }

    #[tokio::test(start_paused = true)]
    async fn admits_invocations_under_the_limit() {
        let svc = LoadShedLayer::new(10).layer(settling_router(1));
        let resp = svc.oneshot(make_inv(1)).await.unwrap();
        assert_eq!(resp, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn sheds_once_the_limit_is_reached() {
        let mut svc = LoadShedLayer::new(2).layer(settling_router(500));

        let first = svc.call(make_inv(1));
        let second = svc.call(make_inv(2));
        assert_eq!(svc.in_flight(), 2);

        let err = svc.call(make_inv(3)).await.unwrap_err();
        assert!(matches!(err, InvocationError::Overloaded { limit: 2 }));
        assert_eq!(
            err.to_string(),
            "service overloaded: 2 invocations already in flight"
        );

        assert_eq!((first.await.unwrap(), second.await.unwrap()), (3, 3));
        assert_eq!(svc.in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_a_response_releases_its_permit() {
        let mut svc = LoadShedLayer::new(1).layer(settling_router(500));

        let abandoned = svc.call(make_inv(1));
        assert_eq!(svc.in_flight(), 1);
        drop(abandoned);
        assert_eq!(svc.in_flight(), 0);

        assert_eq!(svc.call(make_inv(2)).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn layer_clones_share_one_budget() {
        let layer = LoadShedLayer::new(1);
        let mut a = layer.layer(settling_router(500));
        let mut b = layer.layer(settling_router(500));

        let _held = a.call(make_inv(1));
        let err = b.call(make_inv(2)).await.unwrap_err();
        assert!(matches!(err, InvocationError::Overloaded { limit: 1 }));
    }
}
