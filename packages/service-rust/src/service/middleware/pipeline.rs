//! Service stack composition: combines all middleware layers around a `FlowRouter`.

use tower::ServiceBuilder;

use super::load_shed::LoadShedLayer;
use super::metrics::MetricsLayer;
use super::timeout::TimeoutLayer;
use crate::service::config::ServiceConfig;
use crate::service::invocation::{Invocation, InvocationError, InvocationFuture};
use crate::service::router::FlowRouter;

/// Build the flow service by wrapping the `FlowRouter` with middleware layers.
///
/// Outermost first: `LoadShedLayer` (a shed invocation never runs a stage),
/// `TimeoutLayer`, then `MetricsLayer` next to the router so its span covers
/// the synchronous stages too.
#[must_use]
pub fn build_flow_pipeline<T>(
    router: FlowRouter<T>,
    config: &ServiceConfig,
) -> impl tower::Service<
    Invocation<T>,
    Response = T,
    Error = InvocationError,
    Future = InvocationFuture<T>,
> + Clone
where
    T: Send + 'static,
{
    ServiceBuilder::new()
        .layer(LoadShedLayer::new(config.max_concurrent_invocations))
        .layer(TimeoutLayer)
        .layer(MetricsLayer)
        .service(router)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use flowpipe_core::{branch, pipe, BranchConfig, FlowError, Routes, Value};
    use tower::{Service, ServiceExt};

    use super::*;
    use crate::service::factory::InvocationFactory;

    fn transfer_router() -> FlowRouter<Value> {
        let mut router = FlowRouter::new();
        router.register(
            "transfer",
            branch(BranchConfig::new().on(
                "type",
                Routes::new()
                    .when("domestic", pipe![|r: Value| r.with("fee", 0)])
                    .when("international", pipe![|r: Value| r.with("fee", 25)]),
            )),
        );
        router
    }

    #[tokio::test]
    async fn pipeline_routes_through_all_layers() {
        let config = ServiceConfig {
            max_concurrent_invocations: 100,
            ..ServiceConfig::default()
        };
        let factory = InvocationFactory::new(std::sync::Arc::new(config.clone()));

        let svc = build_flow_pipeline(transfer_router(), &config);
        let inv = factory.invocation("transfer", Value::map().with("type", "international"));
        let resp = svc.oneshot(inv).await.unwrap();
        assert_eq!(resp.get("fee"), Some(&Value::Int(25)));
    }

    #[tokio::test(start_paused = true)]
    async fn stack_bounds_deferred_flows() {
        let config = ServiceConfig {
            default_timeout_ms: 20,
            max_concurrent_invocations: 1,
        };
        let factory = InvocationFactory::new(std::sync::Arc::new(config.clone()));

        let mut router = transfer_router();
        router.register(
            "settle",
            pipe![flowpipe_core::Stage::deferred(|r: Value| async move {
                tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                r
            })],
        );
        let mut svc = build_flow_pipeline(router, &config);

        let slow = ServiceExt::ready(&mut svc)
            .await
            .unwrap()
            .call(factory.invocation("settle", Value::map()));
        let shed = ServiceExt::ready(&mut svc)
            .await
            .unwrap()
            .call(factory.invocation("settle", Value::map()))
            .await
            .unwrap_err();
        assert!(matches!(shed, InvocationError::Overloaded { limit: 1 }));

        let timed_out = slow.await.unwrap_err();
        assert!(matches!(timed_out, InvocationError::Timeout { timeout_ms: 20, .. }));
    }

    #[tokio::test]
    async fn route_misses_reach_the_caller() {
        let config = ServiceConfig::default();
        let factory = InvocationFactory::new(std::sync::Arc::new(config.clone()));

        let svc = build_flow_pipeline(transfer_router(), &config);
        let inv = factory.invocation("transfer", Value::map().with("type", "unknown"));
        let err = svc.oneshot(inv).await.unwrap_err();
        assert!(matches!(
            err,
            InvocationError::Flow(FlowError::RouteNotFound { .. })
        ));
    }
}
