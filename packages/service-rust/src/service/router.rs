//! Flow routing: dispatches `Invocation` to a registered flow by `flow_name`.

use std::collections::HashMap;
use std::task::{Context, Poll};

use flowpipe_core::{IntoStage, Stage};
use tower::Service;

use super::invocation::{Invocation, InvocationError, InvocationFuture};

// ---------------------------------------------------------------------------
// FlowRouter
// ---------------------------------------------------------------------------

/// Routes `Invocation` values to the correct flow by `flow_name`.
///
/// Each registered flow is a `Stage` (typically a `Pipeline` or a `Branch`)
/// keyed by its name. Invocations with an unregistered `flow_name` return
/// `InvocationError::UnknownFlow`; flow failures surface as
/// `InvocationError::Flow`.
///
/// Synchronous stages of a flow run inside `call`; only deferred work runs
/// in the returned future.
pub struct FlowRouter<T> {
    flows: HashMap<String, Stage<T>>,
}

impl<T: Send + 'static> FlowRouter<T> {
    /// Create a new empty router.
    #[must_use]
    pub fn new() -> Self {
        Self {
            flows: HashMap::new(),
        }
    }

    /// Register a flow under `name`, replacing any flow already registered there.
    pub fn register(&mut self, name: impl Into<String>, flow: impl IntoStage<T>) {
        let name = name.into();
        if self.flows.insert(name.clone(), flow.into_stage()).is_some() {
            tracing::warn!(flow = %name, "flow re-registered, previous flow replaced");
        }
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.flows.contains_key(name)
    }

    /// Registered flow names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.flows.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl<T: Send + 'static> Default for FlowRouter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for FlowRouter<T> {
    fn clone(&self) -> Self {
        Self {
            flows: self.flows.clone(),
        }
    }
}

impl<T: Send + 'static> Service<Invocation<T>> for FlowRouter<T> {
    type Response = T;
    type Error = InvocationError;
    type Future = InvocationFuture<T>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // Flows hold no resources; they are always ready.
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, inv: Invocation<T>) -> Self::Future {
        let Invocation { ctx, payload } = inv;
        match self.flows.get(&ctx.flow_name) {
            Some(flow) => {
                let step = flow.apply(payload);
                Box::pin(async move { step.await.map_err(InvocationError::from) })
            }
            None => Box::pin(async move {
                Err(InvocationError::UnknownFlow {
                    name: ctx.flow_name,
                })
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use flowpipe_core::{branch, pipe, BranchConfig, FlowError, Routes, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::service::invocation::InvocationContext;

    fn make_inv<T>(flow_name: &str, payload: T) -> Invocation<T> {
        Invocation::new(InvocationContext::new(1, flow_name, 5000), payload)
    }

    #[tokio::test]
    async fn routes_to_registered_flow() {
        let mut router = FlowRouter::new();
        router.register("double", pipe![|x: i64| x * 2]);

        let resp = router.oneshot(make_inv("double", 21)).await.unwrap();
        assert_eq!(resp, 42);
    }

    #[tokio::test]
    async fn unknown_flow_returns_error() {
        let mut router = FlowRouter::new();
        router.register("double", pipe![|x: i64| x * 2]);

        let err = router.oneshot(make_inv("nonexistent", 1)).await.unwrap_err();
        assert!(matches!(
            err,
            InvocationError::UnknownFlow { name } if name == "nonexistent"
        ));
    }

    #[tokio::test]
    async fn routes_to_correct_flow_among_multiple() {
        let mut router = FlowRouter::new();
        router.register("inc", pipe![|x: i64| x + 1]);
        router.register("dec", pipe![|x: i64| x - 1]);
        router.register("neg", pipe![|x: i64| -x]);

        let resp = ServiceExt::ready(&mut router)
            .await
            .unwrap()
            .call(make_inv("dec", 10))
            .await
            .unwrap();
        assert_eq!(resp, 9);

        let resp = ServiceExt::ready(&mut router)
            .await
            .unwrap()
            .call(make_inv("neg", 10))
            .await
            .unwrap();
        assert_eq!(resp, -10);

        assert_eq!(router.names(), vec!["dec", "inc", "neg"]);
    }

    #[tokio::test]
    async fn route_not_found_surfaces_as_flow_error() {
        let mut router = FlowRouter::new();
        router.register(
            "transfer",
            branch(BranchConfig::new().on("type", Routes::new().when("domestic", |v: Value| v))),
        );

        let err = router
            .oneshot(make_inv("transfer", Value::map().with("type", "crypto")))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            InvocationError::Flow(FlowError::RouteNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn re_registering_replaces_flow() {
        let mut router: FlowRouter<i64> = FlowRouter::new();
        router.register("f", pipe![|x: i64| x + 1]);
        router.register("f", pipe![|x: i64| x + 2]);
        assert!(router.contains("f"));
        assert_eq!(router.names(), vec!["f"]);

        let resp = router.oneshot(make_inv("f", 10)).await.unwrap();
        assert_eq!(resp, 12);
    }
}
