//! Built-in flows served by the `flowpipe` binary.

use std::time::Duration;

use flowpipe_core::{branch, pipe, Branch, BranchConfig, Pipeline, Routes, Stage, Value};

/// Name under which [`transfer_flow`] is registered.
pub const TRANSFER: &str = "transfer";

fn push_step(request: Value, step: &str) -> Value {
    let mut steps = request
        .get("steps")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    steps.push(Value::from(step));
    request.with("steps", steps)
}

/// Stage that appends `step` to the request's `steps` array.
pub fn record_step(step: &'static str) -> Stage<Value> {
    Stage::map(move |request: Value| push_step(request, step))
}

/// Deferred stage standing in for the clearing network: waits `delay`, then
/// records `settle_funds`. Everything after it in a pipeline runs in the
/// invocation's future, inside the service deadline.
pub fn settle_funds(delay: Duration) -> Stage<Value> {
    Stage::deferred(move |request: Value| async move {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        push_step(request, "settle_funds")
    })
}

#[must_use]
pub fn domestic_transfer(settlement: Duration) -> Pipeline<Value> {
    pipe![
        record_step("validate_accounts"),
        record_step("authorize_domestic"),
        record_step("transfer_domestic"),
        settle_funds(settlement),
        record_step("notify_parties"),
    ]
}

#[must_use]
pub fn international_transfer(settlement: Duration) -> Pipeline<Value> {
    pipe![
        record_step("validate_accounts"),
        record_step("authorize_international"),
        record_step("convert_currency"),
        record_step("transfer_international"),
        settle_funds(settlement),
        record_step("notify_parties"),
    ]
}

/// Routes a transfer request on its `type` property. Both paths settle
/// asynchronously after `settlement`.
#[must_use]
pub fn transfer_flow(settlement: Duration) -> Branch<Value> {
    branch(
        BranchConfig::new().on(
            "type",
            Routes::new()
                .when("domestic", domestic_transfer(settlement))
                .when("international", international_transfer(settlement)),
        ),
    )
}
