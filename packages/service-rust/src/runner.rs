//! Line-oriented runner: one JSON request in, one JSON outcome out.

use std::future::Future;

use anyhow::Context;
use flowpipe_core::Value;
use futures_util::stream::{FuturesOrdered, StreamExt};
use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::task::JoinError;
use tower::{Service, ServiceExt};

use crate::service::{Invocation, InvocationError, InvocationFactory};

/// Per-line result written to the output stream.
#[derive(Debug, Serialize)]
struct Outcome {
    line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    call_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ok: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Counts of processed lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub succeeded: usize,
    pub failed: usize,
}

/// Route every non-blank line of `reader` through `flow` and write one
/// outcome line per request to `writer`, in input order.
///
/// Up to `concurrency` requests are in flight at once, each on its own task,
/// so the service's deadline and load-shed layers see real overlap. Request
/// failures (invalid JSON, route misses, stage errors, timeouts, shed
/// requests) are reported in the output and counted; only I/O errors and
/// panicked request tasks abort the run.
///
/// # Errors
///
/// Returns an error if reading, writing or readiness polling fails, or if a
/// request task panics.
pub async fn run_lines<S, R, W>(
    svc: &mut S,
    factory: &InvocationFactory,
    flow: &str,
    concurrency: usize,
    reader: R,
    writer: &mut W,
) -> anyhow::Result<RunSummary>
where
    S: Service<Invocation<Value>, Response = Value, Error = InvocationError>,
    S::Future: Send + 'static,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let window = concurrency.max(1);
    let mut summary = RunSummary::default();
    let mut in_flight = FuturesOrdered::new();
    let mut lines = reader.lines();
    let mut line_no = 0;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }

        let task = match serde_json::from_str::<serde_json::Value>(&line) {
            Ok(json) => {
                let inv = factory.invocation(flow, Value::from(json));
                let call_id = inv.ctx().call_id;
                let response = svc.ready().await?.call(inv);
                tokio::spawn(settle(line_no, call_id, response))
            }
            Err(err) => {
                let outcome = Outcome {
                    line: line_no,
                    call_id: None,
                    ok: None,
                    error: Some(format!("invalid JSON: {err}")),
                };
                tokio::spawn(async move { outcome })
            }
        };
        in_flight.push_back(task);

        if in_flight.len() >= window {
            if let Some(joined) = in_flight.next().await {
                emit(joined, &mut summary, writer).await?;
            }
        }
    }

    while let Some(joined) = in_flight.next().await {
        emit(joined, &mut summary, writer).await?;
    }

    writer.flush().await?;
    Ok(summary)
}

async fn settle<F>(line: usize, call_id: u64, response: F) -> Outcome
where
    F: Future<Output = Result<Value, InvocationError>>,
{
    match response.await {
        Ok(value) => Outcome {
            line,
            call_id: Some(call_id),
            ok: Some(serde_json::Value::from(value)),
            error: None,
        },
        Err(err) => {
            tracing::debug!(line, call_id, error = %err, "request failed");
            Outcome {
                line,
                call_id: Some(call_id),
                ok: None,
                error: Some(err.to_string()),
            }
        }
    }
}

async fn emit<W>(
    joined: Result<Outcome, JoinError>,
    summary: &mut RunSummary,
    writer: &mut W,
) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let outcome = joined.context("request task panicked")?;
    if outcome.error.is_some() {
        summary.failed += 1;
    } else {
        summary.succeeded += 1;
    }

    let mut encoded = serde_json::to_vec(&outcome)?;
    encoded.push(b'\n');
    writer.write_all(&encoded).await?;
    Ok(())
}
