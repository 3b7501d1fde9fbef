use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use flowpipe_service::flows::{self, TRANSFER};
use flowpipe_service::runner::run_lines;
use flowpipe_service::{build_flow_pipeline, FlowRouter, InvocationFactory, ServiceConfig};
use tokio::io::{AsyncBufRead, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Route newline-delimited JSON transfer requests through a flowpipe flow", long_about = None)]
struct Cli {
    /// File with one JSON request per line; reads stdin when omitted
    input: Option<PathBuf>,

    /// Per-request timeout in milliseconds
    #[arg(long, env = "FLOWPIPE_TIMEOUT_MS", default_value_t = 30_000)]
    timeout_ms: u64,

    /// Maximum number of in-flight requests; requests beyond it are shed
    #[arg(long, env = "FLOWPIPE_MAX_CONCURRENT", default_value_t = 1000)]
    max_concurrent: u32,

    /// Number of requests the runner sends without waiting for earlier ones
    #[arg(long, env = "FLOWPIPE_CONCURRENCY", default_value_t = 16)]
    concurrency: usize,

    /// Simulated settlement latency of each transfer, in milliseconds
    #[arg(long, env = "FLOWPIPE_SETTLEMENT_DELAY_MS", default_value_t = 0)]
    settlement_delay_ms: u64,

    /// Emit logs as JSON
    #[arg(long, env = "FLOWPIPE_LOG_JSON")]
    log_json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config = Arc::new(ServiceConfig {
        default_timeout_ms: cli.timeout_ms,
        max_concurrent_invocations: cli.max_concurrent,
    });

    let mut router = FlowRouter::new();
    router.register(
        TRANSFER,
        flows::transfer_flow(Duration::from_millis(cli.settlement_delay_ms)),
    );
    let mut svc = build_flow_pipeline(router, &config);
    let factory = InvocationFactory::new(Arc::clone(&config));

    let reader: Box<dyn AsyncBufRead + Unpin> = match &cli.input {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("failed to open {}", path.display()))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };

    let mut stdout = tokio::io::stdout();
    let summary = run_lines(
        &mut svc,
        &factory,
        TRANSFER,
        cli.concurrency,
        reader,
        &mut stdout,
    )
    .await?;
    info!(
        succeeded = summary.succeeded,
        failed = summary.failed,
        "all requests processed"
    );
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
