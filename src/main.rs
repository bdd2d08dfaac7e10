//! Subreddit tracker binary entrypoint.
//! Loads config, wires the Reddit fetcher and log reporter into the pipeline,
//! and runs until SIGINT/SIGTERM.

use std::process::ExitCode;
use std::sync::Arc;

use subreddit_tracker::ingest::providers::RedditClient;
use subreddit_tracker::metrics::Metrics;
use subreddit_tracker::{pipeline, AggregateStore, LogReporter, TrackerConfig};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Compact logs by default; `TRACKER_LOG_JSON=1` switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("subreddit_tracker=info,warn"));

    let json = std::env::var("TRACKER_LOG_JSON")
        .ok()
        .is_some_and(|v| v == "1");

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

/// Cancel `token` on Ctrl-C, or SIGTERM on unix.
fn spawn_signal_handler(token: CancellationToken) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            match signal(SignalKind::terminate()) {
                Ok(mut term) => {
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => {}
                        _ = term.recv() => {}
                    }
                }
                Err(e) => {
                    tracing::warn!("SIGTERM handler unavailable: {e}");
                    let _ = tokio::signal::ctrl_c().await;
                }
            }
        }
        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
        }
        tracing::info!("shutting down...");
        token.cancel();
    });
}

async fn run_app(cfg: TrackerConfig) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    spawn_signal_handler(cancel.clone());

    let metrics_task = match cfg.metrics_addr.clone() {
        Some(addr) => {
            let metrics = Metrics::init()?;
            let token = cancel.clone();
            Some(tokio::spawn(async move {
                if let Err(e) = metrics.serve(&addr, token).await {
                    tracing::error!("metrics endpoint failed: {e:#}");
                }
            }))
        }
        None => None,
    };

    let fetcher = Arc::new(RedditClient::new(&cfg.reddit)?);
    let store = Arc::new(AggregateStore::new());

    pipeline::run(
        &cfg.pipeline(),
        &cfg.sources,
        fetcher,
        store,
        Arc::new(LogReporter),
        cancel.clone(),
    )
    .await?;

    // Pipeline only returns after cancellation, so the server is already stopping.
    if let Some(task) = metrics_task {
        let _ = task.await;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();
    tracing::info!("starting subreddit tracker");

    let cfg = match TrackerConfig::load_default() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("failed to load config: {e:#}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = cfg.validate() {
        tracing::error!("invalid config: {e}");
        return ExitCode::FAILURE;
    }

    if let Err(e) = run_app(cfg).await {
        tracing::error!("tracker failed: {e:#}");
        return ExitCode::FAILURE;
    }

    tracing::info!("application stopped");
    ExitCode::SUCCESS
}
