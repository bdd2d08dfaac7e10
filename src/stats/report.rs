use std::{sync::Arc, time::Duration};

use anyhow::Result;
use chrono::{DateTime, Utc};
use metrics::{counter, gauge};
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::ingest::types::Post;
use crate::stats::store::{AggregateStore, Snapshot};

pub const DEFAULT_TOP_K: usize = 10;
pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(30);
/// Upper bound on a single `Reporter::report` call.
pub const REPORT_TIMEOUT: Duration = Duration::from_secs(5);

/// Ranked view of the store handed to a [`Reporter`].
#[derive(Debug, Clone)]
pub struct Report {
    pub top_users: Vec<(String, u64)>,
    pub top_posts: Vec<Post>,
    pub total_authors: usize,
    pub tracked_posts: usize,
    pub generated_at: DateTime<Utc>,
}

impl Report {
    pub fn from_snapshot(snapshot: &Snapshot, top_k: usize) -> Self {
        Self {
            top_users: snapshot.top_users(),
            top_posts: snapshot.top_posts(top_k).to_vec(),
            total_authors: snapshot.user_posts.len(),
            tracked_posts: snapshot.top_posts.len(),
            generated_at: snapshot.taken_at,
        }
    }
}

#[async_trait::async_trait]
pub trait Reporter: Send + Sync {
    async fn report(&self, report: &Report) -> Result<()>;
}

/// Writes reports to the tracing log.
#[derive(Debug, Default, Clone)]
pub struct LogReporter;

#[async_trait::async_trait]
impl Reporter for LogReporter {
    async fn report(&self, report: &Report) -> Result<()> {
        tracing::info!(
            authors = report.total_authors,
            tracked = report.tracked_posts,
            "Top users by posts:"
        );
        for (author, n) in &report.top_users {
            tracing::info!("{author}: {n} posts");
        }

        tracing::info!("Top posts by upvotes:");
        for p in &report.top_posts {
            tracing::info!("  {} by {} ({} upvotes)", p.title, p.author, p.upvotes);
        }
        Ok(())
    }
}

/// Snapshot the store and hand a report to `reporter`. Errors and calls that
/// outlive [`REPORT_TIMEOUT`] are logged only.
pub async fn report_once(store: &AggregateStore, reporter: &dyn Reporter, top_k: usize) {
    let report = Report::from_snapshot(&store.snapshot(), top_k);

    gauge!("tracker_tracked_posts").set(report.tracked_posts as f64);
    gauge!("tracker_tracked_authors").set(report.total_authors as f64);
    counter!("tracker_reports_total").increment(1);

    match time::timeout(REPORT_TIMEOUT, reporter.report(&report)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            counter!("tracker_report_errors_total").increment(1);
            tracing::warn!("report failed: {e:#}");
        }
        Err(_) => {
            counter!("tracker_report_errors_total").increment(1);
            tracing::warn!(timeout = ?REPORT_TIMEOUT, "report timed out");
        }
    }
}

/// Report on a fixed cadence until `cancel` fires. The first report is one
/// full interval after start.
pub async fn run_reporter_loop(
    store: Arc<AggregateStore>,
    reporter: Arc<dyn Reporter>,
    interval: Duration,
    top_k: usize,
    cancel: CancellationToken,
) {
    let mut ticker = time::interval_at(time::Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }
        // A slow reporter only holds up this loop; the store is never locked here.
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = report_once(&store, reporter.as_ref(), top_k) => {}
        }
    }
    tracing::debug!("reporter loop stopped");
}
