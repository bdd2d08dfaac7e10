//! # Pipeline
//! Wires pollers → queue → workers → store, plus the reporter loop, and owns
//! the shutdown order:
//!
//! 1. cancellation fires (externally)
//! 2. every poller returns
//! 3. the queue is closed
//! 4. workers drain what is buffered and return
//! 5. the reporter loop stops and one final report is emitted

use std::sync::Arc;

use metrics::counter;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::{clean_sources, PipelineConfig};
use crate::error::ConfigError;
use crate::ingest::{self, BoundedQueue, Fetcher, Post, SourcePoller};
use crate::stats::report::{report_once, run_reporter_loop};
use crate::stats::{AggregateStore, Reporter};

/// Fixed set of interchangeable consumers applying queued posts to the store.
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn spawn(
        size: usize,
        queue: BoundedQueue<Post>,
        store: Arc<AggregateStore>,
        cancel: CancellationToken,
    ) -> Self {
        let handles = (0..size)
            .map(|id| {
                tokio::spawn(run_worker(
                    id,
                    queue.clone(),
                    Arc::clone(&store),
                    cancel.clone(),
                ))
            })
            .collect();
        Self { handles }
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// Wait for every worker to return.
    pub async fn join(self) {
        for (id, h) in self.handles.into_iter().enumerate() {
            if let Err(e) = h.await {
                tracing::error!(worker = id, error = %e, "worker task failed");
            }
        }
    }
}

/// Apply posts until the queue is closed and empty, or until cancelled.
/// Buffered items win over cancellation, and are drained before exiting.
pub async fn run_worker(
    id: usize,
    queue: BoundedQueue<Post>,
    store: Arc<AggregateStore>,
    cancel: CancellationToken,
) {
    tracing::debug!(worker = id, "worker started");
    loop {
        tokio::select! {
            biased;
            item = queue.pop() => match item {
                Some(post) => apply(&store, post, id),
                None => break,
            },
            _ = cancel.cancelled() => {
                for post in queue.drain() {
                    apply(&store, post, id);
                }
                break;
            }
        }
    }
    tracing::debug!(worker = id, "worker stopping");
}

fn apply(store: &AggregateStore, post: Post, worker: usize) {
    tracing::trace!(worker, author = %post.author, title = %post.title, "apply");
    store.apply(post);
    counter!("tracker_posts_applied_total").increment(1);
}

/// Run the whole pipeline until `cancel` fires and everything has drained.
///
/// Fails only on configuration problems, before anything is spawned.
pub async fn run<S: AsRef<str>>(
    config: &PipelineConfig,
    sources: &[S],
    fetcher: Arc<dyn Fetcher>,
    store: Arc<AggregateStore>,
    reporter: Arc<dyn Reporter>,
    cancel: CancellationToken,
) -> Result<(), ConfigError> {
    let sources = clean_sources(sources.iter().map(|s| s.as_ref().to_string()));
    if sources.is_empty() {
        return Err(ConfigError::NoSources);
    }
    config.validate()?;
    ingest::ensure_metrics_described();

    tracing::info!(
        sources = ?sources,
        workers = config.workers,
        capacity = config.queue_capacity,
        "starting pipeline"
    );

    let queue = BoundedQueue::new(config.queue_capacity);

    let pollers: Vec<(String, JoinHandle<()>)> = sources
        .into_iter()
        .map(|source| {
            let poller = SourcePoller::new(
                source,
                Arc::clone(&fetcher),
                queue.clone(),
                config.poll_interval,
            );
            let source = poller.source().to_string();
            (source, poller.spawn(cancel.clone()))
        })
        .collect();

    let pool = WorkerPool::spawn(
        config.workers,
        queue.clone(),
        Arc::clone(&store),
        cancel.clone(),
    );
    tracing::debug!(workers = pool.size(), "worker pool started");

    // The reporter gets its own token so it keeps running until the drain is done.
    let reporter_stop = CancellationToken::new();
    let reporter_task = tokio::spawn(run_reporter_loop(
        Arc::clone(&store),
        Arc::clone(&reporter),
        config.report_interval,
        config.top_k,
        reporter_stop.clone(),
    ));

    for (source, handle) in pollers {
        if let Err(e) = handle.await {
            tracing::error!(source = %source, error = %e, "poller task failed");
        }
    }

    queue.close();
    pool.join().await;

    // A push can land after the workers' final drain; apply it here.
    let stragglers = queue.drain();
    if !stragglers.is_empty() {
        tracing::debug!(count = stragglers.len(), "applying stragglers");
        for post in stragglers {
            apply(&store, post, usize::MAX);
        }
    }

    reporter_stop.cancel();
    if let Err(e) = reporter_task.await {
        tracing::error!(error = %e, "reporter task failed");
    }
    report_once(&store, reporter.as_ref(), config.top_k).await;

    tracing::info!("pipeline stopped");
    Ok(())
}
