// src/ingest/poller.rs
//! One poller per source: fetch on a fixed cadence, honour the advertised
//! rate limit, push results onto the shared queue.
//!
//! Cancellation is observed while waiting for a tick, while backing off,
//! while blocked on a full queue, and right after a fetch returns. An
//! in-flight fetch is never interrupted.

use std::{sync::Arc, time::Duration};

use metrics::{counter, histogram};
use tokio::{task::JoinHandle, time};
use tokio_util::sync::CancellationToken;

use crate::error::QueueError;
use crate::ingest::{
    queue::BoundedQueue,
    ratelimit::{Decision, RateLimitAdvisor},
    types::{Fetcher, Post},
};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// What the poller does after one fetch cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cycle {
    /// Wait for the next tick.
    Idle,
    /// Hold off this long first, then wait for the next tick.
    Backoff(Duration),
    /// Cancellation was observed (or the queue closed underneath us).
    Stop,
}

pub struct SourcePoller {
    source: String,
    fetcher: Arc<dyn Fetcher>,
    queue: BoundedQueue<Post>,
    advisor: RateLimitAdvisor,
    interval: Duration,
}

impl SourcePoller {
    pub fn new(
        source: impl Into<String>,
        fetcher: Arc<dyn Fetcher>,
        queue: BoundedQueue<Post>,
        interval: Duration,
    ) -> Self {
        Self {
            source: source.into(),
            fetcher,
            queue,
            advisor: RateLimitAdvisor::default(),
            interval,
        }
    }

    pub fn with_advisor(mut self, advisor: RateLimitAdvisor) -> Self {
        self.advisor = advisor;
        self
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }

    /// Poll until cancelled. The first fetch happens immediately.
    pub async fn run(self, cancel: CancellationToken) {
        tracing::info!(source = %self.source, fetcher = self.fetcher.name(), "poller started");

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            match self.poll_once(&cancel).await {
                Cycle::Idle => {}
                Cycle::Backoff(wait) => {
                    if !sleep_or_cancel(wait, &cancel).await {
                        break;
                    }
                }
                Cycle::Stop => break,
            }
        }

        tracing::info!(source = %self.source, "stopping poller");
    }

    /// One fetch → advise → push cycle.
    pub async fn poll_once(&self, cancel: &CancellationToken) -> Cycle {
        let t0 = std::time::Instant::now();
        let res = self.fetcher.fetch(&self.source).await;
        histogram!("tracker_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

        if cancel.is_cancelled() {
            return Cycle::Stop;
        }

        let resp = match res {
            Ok(resp) => resp,
            Err(e) => {
                counter!("tracker_fetch_total", "outcome" => "error").increment(1);
                tracing::warn!(source = %self.source, kind = e.kind(), error = %e, "fetch failed");
                return Cycle::Idle;
            }
        };

        let decision = self.advisor.advise(&resp.meta);
        if let Decision::RetryAfter(wait) = decision {
            counter!("tracker_fetch_total", "outcome" => "rate_limited").increment(1);
            tracing::warn!(
                source = %self.source,
                wait_secs = wait.as_secs(),
                "rate limit exceeded, backing off"
            );
            return Cycle::Backoff(wait);
        }

        counter!("tracker_fetch_total", "outcome" => "ok").increment(1);
        let fetched = resp.posts.len();
        for post in resp.posts {
            match self.queue.push(post, cancel).await {
                Ok(()) => counter!("tracker_posts_enqueued_total").increment(1),
                Err(QueueError::Cancelled) => return Cycle::Stop,
                Err(QueueError::Closed) => {
                    tracing::warn!(source = %self.source, "queue closed while pushing");
                    return Cycle::Stop;
                }
            }
        }
        tracing::debug!(source = %self.source, posts = fetched, "fetched");

        match decision {
            Decision::ThrottleTo(wait) => {
                counter!("tracker_throttle_total").increment(1);
                tracing::info!(
                    source = %self.source,
                    delay_ms = wait.as_millis() as u64,
                    "rate limiting: delaying next request"
                );
                Cycle::Backoff(wait)
            }
            _ => Cycle::Idle,
        }
    }
}

/// Sleep for `wait`; false if cancellation came first.
async fn sleep_or_cancel(wait: Duration, cancel: &CancellationToken) -> bool {
    if wait.is_zero() {
        return !cancel.is_cancelled();
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        _ = time::sleep(wait) => true,
    }
}
