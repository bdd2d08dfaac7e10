// tests/common/mod.rs
// Shared mocks for the pipeline integration tests.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use subreddit_tracker::ingest::types::{FetchResponse, Fetcher, ResponseMeta};
use subreddit_tracker::{FetchError, Post, Report, Reporter};
use tokio::time::Instant;

pub fn post(title: &str, author: &str, upvotes: i64) -> Post {
    Post::new(format!("{title}/{author}"), title, author, upvotes)
}

/// Replays a per-source script of responses; once a script runs out it
/// answers with an empty, healthy response.
#[derive(Default)]
pub struct ScriptedFetcher {
    scripts: Mutex<HashMap<String, VecDeque<Result<FetchResponse, FetchError>>>>,
    calls: Mutex<Vec<(String, Instant)>>,
    latency: Duration,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn script(self, source: &str, steps: Vec<Result<FetchResponse, FetchError>>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(source.to_string(), steps.into());
        self
    }

    pub fn calls(&self) -> Vec<(String, Instant)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_times(&self, source: &str) -> Vec<Instant> {
        self.calls()
            .into_iter()
            .filter(|(s, _)| s == source)
            .map(|(_, t)| t)
            .collect()
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, source: &str) -> Result<FetchResponse, FetchError> {
        self.calls
            .lock()
            .unwrap()
            .push((source.to_string(), Instant::now()));
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let next = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(source)
            .and_then(|q| q.pop_front());
        next.unwrap_or_else(|| Ok(FetchResponse::ok(Vec::new(), ResponseMeta::ok())))
    }

    fn name(&self) -> &'static str {
        "Scripted"
    }
}

/// Keeps every report it is handed.
#[derive(Default)]
pub struct RecordingReporter {
    pub reports: Mutex<Vec<Report>>,
    pub fail: bool,
}

impl RecordingReporter {
    pub fn failing() -> Self {
        Self {
            reports: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn last(&self) -> Option<Report> {
        self.reports.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Reporter for RecordingReporter {
    async fn report(&self, report: &Report) -> Result<()> {
        self.reports.lock().unwrap().push(report.clone());
        if self.fail {
            anyhow::bail!("sink unavailable");
        }
        Ok(())
    }
}

/// Takes a report and never comes back.
#[derive(Default)]
pub struct StuckReporter {
    calls: AtomicUsize,
}

impl StuckReporter {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Reporter for StuckReporter {
    async fn report(&self, _report: &Report) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }
}
