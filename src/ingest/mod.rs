// src/ingest/mod.rs
pub mod poller;
pub mod providers;
pub mod queue;
pub mod ratelimit;
pub mod types;

use metrics::{describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;

pub use poller::SourcePoller;
pub use queue::BoundedQueue;
pub use ratelimit::{Decision, RateLimitAdvisor};
pub use types::{FetchResponse, FetchStatus, Fetcher, Post, ResponseMeta};

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "tracker_fetch_total",
            "Fetch attempts by outcome (ok, rate_limited, error)."
        );
        describe_histogram!("tracker_fetch_ms", "Fetch latency in milliseconds.");
        describe_counter!(
            "tracker_throttle_total",
            "Fetches followed by a low-budget throttle delay."
        );
        describe_counter!(
            "tracker_posts_enqueued_total",
            "Posts pushed onto the ingest queue."
        );
        describe_counter!(
            "tracker_posts_applied_total",
            "Posts applied to the aggregate store."
        );
        describe_gauge!("tracker_queue_depth", "Posts currently buffered.");
        describe_counter!("tracker_reports_total", "Reports produced.");
        describe_counter!("tracker_report_errors_total", "Reporter failures.");
        describe_gauge!("tracker_tracked_posts", "Distinct posts held in the store.");
        describe_gauge!("tracker_tracked_authors", "Distinct authors seen.");
    });
}
