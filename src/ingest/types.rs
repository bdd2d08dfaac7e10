// src/ingest/types.rs
use serde::{Deserialize, Serialize};

use crate::error::FetchError;

/// One post as observed on a source. Dedup identity is `(title, author)`, not `id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Post {
    pub id: String, // source-scoped, may repeat across sources
    pub title: String,
    pub author: String,
    #[serde(rename = "score")]
    pub upvotes: i64,
}

impl Post {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        author: impl Into<String>,
        upvotes: i64,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            author: author.into(),
            upvotes,
        }
    }

    /// True when both posts describe the same conceptual post.
    pub fn same_key(&self, other: &Post) -> bool {
        self.title == other.title && self.author == other.author
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchStatus {
    #[default]
    Ok,
    RateLimited,
}

/// Rate-limit metadata advertised alongside a fetch response.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ResponseMeta {
    pub status: FetchStatus,
    /// Remaining call budget in the current window.
    pub remaining: Option<f64>,
    /// Seconds until the budget resets.
    pub reset_seconds: Option<u64>,
}

impl ResponseMeta {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn rate_limited(reset_seconds: Option<u64>) -> Self {
        Self {
            status: FetchStatus::RateLimited,
            remaining: Some(0.0),
            reset_seconds,
        }
    }

    pub fn with_budget(mut self, remaining: f64, reset_seconds: u64) -> Self {
        self.remaining = Some(remaining);
        self.reset_seconds = Some(reset_seconds);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct FetchResponse {
    pub posts: Vec<Post>,
    pub meta: ResponseMeta,
}

impl FetchResponse {
    pub fn ok(posts: Vec<Post>, meta: ResponseMeta) -> Self {
        Self { posts, meta }
    }

    /// A 429-style answer. Carries no posts.
    pub fn rate_limited(reset_seconds: Option<u64>) -> Self {
        Self {
            posts: Vec::new(),
            meta: ResponseMeta::rate_limited(reset_seconds),
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        self.meta.status == FetchStatus::RateLimited
    }
}

/// Pulls the latest posts for one source. Rate limiting is reported through
/// `ResponseMeta`, never as an `Err`.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, source: &str) -> Result<FetchResponse, FetchError>;
    fn name(&self) -> &'static str;
}
