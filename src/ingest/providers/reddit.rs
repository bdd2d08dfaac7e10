// src/ingest/providers/reddit.rs
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{header::HeaderMap, Client, StatusCode};
use serde::Deserialize;

use crate::config::RedditConfig;
use crate::error::FetchError;
use crate::ingest::types::{FetchResponse, Fetcher, Post, ResponseMeta};

const HEADER_REMAINING: &str = "x-ratelimit-remaining";
const HEADER_RESET: &str = "x-ratelimit-reset";

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: Post,
}

/// Fetches `/r/{source}/new.json` from Reddit (or anything speaking the same JSON).
#[derive(Debug, Clone)]
pub struct RedditClient {
    client: Client,
    base_url: String,
}

impl RedditClient {
    pub fn new(cfg: &RedditConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .user_agent(cfg.user_agent.clone())
            .build()
            .context("building reddit http client")?;
        Ok(Self {
            client,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn listing_url(&self, source: &str) -> String {
        format!("{}/r/{}/new.json", self.base_url, source)
    }
}

#[async_trait]
impl Fetcher for RedditClient {
    async fn fetch(&self, source: &str) -> Result<FetchResponse, FetchError> {
        let url = self.listing_url(source);
        tracing::debug!(%url, "fetching");

        let resp = self.client.get(&url).send().await?;
        let status = resp.status();
        let meta = parse_rate_limit_headers(resp.headers());

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Ok(FetchResponse::rate_limited(meta.reset_seconds));
        }
        if !status.is_success() {
            return Err(FetchError::UnexpectedStatus(status.as_u16()));
        }

        let body = resp.text().await?;
        let posts = decode_listing(&body)?;
        Ok(FetchResponse::ok(posts, meta))
    }

    fn name(&self) -> &'static str {
        "Reddit"
    }
}

/// Decode a listing body into posts, in listing order.
pub fn decode_listing(body: &str) -> Result<Vec<Post>, FetchError> {
    let listing: Listing = serde_json::from_str(body)?;
    Ok(listing.data.children.into_iter().map(|c| c.data).collect())
}

/// Read the advertised budget. Anything missing or malformed becomes `None`.
pub fn parse_rate_limit_headers(headers: &HeaderMap) -> ResponseMeta {
    let get = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
    };

    let remaining = get(HEADER_REMAINING)
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|r| r.is_finite());
    let reset_seconds = get(HEADER_RESET)
        .and_then(|s| s.parse::<f64>().ok())
        // Values past u64 would saturate on the cast; treat them as garbage.
        .filter(|r| r.is_finite() && *r >= 0.0 && *r < u64::MAX as f64)
        .map(|r| r as u64);

    ResponseMeta {
        remaining,
        reset_seconds,
        ..ResponseMeta::ok()
    }
}
