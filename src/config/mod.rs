// src/config/mod.rs
//! Tracker configuration: TOML file (optional) + environment overrides.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

pub const ENV_CONFIG_PATH: &str = "TRACKER_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/tracker.toml";

fn default_sources() -> Vec<String> {
    vec!["programming".into(), "golang".into(), "technology".into()]
}
fn default_poll_interval_secs() -> u64 {
    10
}
fn default_report_interval_secs() -> u64 {
    30
}
fn default_queue_capacity() -> usize {
    100
}
fn default_workers() -> usize {
    4
}
fn default_top_k() -> usize {
    10
}
fn default_base_url() -> String {
    "https://www.reddit.com".to_string()
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_user_agent() -> String {
    concat!("subreddit-tracker/", env!("CARGO_PKG_VERSION")).to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedditConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for RedditConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerConfig {
    #[serde(default = "default_sources")]
    pub sources: Vec<String>,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_report_interval_secs")]
    pub report_interval_secs: u64,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default)]
    pub reddit: RedditConfig,
    /// e.g. "127.0.0.1:9090"; metrics are not served when unset.
    #[serde(default)]
    pub metrics_addr: Option<String>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            sources: default_sources(),
            poll_interval_secs: default_poll_interval_secs(),
            report_interval_secs: default_report_interval_secs(),
            queue_capacity: default_queue_capacity(),
            workers: default_workers(),
            top_k: default_top_k(),
            reddit: RedditConfig::default(),
            metrics_addr: None,
        }
    }
}

/// The subset of configuration the pipeline itself needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    pub poll_interval: Duration,
    pub report_interval: Duration,
    pub queue_capacity: usize,
    pub workers: usize,
    pub top_k: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        TrackerConfig::default().pipeline()
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::ZeroWorkers);
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::ZeroQueueCapacity);
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::ZeroInterval("poll interval"));
        }
        if self.report_interval.is_zero() {
            return Err(ConfigError::ZeroInterval("report interval"));
        }
        if self.top_k == 0 {
            return Err(ConfigError::ZeroTopK);
        }
        Ok(())
    }
}

impl TrackerConfig {
    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            report_interval: Duration::from_secs(self.report_interval_secs),
            queue_capacity: self.queue_capacity,
            workers: self.workers,
            top_k: self.top_k,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sources.is_empty() {
            return Err(ConfigError::NoSources);
        }
        self.pipeline().validate()
    }

    /// Load from an explicit TOML file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading tracker config from {}", path.display()))?;
        let mut cfg: TrackerConfig = toml::from_str(&content)
            .with_context(|| format!("parsing tracker config {}", path.display()))?;
        cfg.sources = clean_sources(cfg.sources);
        Ok(cfg)
    }

    /// Load using env var + fallbacks, then apply env overrides:
    /// 1) $TRACKER_CONFIG_PATH
    /// 2) config/tracker.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        let mut cfg = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from(&pb)?
        } else {
            let fallback = PathBuf::from(DEFAULT_CONFIG_PATH);
            if fallback.exists() {
                Self::load_from(&fallback)?
            } else {
                Self::default()
            }
        };
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(raw) = std::env::var("TRACKER_SOURCES") {
            self.sources = clean_sources(raw.split(',').map(str::to_string));
        }
        override_num("TRACKER_POLL_INTERVAL_SECS", &mut self.poll_interval_secs);
        override_num("TRACKER_REPORT_INTERVAL_SECS", &mut self.report_interval_secs);
        override_num("TRACKER_QUEUE_CAPACITY", &mut self.queue_capacity);
        override_num("TRACKER_WORKERS", &mut self.workers);
        override_num("TRACKER_TOP_K", &mut self.top_k);
        if let Ok(addr) = std::env::var("TRACKER_METRICS_ADDR") {
            let addr = addr.trim();
            self.metrics_addr = (!addr.is_empty()).then(|| addr.to_string());
        }
        if let Ok(url) = std::env::var("REDDIT_BASE_URL") {
            self.reddit.base_url = url;
        }
        if let Ok(ua) = std::env::var("REDDIT_USER_AGENT") {
            self.reddit.user_agent = ua;
        }
    }
}

fn override_num<T: std::str::FromStr>(var: &str, slot: &mut T) {
    let Ok(raw) = std::env::var(var) else {
        return;
    };
    match raw.trim().parse() {
        Ok(v) => *slot = v,
        Err(_) => tracing::warn!(var, value = %raw, "ignoring unparsable override"),
    }
}

/// Trim, drop empties, keep first occurrence of each name.
pub fn clean_sources<I: IntoIterator<Item = String>>(items: I) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for it in items {
        let t = it.trim();
        if !t.is_empty() && !out.iter().any(|s| s == t) {
            out.push(t.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_values() {
        let cfg = TrackerConfig::default();
        assert_eq!(cfg.sources, vec!["programming", "golang", "technology"]);
        let p = cfg.pipeline();
        assert_eq!(p.poll_interval, Duration::from_secs(10));
        assert_eq!(p.report_interval, Duration::from_secs(30));
        assert_eq!(p.queue_capacity, 100);
        assert_eq!(p.workers, 4);
        assert_eq!(p.top_k, 10);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg: TrackerConfig = toml::from_str(
            r#"
sources = ["rust"]
workers = 2

[reddit]
base_url = "http://127.0.0.1:8080"
"#,
        )
        .unwrap();
        assert_eq!(cfg.sources, vec!["rust"]);
        assert_eq!(cfg.workers, 2);
        assert_eq!(cfg.queue_capacity, 100);
        assert_eq!(cfg.reddit.base_url, "http://127.0.0.1:8080");
        assert_eq!(cfg.reddit.timeout_secs, 10);
    }

    #[test]
    fn sources_are_trimmed_and_deduped() {
        let v = clean_sources(vec![
            " rust ".to_string(),
            "".into(),
            "golang".into(),
            "rust".into(),
        ]);
        assert_eq!(v, vec!["rust".to_string(), "golang".to_string()]);
    }

    #[test]
    fn validation_rejects_degenerate_values() {
        let mut cfg = TrackerConfig {
            sources: vec![],
            ..TrackerConfig::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::NoSources));

        cfg.sources = vec!["rust".into()];
        cfg.workers = 0;
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroWorkers));

        cfg.workers = 1;
        cfg.queue_capacity = 0;
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroQueueCapacity));

        cfg.queue_capacity = 1;
        cfg.poll_interval_secs = 0;
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::ZeroInterval("poll interval"))
        );

        cfg.poll_interval_secs = 1;
        cfg.top_k = 0;
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroTopK));
    }
}
