//! # Rate-limit advisor
//! Pure mapping from a response's advertised budget to how long the poller
//! should hold off before its next fetch. No I/O, no clocks.

use std::time::Duration;

use crate::ingest::types::{FetchStatus, ResponseMeta};

/// Below this many remaining calls we start spreading requests out.
pub const SAFETY_BUFFER: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Proceed,
    /// Rate-limited: results are invalid, wait before the next attempt.
    RetryAfter(Duration),
    /// Fetch succeeded but the budget is low: delay the next attempt.
    ThrottleTo(Duration),
}

#[derive(Debug, Clone, Copy)]
pub struct RateLimitAdvisor {
    safety_buffer: f64,
}

impl Default for RateLimitAdvisor {
    fn default() -> Self {
        Self {
            safety_buffer: SAFETY_BUFFER,
        }
    }
}

impl RateLimitAdvisor {
    pub fn with_safety_buffer(safety_buffer: f64) -> Self {
        Self { safety_buffer }
    }

    pub fn advise(&self, meta: &ResponseMeta) -> Decision {
        if meta.status == FetchStatus::RateLimited {
            let wait = meta.reset_seconds.unwrap_or(0);
            return Decision::RetryAfter(Duration::from_secs(wait));
        }

        let (Some(remaining), Some(reset)) = (meta.remaining, meta.reset_seconds) else {
            return Decision::Proceed;
        };
        if !remaining.is_finite() || remaining >= self.safety_buffer {
            return Decision::Proceed;
        }

        // Spread what is left over the reset window; +1 keeps remaining=0 finite.
        let remaining = remaining.max(0.0);
        let secs = reset as f64 / (remaining + 1.0);
        // Never longer than the whole window, even when the float rounds past u64.
        let wait = Duration::try_from_secs_f64(secs)
            .map_or(Duration::from_secs(reset), |d| d.min(Duration::from_secs(reset)));
        Decision::ThrottleTo(wait)
    }
}
