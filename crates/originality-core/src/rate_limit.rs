//! Per-index request pacing with governor instances.
//!
//! Each index query waits for its governor permit via `until_ready()`, which
//! spaces requests at the configured rate across every analysis sharing the
//! limiter. Pacing never turns into a retry: a 429 is surfaced as
//! [`IndexError::RateLimited`] and the index contributes zero results.

use std::collections::HashMap;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};

use crate::db::IndexError;

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Rate limiter for a single literature index.
pub struct IndexLimiter {
    limiter: DirectLimiter,
    period: Duration,
}

impl IndexLimiter {
    /// Create a limiter allowing one request per `period`.
    ///
    /// A zero period is clamped to one millisecond.
    pub fn new(period: Duration) -> Self {
        let period = period.max(Duration::from_millis(1));
        let quota = Quota::with_period(period).unwrap_or_else(|| Quota::per_second(nonzero(1)));
        Self {
            limiter: DirectLimiter::direct(quota),
            period,
        }
    }

    /// Create a limiter allowing `n` requests per second.
    pub fn per_second(n: u32) -> Self {
        Self::new(Duration::from_millis(1000 / n.max(1) as u64))
    }

    /// Wait until the limiter allows a request.
    pub async fn acquire(&self) {
        self.limiter.until_ready().await;
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

fn nonzero(n: u32) -> std::num::NonZeroU32 {
    std::num::NonZeroU32::new(n).unwrap_or(std::num::NonZeroU32::MIN)
}

/// Limiters for every remote index, keyed by index name.
pub struct RateLimiters {
    limiters: HashMap<&'static str, IndexLimiter>,
}

impl Default for RateLimiters {
    fn default() -> Self {
        Self::new(false)
    }
}

impl RateLimiters {
    pub fn new(has_s2_api_key: bool) -> Self {
        let mut limiters = HashMap::new();

        // arXiv asks for no more than one request every three seconds
        limiters.insert("arXiv", IndexLimiter::new(Duration::from_secs(3)));

        // Semantic Scholar: keyed 1/s, keyless shared pool ~1 per 3 s
        if has_s2_api_key {
            limiters.insert("Semantic Scholar", IndexLimiter::per_second(1));
        } else {
            limiters.insert(
                "Semantic Scholar",
                IndexLimiter::new(Duration::from_secs(3)),
            );
        }

        Self { limiters }
    }

    pub fn get(&self, index_name: &str) -> Option<&IndexLimiter> {
        self.limiters.get(index_name)
    }

    /// Wait for the named index's permit. Unknown indices are not paced.
    pub async fn acquire(&self, index_name: &str) {
        if let Some(limiter) = self.get(index_name) {
            limiter.acquire().await;
        }
    }
}

/// Check if an HTTP response is a 429 and extract Retry-After if present.
pub fn check_rate_limit_response(resp: &reqwest::Response) -> Result<(), IndexError> {
    if resp.status().as_u16() == 429 {
        let retry_after = resp
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after);
        Err(IndexError::RateLimited { retry_after })
    } else {
        Ok(())
    }
}

/// Parse a Retry-After header value (seconds or HTTP-date).
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    if let Ok(secs) = value.trim().parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    // HTTP-date: not worth a date parser, use a fixed conservative value
    if value.contains(',') || value.contains("GMT") {
        return Some(Duration::from_secs(5));
    }
    None
}
