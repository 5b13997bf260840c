//! Retry (spec §4.10): retries a retryable failure with jittered
//! exponential backoff, grounded on the teacher's `node_sdk::reconnect::
//! ReconnectBackoff` (same hash-based jitter, no `rand` dependency).

use std::future::Future;
use std::time::Duration;

use agentrt_domain::config::RetryConfig;
use agentrt_domain::{Error, Result};

const RETRYABLE_MESSAGE_PATTERNS: &[&str] = &[
    "network",
    "timeout",
    "econnrefused",
    "econnreset",
    "etimedout",
    "unavailable",
    "fetch failed",
    "unexpected eof",
];

const RETRYABLE_HTTP_STATUSES: &[u16] = &[429, 499, 500, 502, 503, 504];

/// True if a thrown error's (lowercased) message matches one of spec
/// §4.10's retryable patterns, including an embedded `http <status>`.
pub fn is_retryable_error(err: &Error) -> bool {
    let msg = err.to_string().to_lowercase();
    if RETRYABLE_MESSAGE_PATTERNS.iter().any(|p| msg.contains(p)) {
        return true;
    }
    RETRYABLE_HTTP_STATUSES.iter().any(|code| msg.contains(&format!("http {code}")))
}

pub fn is_retryable_status(status: u16) -> bool {
    RETRYABLE_HTTP_STATUSES.contains(&status)
}

/// Runs a fallible async operation, retrying retryable failures with
/// jittered exponential backoff (spec §4.10).
#[derive(Debug, Clone)]
pub struct Retry {
    config: RetryConfig,
}

impl Retry {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Invokes `call` until it returns a non-retryable outcome. Retries up
    /// to `config.retries` times; once exhausted, the last failure is
    /// returned (rethrown, in spec terms).
    pub async fn execute<T, Fut>(&self, mut call: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < self.config.retries && is_retryable_error(&err) => {
                    tokio::time::sleep(self.delay_for_attempt(attempt)).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// As `execute`, but for calls whose *success* value can itself signal
    /// a retryable HTTP status (spec §4.10: "returned responses with
    /// `status ∈ {429,499,500,502,503,504}`"). Once retries are exhausted,
    /// the last response is returned as `Ok`, matching "returns the last
    /// failed response (for HTTP)".
    pub async fn execute_response<T, Fut>(&self, mut call: impl FnMut() -> Fut, status_of: impl Fn(&T) -> u16) -> Result<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            let outcome = call().await;
            let should_retry = attempt < self.config.retries
                && match &outcome {
                    Ok(response) => is_retryable_status(status_of(response)),
                    Err(err) => is_retryable_error(err),
                };
            if !should_retry {
                return outcome;
            }
            tokio::time::sleep(self.delay_for_attempt(attempt)).await;
            attempt += 1;
        }
    }

    /// `delay·2^attempt + uniform(0, 0.3·delay·2^attempt)` (spec §4.10).
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.config.initial_delay_ms as f64 * 2f64.powi(attempt as i32);
        let jitter = base * 0.3 * jitter_fraction(attempt);
        Duration::from_millis((base + jitter).round() as u64)
    }
}

/// Cheap deterministic "random" fraction in `[0, 1)`, the same
/// multiplicative-hash trick the teacher uses for reconnect jitter — no
/// need for a `rand` dependency just to spread retry storms.
fn jitter_fraction(attempt: u32) -> f64 {
    let hash = attempt.wrapping_mul(2654435761);
    (hash as f64) / (u32::MAX as f64)
}
