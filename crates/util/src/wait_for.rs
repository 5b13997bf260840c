//! `waitFor` (spec §4.10): polls a condition with growing backoff.

use std::future::Future;
use std::time::Duration;

use agentrt_domain::{Error, Result};

#[derive(Debug, Clone)]
pub struct WaitForConfig {
    pub timeout: Duration,
    pub interval: Duration,
    pub max_interval: Duration,
}

impl Default for WaitForConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(10),
        }
    }
}

/// Polls `check()` until it returns `true`. On each miss, waits `interval`
/// then grows it by `1.5x`, capped at `max_interval`. Errors with
/// `Error::Other` on timeout (spec §4.10).
pub async fn wait_for<Fut>(mut check: impl FnMut() -> Fut, config: WaitForConfig) -> Result<()>
where
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + config.timeout;
    let mut interval = config.interval;

    loop {
        if check().await {
            return Ok(());
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(Error::Other("waitFor timed out".into()));
        }
        tokio::time::sleep(interval).await;
        interval = Duration::from_secs_f64((interval.as_secs_f64() * 1.5).min(config.max_interval.as_secs_f64()));
    }
}
