use serde::{Deserialize, Serialize};

/// Retry/backoff defaults (spec §4.10).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "d_retries")]
    pub retries: u32,
    #[serde(default = "d_initial_delay_ms")]
    pub initial_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            retries: d_retries(),
            initial_delay_ms: d_initial_delay_ms(),
        }
    }
}

fn d_retries() -> u32 {
    10
}
fn d_initial_delay_ms() -> u64 {
    1000
}
