use serde::{Deserialize, Serialize};

/// Process supervision parameters (spec §4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorConfig {
    #[serde(default = "d_min_restart_delay_ms")]
    pub min_restart_delay_ms: u64,
    #[serde(default = "d_max_restart_delay_ms")]
    pub max_restart_delay_ms: u64,
    #[serde(default = "d_backoff_multiplier")]
    pub backoff_multiplier: f64,
    #[serde(default = "d_stop_timeout_ms")]
    pub stop_timeout_ms: u64,
    #[serde(default = "d_log_max_file_size")]
    pub log_max_file_size: u64,
    #[serde(default = "d_log_max_files")]
    pub log_max_files: usize,
    #[serde(default = "d_log_writer_respawn_delay_ms")]
    pub log_writer_respawn_delay_ms: u64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            min_restart_delay_ms: d_min_restart_delay_ms(),
            max_restart_delay_ms: d_max_restart_delay_ms(),
            backoff_multiplier: d_backoff_multiplier(),
            stop_timeout_ms: d_stop_timeout_ms(),
            log_max_file_size: d_log_max_file_size(),
            log_max_files: d_log_max_files(),
            log_writer_respawn_delay_ms: d_log_writer_respawn_delay_ms(),
        }
    }
}

fn d_min_restart_delay_ms() -> u64 {
    100
}
fn d_max_restart_delay_ms() -> u64 {
    5000
}
fn d_backoff_multiplier() -> f64 {
    2.0
}
fn d_stop_timeout_ms() -> u64 {
    3000
}
fn d_log_max_file_size() -> u64 {
    1_000_000
}
fn d_log_max_files() -> usize {
    10
}
fn d_log_writer_respawn_delay_ms() -> u64 {
    100
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = SupervisorConfig::default();
        assert_eq!(cfg.min_restart_delay_ms, 100);
        assert_eq!(cfg.max_restart_delay_ms, 5000);
        assert_eq!(cfg.backoff_multiplier, 2.0);
        assert_eq!(cfg.stop_timeout_ms, 3000);
        assert_eq!(cfg.log_max_file_size, 1_000_000);
        assert_eq!(cfg.log_max_files, 10);
    }
}
