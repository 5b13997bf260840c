use serde::{Deserialize, Serialize};

/// Structured-logging / tracing parameters (spec §4.8, §4.9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// `app_id` field in every RFC 5424 log line.
    #[serde(default = "d_app_id")]
    pub app_id: String,
    /// Participant rank order used by TraceVisualizer (spec §4.8).
    #[serde(default = "d_participant_rank")]
    pub participant_rank: Vec<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            app_id: d_app_id(),
            participant_rank: d_participant_rank(),
        }
    }
}

fn d_app_id() -> String {
    "agentrt".into()
}

fn d_participant_rank() -> Vec<String> {
    vec![
        "cli".into(),
        "agent".into(),
        "memory".into(),
        "llm".into(),
        "tool".into(),
        "graph".into(),
        "vector".into(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_participant_rank_matches_spec_order() {
        let cfg = ObservabilityConfig::default();
        assert_eq!(
            cfg.participant_rank,
            vec!["cli", "agent", "memory", "llm", "tool", "graph", "vector"]
        );
    }
}
