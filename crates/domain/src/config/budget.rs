use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Per-model total context window, consulted by `MemoryWindow` (spec §4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetConfig {
    /// model name -> total token budget.
    #[serde(default)]
    pub models: HashMap<String, u32>,
    /// Used when a model is not present in `models`.
    #[serde(default = "d_default_total")]
    pub default_total_tokens: u32,
    /// Default `maxTokens` reservation for model output when the caller
    /// does not specify one.
    #[serde(default = "d_default_maxtokens")]
    pub default_maxtokens: u32,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            models: HashMap::new(),
            default_total_tokens: d_default_total(),
            default_maxtokens: d_default_maxtokens(),
        }
    }
}

impl BudgetConfig {
    pub fn total_for(&self, model: &str) -> u32 {
        self.models
            .get(model)
            .copied()
            .unwrap_or(self.default_total_tokens)
    }
}

fn d_default_total() -> u32 {
    128_000
}
fn d_default_maxtokens() -> u32 {
    1024
}
