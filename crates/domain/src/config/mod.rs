mod budget;
mod observability;
mod retry;
mod store;
mod supervisor;

pub use budget::*;
pub use observability::*;
pub use retry::*;
pub use store::*;
pub use supervisor::*;

use serde::{Deserialize, Serialize};

/// Top-level runtime configuration, loaded via `toml::from_str`.
///
/// Loading/secret management is out of scope (spec §1 Non-goals) — this
/// struct only needs to deserialize; no CLI flags, no env layering beyond
/// `DEBUG`/`STORAGE_TYPE` (spec §6), which are read directly from the
/// process environment where needed rather than threaded through here.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub budget: BudgetConfig,
    #[serde(default)]
    pub supervisor: SupervisorConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
    #[serde(default)]
    pub retry: RetryConfig,
}
