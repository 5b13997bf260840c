use serde::{Deserialize, Serialize};

/// Selects the `ObjectStore` backend (spec §6 `STORAGE_TYPE`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    #[default]
    Local,
    S3,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StorageType,
    /// Root directory for the local backend.
    #[serde(default = "d_root")]
    pub root: String,
    /// S3 bucket name, only meaningful when `backend = "s3"`. Concrete
    /// cloud backends are a spec Non-goal; selecting `s3` is accepted by
    /// config but rejected at store construction time.
    #[serde(default)]
    pub s3_bucket: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StorageType::default(),
            root: d_root(),
            s3_bucket: None,
        }
    }
}

fn d_root() -> String {
    "./data".into()
}
