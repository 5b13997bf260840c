//! The `ObjectStore` external interface (spec §6) and a local filesystem
//! reference backend.

mod local;

pub use local::LocalObjectStore;

use async_trait::async_trait;
use serde_json::Value;

use agentrt_domain::Result;

/// The parsed shape `get` returns, depending on the key's extension
/// (spec §6: `get` auto-parses `*.json` as a single object and `*.jsonl`
/// as an array of objects; anything else is returned raw).
#[derive(Debug, Clone)]
pub enum StoreValue {
    Raw(Vec<u8>),
    Json(Value),
    JsonLines(Vec<Value>),
}

impl StoreValue {
    pub fn as_json_lines(&self) -> Option<&[Value]> {
        match self {
            StoreValue::JsonLines(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_raw_string(&self) -> Option<String> {
        match self {
            StoreValue::Raw(bytes) => String::from_utf8(bytes.clone()).ok(),
            _ => None,
        }
    }
}

/// Keyed blob CRUD + prefix listing + bucket lifecycle (spec §6).
///
/// `append` always terminates the written string with a newline — callers
/// must not supply one (spec testable property 2).
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, body: &[u8]) -> Result<()>;

    /// Returns `StoreValue::Raw(Vec::new())` semantics are extension-driven:
    /// a missing `*.json` parses as an empty JSON object, a missing
    /// `*.jsonl` parses as an empty array, anything else as empty bytes.
    async fn get(&self, key: &str) -> Result<StoreValue>;

    async fn append(&self, key: &str, line: &str) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;

    async fn exists(&self, key: &str) -> Result<bool>;

    /// All keys, ordered by modification time ascending.
    async fn list(&self) -> Result<Vec<String>>;

    async fn find_by_prefix(&self, prefix: &str) -> Result<Vec<String>>;

    async fn find_by_extension(&self, ext: &str) -> Result<Vec<String>>;

    /// Missing keys are silently omitted from the result (spec §7: "missing
    /// object-store objects on `get` via `getMany` (silently omitted)").
    async fn get_many(&self, keys: &[String]) -> Result<Vec<(String, StoreValue)>> {
        let mut out = Vec::with_capacity(keys.len());
        for key in keys {
            match self.get(key).await {
                Ok(v) => out.push((key.clone(), v)),
                Err(agentrt_domain::Error::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(out)
    }

    async fn ensure_bucket(&self) -> Result<()>;

    async fn bucket_exists(&self) -> Result<bool>;

    async fn is_healthy(&self) -> Result<bool>;

    /// Resolve a key (or the store root, if `key` is `None`) to a
    /// backend-specific path string, for diagnostics.
    fn path(&self, key: Option<&str>) -> String;
}
