//! IndexBase (spec §4.1): a persistent, append-only, deduplicated
//! key→record map over an `ObjectStore`.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;

use agentrt_domain::{Error, Result};
use agentrt_store::ObjectStore;

/// What every record an `IndexBase` stores must expose.
pub trait IndexedItem: Serialize + DeserializeOwned + Clone + Send + Sync {
    /// Dedup key — the identifier's string form.
    fn id(&self) -> String;
    /// Token count consulted by the `max_tokens` budget filter. `None`
    /// means the identifier is missing its `tokens` field.
    fn tokens(&self) -> Option<u32>;
}

#[derive(Debug, Clone, Default)]
pub struct QueryFilter {
    pub prefix: Option<String>,
    pub limit: Option<usize>,
    pub max_tokens: Option<u32>,
}

impl QueryFilter {
    pub fn prefix(mut self, p: impl Into<String>) -> Self {
        self.prefix = Some(p.into());
        self
    }
    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }
    pub fn max_tokens(mut self, n: u32) -> Self {
        self.max_tokens = Some(n);
        self
    }
}

struct Inner<T> {
    loaded: bool,
    /// Insertion order of ids, first-occurrence order preserved across
    /// latest-wins updates (only the value changes on re-add).
    order: Vec<String>,
    records: HashMap<String, T>,
}

impl<T> Inner<T> {
    fn new() -> Self {
        Self {
            loaded: false,
            order: Vec::new(),
            records: HashMap::new(),
        }
    }
}

/// Generic append-only JSONL index over an `ObjectStore`.
pub struct IndexBase<T: IndexedItem> {
    store: Arc<dyn ObjectStore>,
    index_key: String,
    inner: RwLock<Inner<T>>,
}

impl<T: IndexedItem> IndexBase<T> {
    pub fn new(store: Arc<dyn ObjectStore>, index_key: impl Into<String>) -> Self {
        Self {
            store,
            index_key: index_key.into(),
            inner: RwLock::new(Inner::new()),
        }
    }

    /// Lazily loads the backing object the first time it's needed.
    /// A no-op on every subsequent call (spec §4.1 idempotence).
    pub async fn load_data(&self) -> Result<()> {
        {
            let inner = self.inner.read();
            if inner.loaded {
                return Ok(());
            }
        }

        let value = self.store.get(&self.index_key).await?;
        let lines = value.as_json_lines().unwrap_or(&[]);

        let mut inner = self.inner.write();
        if inner.loaded {
            return Ok(());
        }
        for line in lines {
            let item: T = serde_json::from_value(line.clone())?;
            let id = item.id();
            if !inner.records.contains_key(&id) {
                inner.order.push(id.clone());
            }
            inner.records.insert(id, item);
        }
        inner.loaded = true;
        Ok(())
    }

    /// Append one record, persisting it to the backing object and updating
    /// the in-memory projection (latest-wins on re-add).
    pub async fn add(&self, item: T) -> Result<()> {
        self.load_data().await?;
        let id = item.id();
        let line = serde_json::to_string(&item)?;
        self.store.append(&self.index_key, &line).await?;

        let mut inner = self.inner.write();
        if !inner.records.contains_key(&id) {
            inner.order.push(id.clone());
        }
        inner.records.insert(id, item);
        Ok(())
    }

    pub async fn has(&self, id: &str) -> Result<bool> {
        self.load_data().await?;
        Ok(self.inner.read().records.contains_key(id))
    }

    /// Returns records for `ids` in the same order; missing ids are
    /// silently dropped.
    pub async fn get(&self, ids: &[String]) -> Result<Vec<T>> {
        self.load_data().await?;
        let inner = self.inner.read();
        Ok(ids
            .iter()
            .filter_map(|id| inner.records.get(id).cloned())
            .collect())
    }

    pub async fn find_all(&self) -> Result<Vec<T>> {
        self.load_data().await?;
        let inner = self.inner.read();
        Ok(inner
            .order
            .iter()
            .filter_map(|id| inner.records.get(id).cloned())
            .collect())
    }

    /// Apply `prefix` (on the record's string id), then `limit` (first N),
    /// then `max_tokens` (greedy accumulation from the front, stopping
    /// before the first record that would exceed budget). A record with no
    /// `tokens` value is a fatal error once the `max_tokens` filter is
    /// exercised over it (spec §4.1, §7 `BudgetMissingTokens`).
    pub async fn query_items(&self, filter: &QueryFilter) -> Result<Vec<T>> {
        self.load_data().await?;
        let all = self.find_all().await?;
        apply_query_filter(all, filter)
    }
}

/// The shared `prefix` → `limit` → `max_tokens` pipeline (spec §4.1
/// Filters), usable by specializations (e.g. `GraphIndex`) that first
/// narrow a record set by some other criterion before applying it.
pub fn apply_query_filter<T: IndexedItem>(all: Vec<T>, filter: &QueryFilter) -> Result<Vec<T>> {
    let mut items: Vec<T> = match &filter.prefix {
        Some(p) => all.into_iter().filter(|r| r.id().starts_with(p)).collect(),
        None => all,
    };

    if let Some(limit) = filter.limit {
        if limit > 0 {
            items.truncate(limit);
        }
    }

    if let Some(budget) = filter.max_tokens {
        let mut out = Vec::new();
        let mut sum: u64 = 0;
        for item in items {
            let tokens = item
                .tokens()
                .ok_or_else(|| Error::BudgetMissingTokens(item.id()))?;
            if sum + tokens as u64 > budget as u64 {
                break;
            }
            sum += tokens as u64;
            out.push(item);
        }
        items = out;
    }

    Ok(items)
}
