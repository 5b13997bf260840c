//! MemoryIndex (spec §4.1, §4.4): identifier stubs in canonical turn order.
//! Full content lives in `ResourceIndex`; this index only carries enough of
//! the identifier (including `tokens`) to drive the memory-window budget
//! walk.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use agentrt_domain::{Identifier, Result};
use agentrt_store::ObjectStore;

use crate::base::{IndexBase, IndexedItem, QueryFilter};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub id: String,
    pub identifier: Identifier,
}

impl IndexedItem for MemoryRecord {
    fn id(&self) -> String {
        self.id.clone()
    }
    fn tokens(&self) -> Option<u32> {
        self.identifier.tokens
    }
}

pub struct MemoryIndex {
    base: IndexBase<MemoryRecord>,
}

impl MemoryIndex {
    pub fn new(store: Arc<dyn ObjectStore>, index_key: impl Into<String>) -> Self {
        Self {
            base: IndexBase::new(store, index_key),
        }
    }

    /// Append one identifier to the conversation's memory. This is the
    /// single ordered write of a `saveToServer` batch (spec §4.5).
    pub async fn append(&self, identifier: Identifier) -> Result<()> {
        let id = identifier.to_key();
        self.base.add(MemoryRecord { id, identifier }).await
    }

    pub async fn find_all(&self) -> Result<Vec<MemoryRecord>> {
        self.base.find_all().await
    }

    /// The JSONL order is oldest-first; the memory window walk reads
    /// newest-to-oldest (spec §4.4 step 3).
    pub async fn newest_first(&self) -> Result<Vec<MemoryRecord>> {
        let mut all = self.base.find_all().await?;
        all.reverse();
        Ok(all)
    }

    pub async fn query_items(&self, filter: &QueryFilter) -> Result<Vec<MemoryRecord>> {
        self.base.query_items(filter).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentrt_store::LocalObjectStore;

    fn ident(name: &str, tokens: u32) -> Identifier {
        Identifier::new("message", name)
            .with_parent("conversation.c1")
            .with_tokens(tokens)
    }

    #[tokio::test]
    async fn append_then_find_all_preserves_turn_order() {
        let dir = tempfile::tempdir().unwrap();
        let store: Arc<dyn ObjectStore> = Arc::new(LocalObjectStore::new(dir.path()));
        let idx = MemoryIndex::new(store, "memory.jsonl");

        idx.append(ident("m1", 1)).await.unwrap();
        idx.append(ident("m2", 1)).await.unwrap();
        idx.append(ident("m3", 1)).await.unwrap();

        let all = idx.find_all().await.unwrap();
        let names: Vec<_> = all.iter().map(|r| r.identifier.name.clone()).collect();
        assert_eq!(names, vec!["m1", "m2", "m3"]);
    }

    #[tokio::test]
    async fn newest_first_reverses_turn_order() {
        let dir = tempfile::tempdir().unwrap();
        let store: Arc<dyn ObjectStore> = Arc::new(LocalObjectStore::new(dir.path()));
        let idx = MemoryIndex::new(store, "memory.jsonl");

        idx.append(ident("m1", 1)).await.unwrap();
        idx.append(ident("m2", 1)).await.unwrap();

        let newest = idx.newest_first().await.unwrap();
        let names: Vec<_> = newest.iter().map(|r| r.identifier.name.clone()).collect();
        assert_eq!(names, vec!["m2", "m1"]);
    }
}
