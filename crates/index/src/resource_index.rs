//! ResourceIndex (spec §4.1): the authoritative hydration path, storing
//! full serialized entities keyed by identifier string.

use std::sync::Arc;

use agentrt_domain::resource::AnyResource;
use agentrt_domain::Result;
use agentrt_store::ObjectStore;

use crate::base::{IndexBase, IndexedItem, QueryFilter};

impl IndexedItem for AnyResource {
    fn id(&self) -> String {
        self.identifier().to_key()
    }
    fn tokens(&self) -> Option<u32> {
        self.identifier().tokens
    }
}

pub struct ResourceIndex {
    base: IndexBase<AnyResource>,
}

impl ResourceIndex {
    pub fn new(store: Arc<dyn ObjectStore>, index_key: impl Into<String>) -> Self {
        Self {
            base: IndexBase::new(store, index_key),
        }
    }

    pub async fn add(&self, item: AnyResource) -> Result<()> {
        self.base.add(item).await
    }

    pub async fn has(&self, id: &str) -> Result<bool> {
        self.base.has(id).await
    }

    /// Hydrate by string-form identifier (spec §4.5: "resolve full
    /// resources via ResourceIndex using the string form of each
    /// identifier"), preserving the order requested.
    pub async fn get(&self, ids: &[String]) -> Result<Vec<AnyResource>> {
        self.base.get(ids).await
    }

    pub async fn find_all(&self) -> Result<Vec<AnyResource>> {
        self.base.find_all().await
    }

    pub async fn query_items(&self, filter: &QueryFilter) -> Result<Vec<AnyResource>> {
        self.base.query_items(filter).await
    }
}
