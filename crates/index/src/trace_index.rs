//! TraceIndex (spec §4.8): spans keyed by `span_id`, with the
//! complete-trace query extension.

use std::collections::HashSet;
use std::sync::Arc;

use agentrt_domain::span::Span;
use agentrt_domain::Result;
use agentrt_store::ObjectStore;

use crate::base::{IndexBase, IndexedItem, QueryFilter};

impl IndexedItem for Span {
    fn id(&self) -> String {
        self.span_id.clone()
    }
    fn tokens(&self) -> Option<u32> {
        None
    }
}

#[derive(Debug, Clone, Default)]
pub struct TraceQuery {
    pub trace_id: Option<String>,
    pub resource_id: Option<String>,
}

pub struct TraceIndex {
    base: IndexBase<Span>,
}

impl TraceIndex {
    pub fn new(store: Arc<dyn ObjectStore>, index_key: impl Into<String>) -> Self {
        Self {
            base: IndexBase::new(store, index_key),
        }
    }

    pub async fn add(&self, span: Span) -> Result<()> {
        self.base.add(span).await
    }

    pub async fn find_all(&self) -> Result<Vec<Span>> {
        self.base.find_all().await
    }

    /// `query.resource_id`, if set, expands the result to every span in
    /// every trace that contains at least one span carrying that
    /// `resource_id` — including sibling spans that don't themselves carry
    /// it. `query.trace_id` further restricts to one trace; combined with
    /// `resource_id`, both must hold (spec §4.8).
    pub async fn query_items(&self, query: &TraceQuery, filter: &QueryFilter) -> Result<Vec<Span>> {
        let all = self.base.find_all().await?;

        let mut matched: Vec<Span> = if let Some(rid) = &query.resource_id {
            let trace_ids: HashSet<String> = all
                .iter()
                .filter(|s| s.resource_id.as_deref() == Some(rid.as_str()))
                .map(|s| s.trace_id.clone())
                .collect();
            all.into_iter()
                .filter(|s| trace_ids.contains(&s.trace_id))
                .collect()
        } else {
            all
        };

        if let Some(tid) = &query.trace_id {
            matched.retain(|s| &s.trace_id == tid);
        }

        if let Some(prefix) = &filter.prefix {
            matched.retain(|s| s.id().starts_with(prefix));
        }
        if let Some(limit) = filter.limit {
            if limit > 0 {
                matched.truncate(limit);
            }
        }

        Ok(matched)
    }
}
