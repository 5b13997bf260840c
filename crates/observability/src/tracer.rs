//! Tracer (spec §4.8): decorates RPC calls with CLIENT/SERVER spans and
//! persists them to a `TraceIndex`.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use agentrt_domain::span::{Span, SpanEvent, SpanKind, SpanStatus};
use agentrt_domain::{Error, Result};
use agentrt_index::TraceIndex;

/// Trace context an error carries once it has passed through a `Tracer`
/// span. Plain `agentrt_domain::Error`s carry none (the default impl);
/// `TracedError` overrides all three (spec §4.8: "exceptions propagating
/// through the tracer are decorated with trace_id, span_id, and
/// service_name fields, without altering the original message").
pub trait TraceContext {
    fn trace_id(&self) -> Option<&str> {
        None
    }
    fn span_id(&self) -> Option<&str> {
        None
    }
    fn service_name(&self) -> Option<&str> {
        None
    }
}

impl TraceContext for Error {}

/// A domain error that failed inside a traced RPC call, carrying the
/// span that observed it.
#[derive(Debug)]
pub struct TracedError {
    pub source: Error,
    pub trace_id: String,
    pub span_id: String,
    pub service_name: String,
}

impl std::fmt::Display for TracedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.source.fmt(f)
    }
}

impl std::error::Error for TracedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

impl TraceContext for TracedError {
    fn trace_id(&self) -> Option<&str> {
        Some(&self.trace_id)
    }
    fn span_id(&self) -> Option<&str> {
        Some(&self.span_id)
    }
    fn service_name(&self) -> Option<&str> {
        Some(&self.service_name)
    }
}

/// Projects a request/response JSON object down to loggable attributes
/// (spec §4.8 `extractAttributes`): scalars pass through unchanged,
/// strings become `<field>_length`, arrays become `<field>_count`, and the
/// numeric `filter.threshold`/`filter.limit`/`filter.max_tokens` fields are
/// flattened through if present.
pub fn extract_attributes(value: &Value) -> HashMap<String, Value> {
    let mut out = HashMap::new();
    let Some(obj) = value.as_object() else {
        return out;
    };

    for (key, val) in obj {
        match val {
            Value::String(s) => {
                out.insert(format!("{key}_length"), Value::from(s.chars().count()));
            }
            Value::Array(a) => {
                out.insert(format!("{key}_count"), Value::from(a.len()));
            }
            Value::Number(_) | Value::Bool(_) | Value::Null => {
                out.insert(key.clone(), val.clone());
            }
            Value::Object(_) => {}
        }
    }

    if let Some(filter) = obj.get("filter").and_then(Value::as_object) {
        for field in ["threshold", "limit", "max_tokens"] {
            if let Some(n) = filter.get(field).filter(|v| v.is_number()) {
                out.insert(format!("filter.{field}"), n.clone());
            }
        }
    }

    out
}

/// Pulls out the distinguished `resource_id` from a request/response body,
/// either a top-level `resource_id` string or `resource.id`.
pub fn extract_resource_id(value: &Value) -> Option<String> {
    value
        .get("resource_id")
        .and_then(Value::as_str)
        .or_else(|| value.get("resource").and_then(|r| r.get("id")).and_then(Value::as_str))
        .map(String::from)
}

/// Records CLIENT spans for outgoing calls and SERVER spans for incoming
/// handlers, both persisted to the same `TraceIndex`.
pub struct Tracer {
    service_name: String,
    index: Arc<TraceIndex>,
}

impl Tracer {
    pub fn new(service_name: impl Into<String>, index: Arc<TraceIndex>) -> Self {
        Self {
            service_name: service_name.into(),
            index,
        }
    }

    pub fn new_trace_id() -> String {
        Uuid::new_v4().to_string()
    }

    /// Records an outgoing call as a CLIENT span wrapping `call`.
    pub async fn client_call<T, Fut>(
        &self,
        trace_id: &str,
        parent_span_id: Option<&str>,
        rpc_service: &str,
        rpc_method: &str,
        request: &Value,
        call: impl FnOnce() -> Fut,
    ) -> std::result::Result<T, TracedError>
    where
        Fut: Future<Output = Result<T>>,
        T: Serialize,
    {
        self.run_span(SpanKind::Client, trace_id, parent_span_id, rpc_service, rpc_method, request, call)
            .await
    }

    /// Records an incoming handler invocation as the mirror SERVER span.
    /// `parent_span_id` should be the calling CLIENT span's id so
    /// `TraceVisualizer` can pair them.
    pub async fn server_call<T, Fut>(
        &self,
        trace_id: &str,
        parent_span_id: Option<&str>,
        rpc_service: &str,
        rpc_method: &str,
        request: &Value,
        call: impl FnOnce() -> Fut,
    ) -> std::result::Result<T, TracedError>
    where
        Fut: Future<Output = Result<T>>,
        T: Serialize,
    {
        self.run_span(SpanKind::Server, trace_id, parent_span_id, rpc_service, rpc_method, request, call)
            .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_span<T, Fut>(
        &self,
        kind: SpanKind,
        trace_id: &str,
        parent_span_id: Option<&str>,
        rpc_service: &str,
        rpc_method: &str,
        request: &Value,
        call: impl FnOnce() -> Fut,
    ) -> std::result::Result<T, TracedError>
    where
        Fut: Future<Output = Result<T>>,
        T: Serialize,
    {
        let span_id = Uuid::new_v4().to_string();
        let start = Utc::now();

        let mut attributes = HashMap::new();
        attributes.insert("service.name".to_string(), Value::from(self.service_name.clone()));
        attributes.insert("rpc.method".to_string(), Value::from(rpc_method));
        attributes.insert("rpc.service".to_string(), Value::from(rpc_service));

        let mut events = vec![SpanEvent {
            name: "send".into(),
            time: start,
            attributes: extract_attributes(request),
        }];
        let mut resource_id = extract_resource_id(request);

        let outcome = call().await;
        let end = Utc::now();

        let (status, status_message, response_attrs) = match &outcome {
            Ok(response) => {
                let response_json = serde_json::to_value(response).unwrap_or(Value::Null);
                if let Some(rid) = extract_resource_id(&response_json) {
                    resource_id = Some(rid);
                }
                (SpanStatus::Ok, None, extract_attributes(&response_json))
            }
            Err(err) => (SpanStatus::Error, Some(err.to_string()), HashMap::new()),
        };

        events.push(SpanEvent {
            name: "receive".into(),
            time: end,
            attributes: response_attrs,
        });

        let span = Span {
            trace_id: trace_id.to_string(),
            span_id: span_id.clone(),
            parent_span_id: parent_span_id.map(String::from),
            kind,
            name: format!("{rpc_service}.{rpc_method}"),
            start,
            end: Some(end),
            attributes,
            events,
            status,
            status_message,
            resource_id,
        };

        if let Err(e) = self.index.add(span).await {
            tracing::warn!(error = %e, "failed to persist span");
        }

        outcome.map_err(|source| TracedError {
            source,
            trace_id: trace_id.to_string(),
            span_id,
            service_name: self.service_name.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extract_attributes_projects_scalars_strings_and_arrays() {
        let value = json!({
            "name": "alice",
            "tags": ["a", "b", "c"],
            "count": 3,
            "ok": true,
            "filter": { "threshold": 0.5, "limit": 10, "max_tokens": 256, "other": "ignored" },
        });
        let attrs = extract_attributes(&value);
        assert_eq!(attrs["name_length"], json!(5));
        assert_eq!(attrs["tags_count"], json!(3));
        assert_eq!(attrs["count"], json!(3));
        assert_eq!(attrs["ok"], json!(true));
        assert_eq!(attrs["filter.threshold"], json!(0.5));
        assert_eq!(attrs["filter.limit"], json!(10));
        assert_eq!(attrs["filter.max_tokens"], json!(256));
        assert!(!attrs.contains_key("filter"));
    }

    #[test]
    fn extract_resource_id_reads_top_level_or_nested() {
        assert_eq!(
            extract_resource_id(&json!({"resource_id": "conversation.c1"})),
            Some("conversation.c1".to_string())
        );
        assert_eq!(
            extract_resource_id(&json!({"resource": {"id": "conversation.c2"}})),
            Some("conversation.c2".to_string())
        );
        assert_eq!(extract_resource_id(&json!({"other": 1})), None);
    }

    #[tokio::test]
    async fn client_call_records_a_span_and_decorates_errors() {
        let dir = tempfile::tempdir().unwrap();
        let store: std::sync::Arc<dyn agentrt_store::ObjectStore> =
            std::sync::Arc::new(agentrt_store::LocalObjectStore::new(dir.path()));
        let index = Arc::new(TraceIndex::new(store, "traces.jsonl"));
        let tracer = Tracer::new("agent", index.clone());

        let trace_id = Tracer::new_trace_id();
        let result: std::result::Result<serde_json::Value, TracedError> = tracer
            .client_call(&trace_id, None, "memory", "search", &json!({"query": "hello"}), || async {
                Err(Error::StorageUnavailable("down".into()))
            })
            .await;

        let err = result.unwrap_err();
        assert_eq!(err.trace_id(), Some(trace_id.as_str()));
        assert_eq!(err.service_name(), Some("agent"));

        let spans = index.find_all().await.unwrap();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].status, SpanStatus::Error);
        assert_eq!(spans[0].name, "memory.search");
    }
}
