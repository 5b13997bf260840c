//! TraceVisualizer (spec §4.8): renders Mermaid sequence diagrams from
//! matched CLIENT/SERVER span pairs.

use std::collections::HashMap;

use serde_json::Value;

use agentrt_domain::config::ObservabilityConfig;
use agentrt_domain::span::{Span, SpanKind, SpanStatus};

/// A CLIENT span and the SERVER span that answered it, if one was
/// recorded. Pairing is by `server.parent_span_id == client.span_id`,
/// mirroring how `Tracer::server_call` is expected to be invoked.
struct Pair<'a> {
    client: &'a Span,
    server: Option<&'a Span>,
}

fn matched_pairs(spans: &[Span]) -> Vec<Pair<'_>> {
    let mut pairs: Vec<Pair> = spans
        .iter()
        .filter(|s| s.kind == SpanKind::Client)
        .map(|client| {
            let server = spans
                .iter()
                .find(|s| s.kind == SpanKind::Server && s.parent_span_id.as_deref() == Some(client.span_id.as_str()));
            Pair { client, server }
        })
        .collect();
    pairs.sort_by(|a, b| a.client.start.cmp(&b.client.start));
    pairs
}

fn format_attrs(attrs: &HashMap<String, Value>) -> String {
    let mut keys: Vec<&String> = attrs.keys().collect();
    keys.sort();
    keys.into_iter()
        .map(|k| format!("{k}=\"{}\"", render_value(&attrs[k])))
        .collect::<Vec<_>>()
        .join(", ")
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn status_label(status: SpanStatus) -> &'static str {
    match status {
        SpanStatus::Ok => "OK",
        SpanStatus::Error => "ERROR",
        SpanStatus::Unset => "UNSET",
    }
}

fn participant_of(span: &Span, attr: &str) -> Option<String> {
    span.attributes.get(attr).and_then(Value::as_str).map(String::from)
}

/// Renders Mermaid sequence diagrams over a trace's spans (spec §4.8).
pub struct TraceVisualizer {
    participant_rank: Vec<String>,
}

impl TraceVisualizer {
    pub fn new(participant_rank: Vec<String>) -> Self {
        Self { participant_rank }
    }

    pub fn from_config(config: &ObservabilityConfig) -> Self {
        Self::new(config.participant_rank.clone())
    }

    /// Renders a single trace's matched CLIENT/SERVER pairs.
    pub fn render(&self, spans: &[Span]) -> String {
        let pairs = matched_pairs(spans);
        let participants = self.present_participants(&pairs);

        let mut out = String::from("sequenceDiagram\n");
        for p in &participants {
            out.push_str(&format!("    participant {p}\n"));
        }
        self.render_pairs(&mut out, &pairs);
        out
    }

    /// Renders all spans across every trace matched by a `resource_id`
    /// filter query as one diagram, titled by the resource and separated
    /// into `Note over agent: Trace: <id>` blocks per trace (spec §4.8).
    pub fn render_combined(&self, resource_id: &str, spans: &[Span]) -> String {
        let pairs = matched_pairs(spans);
        let participants = self.present_participants(&pairs);

        let mut out = format!("sequenceDiagram\n    %% Trace: {resource_id}\n");
        for p in &participants {
            out.push_str(&format!("    participant {p}\n"));
        }

        let mut trace_order: Vec<String> = Vec::new();
        for pair in &pairs {
            let tid = &pair.client.trace_id;
            if !trace_order.contains(tid) {
                trace_order.push(tid.clone());
            }
        }

        for trace_id in trace_order {
            out.push_str(&format!("    Note over agent: Trace: {trace_id}\n"));
            let group: Vec<&Pair> = pairs.iter().filter(|p| p.client.trace_id == trace_id).collect();
            self.render_pair_refs(&mut out, &group);
        }

        out
    }

    fn present_participants(&self, pairs: &[Pair]) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        for pair in pairs {
            if let Some(from) = participant_of(pair.client, "service.name") {
                seen.insert(from);
            }
            if let Some(to) = participant_of(pair.client, "rpc.service") {
                seen.insert(to);
            }
        }
        self.participant_rank.iter().filter(|p| seen.contains(*p)).cloned().collect()
    }

    fn render_pairs(&self, out: &mut String, pairs: &[Pair]) {
        let refs: Vec<&Pair> = pairs.iter().collect();
        self.render_pair_refs(out, &refs);
    }

    fn render_pair_refs(&self, out: &mut String, pairs: &[&Pair]) {
        for pair in pairs {
            let Some(from) = participant_of(pair.client, "service.name") else {
                continue;
            };
            let Some(to) = participant_of(pair.client, "rpc.service") else {
                continue;
            };
            let Some(server) = pair.server else {
                continue;
            };

            let method = pair
                .client
                .attributes
                .get("rpc.method")
                .and_then(Value::as_str)
                .unwrap_or(pair.client.name.as_str());
            let request_attrs = pair.client.events.first().map(|e| format_attrs(&e.attributes)).unwrap_or_default();

            out.push_str(&format!(
                "    {from}->>+{to}: {method} (time={}, {request_attrs})\n",
                pair.client.start.to_rfc3339()
            ));

            let response_body = if server.status == SpanStatus::Error {
                server.status_message.clone().unwrap_or_default()
            } else {
                server.events.last().map(|e| format_attrs(&e.attributes)).unwrap_or_default()
            };

            out.push_str(&format!(
                "    {to}-->>-{from}: {} ({response_body})\n",
                status_label(server.status)
            ));
        }
    }
}
