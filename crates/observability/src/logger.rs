//! Logger (spec §4.9): RFC 5424-shaped single-line structured records
//! layered on top of `tracing`, so the usual `tracing_subscriber::fmt`
//! pipeline still captures every record.

use std::sync::atomic::{AtomicU32, Ordering};

use agentrt_domain::config::ObservabilityConfig;

use crate::tracer::TraceContext;

/// `LEVEL ts domain appId procId msgIdNNN [k="v" …] message` (spec §4.9).
///
/// `DEBUG` is read once, at construction (spec §8: no global registries —
/// `DEBUG` is read once per logger, not on every call), and snapshotted
/// into `debug_enabled` below.
pub struct Logger {
    domain: String,
    app_id: String,
    debug_enabled: bool,
    seq: AtomicU32,
}

impl Logger {
    pub fn new(domain: impl Into<String>, app_id: impl Into<String>) -> Self {
        let domain = domain.into();
        let debug_enabled = std::env::var("DEBUG")
            .map(|val| debug_pattern_matches(&val, &domain))
            .unwrap_or(false);
        Self {
            domain,
            app_id: app_id.into(),
            debug_enabled,
            seq: AtomicU32::new(0),
        }
    }

    pub fn from_config(domain: impl Into<String>, config: &ObservabilityConfig) -> Self {
        Self::new(domain, config.app_id.clone())
    }

    /// Suppressed unless `DEBUG=*` or `DEBUG` lists a comma-separated
    /// pattern matching this logger's domain (wildcard suffix supported,
    /// e.g. `agent*`), as snapshotted at construction.
    pub fn debug(&self, fields: &[(&str, &str)], message: &str) {
        if !self.debug_enabled {
            return;
        }
        self.emit("debug", fields, message);
    }

    pub fn info(&self, fields: &[(&str, &str)], message: &str) {
        self.emit("info", fields, message);
    }

    /// Merges `trace_id`/`span_id`/`service_name` from the error's trace
    /// context, if any, into the structured block.
    pub fn error<E>(&self, err: &E, message: &str)
    where
        E: std::error::Error + TraceContext,
    {
        self.emit("error", &self.context_fields(err), message);
    }

    /// As `error`, and additionally appends the error's source chain as a
    /// `stack` field when debug logging is enabled for this domain.
    pub fn exception<E>(&self, err: &E, message: &str)
    where
        E: std::error::Error + TraceContext,
    {
        let mut fields = self.context_fields(err);
        if self.debug_enabled {
            let mut chain = Vec::new();
            let mut source = err.source();
            while let Some(s) = source {
                chain.push(s.to_string());
                source = s.source();
            }
            if !chain.is_empty() {
                fields.push(("stack".to_string(), chain.join(" -> ")));
            }
        }
        self.emit("exception", &owned_refs(&fields), message);
    }

    fn context_fields<E>(&self, err: &E) -> Vec<(String, String)>
    where
        E: std::error::Error + TraceContext,
    {
        let mut fields = vec![("error".to_string(), err.to_string())];
        if let Some(t) = err.trace_id() {
            fields.push(("trace_id".to_string(), t.to_string()));
        }
        if let Some(s) = err.span_id() {
            fields.push(("span_id".to_string(), s.to_string()));
        }
        if let Some(sn) = err.service_name() {
            fields.push(("service_name".to_string(), sn.to_string()));
        }
        fields
    }

    fn emit(&self, level: &str, fields: &[(&str, &str)], message: &str) {
        let ts = chrono::Utc::now().to_rfc3339();
        let proc_id = std::process::id();
        let seq = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        let msg_id = format!("msgId{seq:03}");

        let structured = fields
            .iter()
            .map(|(k, v)| format!("{k}=\"{v}\""))
            .collect::<Vec<_>>()
            .join(" ");

        let line = if structured.is_empty() {
            format!("{} {ts} {} {} {proc_id} {msg_id} {message}", level.to_uppercase(), self.domain, self.app_id)
        } else {
            format!(
                "{} {ts} {} {} {proc_id} {msg_id} [{structured}] {message}",
                level.to_uppercase(),
                self.domain,
                self.app_id
            )
        };

        match level {
            "debug" => tracing::debug!(domain = %self.domain, "{line}"),
            "info" => tracing::info!(domain = %self.domain, "{line}"),
            _ => tracing::error!(domain = %self.domain, "{line}"),
        }
    }
}

fn owned_refs(fields: &[(String, String)]) -> Vec<(&str, &str)> {
    fields.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect()
}

/// Pure match against an already-read `DEBUG` value, so the env var itself
/// is only ever read once, in `Logger::new`.
fn debug_pattern_matches(debug_var: &str, domain: &str) -> bool {
    if debug_var == "*" {
        return true;
    }
    debug_var.split(',').map(str::trim).any(|pattern| match pattern.strip_suffix('*') {
        Some(prefix) => domain.starts_with(prefix),
        None => pattern == domain,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentrt_domain::Error;

    #[test]
    fn debug_pattern_matches_wildcard_suffix() {
        assert!(debug_pattern_matches("agent*,tool", "agent.hands"));
        assert!(debug_pattern_matches("agent*,tool", "tool"));
        assert!(!debug_pattern_matches("agent*,tool", "memory"));
    }

    #[test]
    fn debug_pattern_matches_star_matches_everything() {
        assert!(debug_pattern_matches("*", "anything"));
    }

    #[test]
    fn logger_snapshots_debug_enabled_once_at_construction() {
        std::env::set_var("DEBUG", "agent*");
        let matching = Logger::new("agent.hands", "agentrt");
        let non_matching = Logger::new("memory", "agentrt");
        std::env::remove_var("DEBUG");

        // Mutating DEBUG after construction must not affect either logger;
        // the snapshot was taken once, in `new`.
        std::env::set_var("DEBUG", "*");
        assert!(matching.debug_enabled);
        assert!(!non_matching.debug_enabled);
        std::env::remove_var("DEBUG");
    }

    #[test]
    fn debug_suppressed_by_default() {
        std::env::remove_var("DEBUG");
        let logger = Logger::new("agent", "agentrt");
        assert!(!logger.debug_enabled);
    }

    #[test]
    fn error_without_trace_context_omits_trace_fields() {
        let logger = Logger::new("agent", "agentrt");
        let err = Error::StorageUnavailable("down".into());
        logger.error(&err, "store unreachable");
    }
}
