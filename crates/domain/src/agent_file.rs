//! Parses the `*.agent.md` file format (spec §6): YAML frontmatter followed
//! by a Markdown system-prompt body.
//!
//! Grounded on the teacher's `skills::manifest::parse_frontmatter` — same
//! `---`-delimited scan, same "parse what's there, warn and continue on a
//! malformed block" tolerance.

use serde::{Deserialize, Serialize};

use crate::resource::Handoff as ResourceHandoff;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentFrontmatter {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default)]
    pub infer: bool,
    #[serde(default)]
    pub handoffs: Vec<FrontmatterHandoff>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrontmatterHandoff {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    pub prompt: String,
    #[serde(default)]
    pub send: bool,
}

impl From<FrontmatterHandoff> for ResourceHandoff {
    fn from(h: FrontmatterHandoff) -> Self {
        ResourceHandoff {
            label: h.label,
            agent: h.agent,
            prompt: flatten_whitespace(&h.prompt),
            send: h.send,
        }
    }
}

/// Collapse runs of whitespace (including newlines) to a single space, the
/// way handoff prompts must be flattened per spec §6.
pub fn flatten_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse an `*.agent.md` file's contents. Returns `(frontmatter, body)`.
/// If there is no well-formed `---`-delimited YAML block, returns
/// `(None, content)` unchanged — the whole file is treated as body text.
pub fn parse_agent_file(content: &str) -> (Option<AgentFrontmatter>, String) {
    let trimmed = content.trim_start();
    if !trimmed.starts_with("---") {
        return (None, content.to_string());
    }

    let after_open = &trimmed[3..];
    let Some(close_idx) = after_open.find("\n---") else {
        return (None, content.to_string());
    };

    let yaml = &after_open[..close_idx];
    let rest = &after_open[close_idx + 4..];
    let body = rest.trim_start_matches('\n').to_string();

    match serde_yaml::from_str::<AgentFrontmatter>(yaml) {
        Ok(fm) => (Some(fm), body),
        Err(e) => {
            tracing::warn!(error = %e, "malformed agent frontmatter, treating file as plain body");
            (None, content.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_frontmatter() {
        let content = "---\nname: researcher\n---\nYou are a researcher.\n";
        let (fm, body) = parse_agent_file(content);
        let fm = fm.expect("frontmatter should parse");
        assert_eq!(fm.name, "researcher");
        assert_eq!(body, "You are a researcher.\n");
    }

    #[test]
    fn parses_full_frontmatter_with_handoffs() {
        let content = r#"---
name: triage
description: Routes requests
tools: [exec, memory.search]
infer: true
handoffs:
  - label: escalate
    agent: specialist
    prompt: |
      Please take
      this over.
    send: true
---
Body text.
"#;
        let (fm, body) = parse_agent_file(content);
        let fm = fm.unwrap();
        assert_eq!(fm.name, "triage");
        assert_eq!(fm.tools, vec!["exec", "memory.search"]);
        assert!(fm.infer);
        assert_eq!(fm.handoffs.len(), 1);
        let resource_handoff: ResourceHandoff = fm.handoffs[0].clone().into();
        assert_eq!(resource_handoff.prompt, "Please take this over.");
        assert_eq!(body.trim(), "Body text.");
    }

    #[test]
    fn no_frontmatter_returns_whole_file_as_body() {
        let content = "Just a plain prompt, no frontmatter.";
        let (fm, body) = parse_agent_file(content);
        assert!(fm.is_none());
        assert_eq!(body, content);
    }

    #[test]
    fn malformed_yaml_falls_back_to_plain_body() {
        let content = "---\nname: [unterminated\n---\nBody\n";
        let (fm, body) = parse_agent_file(content);
        assert!(fm.is_none());
        assert_eq!(body, content);
    }

    #[test]
    fn flatten_whitespace_collapses_newlines_and_runs() {
        assert_eq!(flatten_whitespace("a\n\nb   c\td"), "a b c d");
    }
}
