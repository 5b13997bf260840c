//! Typed, hierarchical resource names (spec §3, §6 "Identifier string format").

use serde::{Deserialize, Serialize};

/// A typed, hierarchical name attached to every stored entity.
///
/// Canonical string form is `parent/type.name` (parent elided when empty).
/// `tokens` is the token-count of the entity's textual content and is what
/// budget filters in `IndexBase::query_items` consume; `subjects` is an
/// optional list of semantic subject URIs used for graph cross-linkage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identifier {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub parent: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subjects: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens: Option<u32>,
}

impl Identifier {
    /// Build an identifier. If `name` is already prefixed by `"{kind}."`,
    /// the prefix is stripped (spec §6).
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        let kind = kind.into();
        let mut name = name.into();
        let prefix = format!("{kind}.");
        if let Some(stripped) = name.strip_prefix(&prefix) {
            name = stripped.to_string();
        }
        Self {
            kind,
            name,
            parent: String::new(),
            subjects: Vec::new(),
            tokens: None,
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = parent.into();
        self
    }

    pub fn with_subjects(mut self, subjects: Vec<String>) -> Self {
        self.subjects = subjects;
        self
    }

    pub fn with_tokens(mut self, tokens: u32) -> Self {
        self.tokens = Some(tokens);
        self
    }

    /// Canonical `parent/type.name` string form. Requires non-empty `type`
    /// and `name` (spec testable property 1).
    pub fn to_key(&self) -> String {
        let tn = format!("{}.{}", self.kind, self.name);
        if self.parent.is_empty() {
            tn
        } else {
            format!("{}/{}", self.parent, tn)
        }
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_form_without_parent() {
        let id = Identifier::new("message", "abc");
        assert_eq!(id.to_key(), "message.abc");
    }

    #[test]
    fn string_form_with_parent() {
        let id = Identifier::new("message", "abc").with_parent("conversation.c1");
        assert_eq!(id.to_key(), "conversation.c1/message.abc");
    }

    #[test]
    fn string_form_with_chained_parent() {
        let id = Identifier::new("tool.result", "x").with_parent("a/b/c");
        assert_eq!(id.to_key(), "a/b/c/tool.result.x");
    }

    #[test]
    fn name_prefixed_by_type_is_stripped() {
        let id = Identifier::new("message", "message.abc");
        assert_eq!(id.name, "abc");
        assert_eq!(id.to_key(), "message.abc");
    }

    #[test]
    fn display_matches_to_key() {
        let id = Identifier::new("agent", "root");
        assert_eq!(id.to_string(), id.to_key());
    }

    #[test]
    fn round_trips_through_json() {
        let id = Identifier::new("memory", "m1")
            .with_parent("conversation.c1")
            .with_subjects(vec!["https://example.com/p1".into()])
            .with_tokens(42);
        let json = serde_json::to_string(&id).unwrap();
        let back: Identifier = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}
