//! The fixed set of persisted entity shapes (spec §3, design note in §9:
//! "Polymorphic resource... model as a tagged variant over the fixed set").
//!
//! The ontology and tool machinery only ever touch the shared subset
//! `{id, content?, tokens}` — see [`Resource::content`] and [`Resource::tokens`].

use serde::{Deserialize, Serialize};

use crate::identifier::Identifier;
use crate::tool::{MessageContent, Role, ToolCall};

/// Per-type dispatch the runtime used to get via "monkey-patching" on the
/// original object graph (design note §9) — here it is an explicit trait.
pub trait Resource {
    fn identifier(&self) -> &Identifier;
    fn identifier_mut(&mut self) -> &mut Identifier;

    /// Build the identifier for a freshly-constructed resource, given an
    /// optional parent and semantic subjects, and set its token count.
    fn with_identifier(mut self, parent: Option<&str>, subjects: Vec<String>) -> Self
    where
        Self: Sized + Clone,
    {
        let tokens = self.tokens();
        let id = self.identifier_mut();
        if let Some(p) = parent {
            id.parent = p.to_string();
        }
        id.subjects = subjects;
        id.tokens = Some(tokens);
        self
    }

    /// Token count of the entity's textual content.
    fn tokens(&self) -> u32;

    /// Shared textual content, if any — what tool-call normalization and
    /// the ontology processor consume.
    fn content(&self) -> Option<&str>;
}

/// `{type, name, parent, subjects[], tokens}` carrying system prompt +
/// declared tool list + handoff table (spec §3 Agent entity).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub identifier: Identifier,
    pub system_prompt: String,
    /// ToolFunction names only (spec §3 invariant).
    pub tools: Vec<String>,
    #[serde(default)]
    pub infer: bool,
    #[serde(default)]
    pub handoffs: Vec<Handoff>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Handoff {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    pub prompt: String,
    #[serde(default)]
    pub send: bool,
}

impl Resource for Agent {
    fn identifier(&self) -> &Identifier {
        &self.identifier
    }
    fn identifier_mut(&mut self) -> &mut Identifier {
        &mut self.identifier
    }
    fn tokens(&self) -> u32 {
        crate::tokenizer::encode(&self.system_prompt).len() as u32
    }
    fn content(&self) -> Option<&str> {
        Some(&self.system_prompt)
    }
}

/// Anchor for a dialogue (spec §3 Conversation entity).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub identifier: Identifier,
    pub agent_id: String,
    pub actor: String,
}

impl Resource for Conversation {
    fn identifier(&self) -> &Identifier {
        &self.identifier
    }
    fn identifier_mut(&mut self) -> &mut Identifier {
        &mut self.identifier
    }
    fn tokens(&self) -> u32 {
        0
    }
    fn content(&self) -> Option<&str> {
        None
    }
}

/// One turn item. Assistant messages may carry `tool_calls` (spec §3
/// Message entity).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub identifier: Identifier,
    pub role: Role,
    pub content: MessageContent,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
}

impl Resource for Message {
    fn identifier(&self) -> &Identifier {
        &self.identifier
    }
    fn identifier_mut(&mut self) -> &mut Identifier {
        &mut self.identifier
    }
    fn tokens(&self) -> u32 {
        crate::tokenizer::encode(&self.content.extract_all_text()).len() as u32
    }
    fn content(&self) -> Option<&str> {
        self.content.text()
    }
}

/// Tool result record. `tool_call_id` links back to the assistant message's
/// tool_call entry (spec §3 ToolCallMessage entity).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallMessage {
    pub identifier: Identifier,
    pub tool_call_id: String,
    pub content: String,
    #[serde(default)]
    pub is_error: bool,
}

impl Resource for ToolCallMessage {
    fn identifier(&self) -> &Identifier {
        &self.identifier
    }
    fn identifier_mut(&mut self) -> &mut Identifier {
        &mut self.identifier
    }
    fn tokens(&self) -> u32 {
        crate::tokenizer::encode(&self.content).len() as u32
    }
    fn content(&self) -> Option<&str> {
        Some(&self.content)
    }
}

/// A declared tool the agent may call (spec §3 ToolFunction, referenced by
/// `Agent.tools[]`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolFunction {
    pub identifier: Identifier,
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

impl Resource for ToolFunction {
    fn identifier(&self) -> &Identifier {
        &self.identifier
    }
    fn identifier_mut(&mut self) -> &mut Identifier {
        &mut self.identifier
    }
    fn tokens(&self) -> u32 {
        crate::tokenizer::encode(&format!("{}{}{}", self.name, self.description, self.parameters))
            .len() as u32
    }
    fn content(&self) -> Option<&str> {
        Some(&self.description)
    }
}

/// Tagged union over the fixed resource set, keyed by `Identifier.kind`.
/// This is the shape `ResourceIndex` actually stores and hydrates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnyResource {
    Agent(Agent),
    Conversation(Conversation),
    Message(Message),
    ToolCallMessage(ToolCallMessage),
    ToolFunction(ToolFunction),
}

impl AnyResource {
    pub fn identifier(&self) -> &Identifier {
        match self {
            Self::Agent(r) => r.identifier(),
            Self::Conversation(r) => r.identifier(),
            Self::Message(r) => r.identifier(),
            Self::ToolCallMessage(r) => r.identifier(),
            Self::ToolFunction(r) => r.identifier(),
        }
    }

    /// Shared subset the ontology/tool machinery consume.
    pub fn content(&self) -> Option<&str> {
        match self {
            Self::Agent(r) => r.content(),
            Self::Conversation(r) => r.content(),
            Self::Message(r) => r.content(),
            Self::ToolCallMessage(r) => r.content(),
            Self::ToolFunction(r) => r.content(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_resource_round_trips_and_tags_by_type() {
        let msg = Message {
            identifier: Identifier::new("message", "m1")
                .with_parent("conversation.c1")
                .with_tokens(3),
            role: Role::User,
            content: MessageContent::Text("hi".into()),
            tool_calls: vec![],
        };
        let wrapped = AnyResource::Message(msg);
        let json = serde_json::to_value(&wrapped).unwrap();
        assert_eq!(json["type"], "message");
        let back: AnyResource = serde_json::from_value(json).unwrap();
        assert_eq!(back.identifier().to_key(), "conversation.c1/message.m1");
    }

    #[test]
    fn tool_call_message_content_is_the_result_text() {
        let tcm = ToolCallMessage {
            identifier: Identifier::new("tool_call_message", "t1"),
            tool_call_id: "call_1".into(),
            content: "42".into(),
            is_error: false,
        };
        assert_eq!(tcm.content(), Some("42"));
    }
}
