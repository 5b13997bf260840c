//! The external tool-service interface (spec §4.5) and a small registry,
//! plus one reference implementation.
//!
//! Tool *semantics* are deliberately out of scope (spec §1 Non-goals: "does
//! not define tool semantics beyond dispatch") — this crate owns only the
//! dispatch seam `AgentHands` calls through, not a catalogue of tools.

mod exec_tool;
mod registry;

pub use exec_tool::{ExecRequest, ExecTool};
pub use registry::ToolRegistry;

use async_trait::async_trait;
use serde_json::Value;

use agentrt_domain::{Identifier, Result};

/// Attached to every dispatch (spec §4.5 "attach `llm_token` and
/// `resource_id`").
#[derive(Debug, Clone)]
pub struct ToolCallContext {
    pub llm_token: String,
    pub resource_id: String,
}

/// What a `ToolService` call returns, before `executeToolCall`'s
/// normalization (spec §4.5):
/// - `content`: a direct string result, used as-is when non-empty.
/// - `identifiers`: resource identifiers the caller should resolve and
///   concatenate instead of (or in addition to) `content`.
#[derive(Debug, Clone, Default)]
pub struct ToolRawResult {
    pub content: Option<String>,
    pub identifiers: Option<Vec<Identifier>>,
}

impl ToolRawResult {
    pub fn content(text: impl Into<String>) -> Self {
        Self {
            content: Some(text.into()),
            identifiers: None,
        }
    }

    pub fn identifiers(ids: Vec<Identifier>) -> Self {
        Self {
            content: None,
            identifiers: Some(ids),
        }
    }
}

/// One external tool, addressed by name through `AgentHands::executeToolCall`.
#[async_trait]
pub trait ToolService: Send + Sync {
    fn name(&self) -> &str;
    async fn call(&self, arguments: Value, ctx: &ToolCallContext) -> Result<ToolRawResult>;
}
