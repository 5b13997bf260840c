//! The LLM seam `AgentHands` calls through (spec §4.5 step 1: "the LLM
//! service is responsible for assembling the window from `resource_id`
//! internally; this call is opaque here").

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use agentrt_domain::tool::ToolCall;
use agentrt_domain::Result;

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub resource_id: String,
    pub llm_token: String,
    pub model: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    ToolCalls,
    Length,
    #[serde(other)]
    Other,
}

/// The assistant's raw turn output before persistence.
#[derive(Debug, Clone, Default)]
pub struct AssistantTurn {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
}

#[derive(Debug, Clone)]
pub struct CompletionChoice {
    pub finish_reason: FinishReason,
    pub message: AssistantTurn,
}

#[derive(Debug, Clone, Default)]
pub struct CompletionResponse {
    pub choices: Vec<CompletionChoice>,
}

/// `llm.createCompletions` (spec §4.5 step 1).
#[async_trait]
pub trait LlmService: Send + Sync {
    async fn create_completions(&self, req: CompletionRequest) -> Result<CompletionResponse>;
}
