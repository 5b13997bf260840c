//! The concrete `LlmService` this binary wires into `AgentHands`.
//!
//! Implementing an actual model backend is out of scope (spec §1
//! Non-goals: "does not implement the language model itself"), so
//! `agentrt_agent::llm::LlmService` stays a trait an embedding application
//! supplies a real provider adapter for. This binary ships only a stand-in
//! that immediately stops the tool loop, so the rest of the wiring
//! (supervision, tracing, storage) is demonstrably live without pulling in
//! a provider SDK the teacher never had either.

use async_trait::async_trait;

use agentrt_agent::{AssistantTurn, CompletionChoice, CompletionRequest, CompletionResponse, FinishReason, LlmService};
use agentrt_domain::Result;

/// Always finishes with `Stop` and no tool calls. Replace with a real
/// provider adapter before handling production traffic.
pub struct UnimplementedLlmService;

#[async_trait]
impl LlmService for UnimplementedLlmService {
    async fn create_completions(&self, _req: CompletionRequest) -> Result<CompletionResponse> {
        Ok(CompletionResponse {
            choices: vec![CompletionChoice {
                finish_reason: FinishReason::Stop,
                message: AssistantTurn {
                    content: "no language model is configured for this runtime".into(),
                    tool_calls: vec![],
                },
            }],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stops_immediately_without_tool_calls() {
        let llm = UnimplementedLlmService;
        let resp = llm
            .create_completions(CompletionRequest {
                resource_id: "conversation.1".into(),
                llm_token: "token".into(),
                model: "none".into(),
            })
            .await
            .unwrap();
        assert_eq!(resp.choices.len(), 1);
        assert_eq!(resp.choices[0].finish_reason, FinishReason::Stop);
        assert!(resp.choices[0].message.tool_calls.is_empty());
    }
}
