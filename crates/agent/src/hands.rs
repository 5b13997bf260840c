//! AgentHands — the tool-call execution loop (spec §4.5).

use std::sync::Arc;

use agentrt_domain::resource::{AnyResource, Message as ResourceMessage, Resource, ToolCallMessage};
use agentrt_domain::tool::{MessageContent, Role, ToolCall};
use agentrt_domain::{Error, Identifier, Result};
use agentrt_index::ResourceIndex;
use agentrt_tools::{ToolCallContext, ToolRawResult, ToolRegistry};

use crate::llm::{CompletionRequest, FinishReason, LlmService};
use crate::persistence::{SaveToServer, StreamToClient};

/// Safety cap on loop iterations (spec §4.5).
const MAX_ITERATIONS: usize = 100;

/// Tool-call function name that triggers handoff injection (spec §4.5,
/// §9 design note).
const HANDOFF_TOOL_NAME: &str = "run_handoff";

pub struct AgentHands {
    llm: Arc<dyn LlmService>,
    tools: Arc<ToolRegistry>,
    resources: Arc<ResourceIndex>,
}

impl AgentHands {
    pub fn new(llm: Arc<dyn LlmService>, tools: Arc<ToolRegistry>, resources: Arc<ResourceIndex>) -> Self {
        Self {
            llm,
            tools,
            resources,
        }
    }

    /// Drive the loop for one conversation until the model stops emitting
    /// tool calls, a safety cap is hit, or the response has no choices.
    pub async fn execute_tool_loop(
        &self,
        resource_id: &str,
        save: &dyn SaveToServer,
        stream: &dyn StreamToClient,
        llm_token: &str,
        model: &str,
    ) -> Result<()> {
        for _ in 0..MAX_ITERATIONS {
            let response = self
                .llm
                .create_completions(CompletionRequest {
                    resource_id: resource_id.to_string(),
                    llm_token: llm_token.to_string(),
                    model: model.to_string(),
                })
                .await?;

            let Some(choice) = response.choices.into_iter().next() else {
                return Ok(());
            };

            let assistant = build_assistant_message(resource_id, &choice.message);
            stream.stream(&assistant);

            if !choice.message.tool_calls.is_empty() {
                let ctx = ToolCallContext {
                    llm_token: llm_token.to_string(),
                    resource_id: resource_id.to_string(),
                };

                let futures = choice
                    .message
                    .tool_calls
                    .iter()
                    .map(|call| self.execute_tool_call(resource_id, call, &ctx));
                let results = futures_util::future::join_all(futures).await;

                let handoff_prompt = choice
                    .message
                    .tool_calls
                    .iter()
                    .zip(&results)
                    .find(|(call, _)| call.tool_name == HANDOFF_TOOL_NAME)
                    .and_then(|(_, tcm)| serde_json::from_str::<HandoffPayload>(&tcm.content).ok())
                    .map(|p| p.prompt);

                let mut batch = Vec::with_capacity(results.len() + 1);
                batch.push(assistant);
                batch.extend(results.into_iter().map(AnyResource::ToolCallMessage));
                save.save(batch).await?;

                if let Some(prompt) = handoff_prompt {
                    let synthesized = build_user_message(resource_id, &prompt);
                    save.save(vec![synthesized]).await?;
                }

                continue;
            }

            save.save(vec![assistant]).await?;

            match choice.finish_reason {
                FinishReason::ToolCalls | FinishReason::Length => continue,
                FinishReason::Stop | FinishReason::Other => return Ok(()),
            }
        }

        tracing::warn!(resource_id, error = %Error::IterationCapReached, "tool loop hit its iteration cap");
        Ok(())
    }

    /// `executeToolCall` (spec §4.5): attach context, invoke the external
    /// tool, and normalize the result. Never propagates an error — any
    /// failure becomes an error-shaped tool message so sibling calls are
    /// unaffected.
    async fn execute_tool_call(
        &self,
        resource_id: &str,
        call: &ToolCall,
        ctx: &ToolCallContext,
    ) -> ToolCallMessage {
        let outcome = self.tools.call(&call.tool_name, call.arguments.clone(), ctx).await;

        let (content, subjects, is_error) = match outcome {
            Ok(raw) => self.normalize_raw_result(raw).await,
            Err(e) => {
                let body = serde_json::json!({
                    "error": {
                        "type": "tool_execution_error",
                        "message": e.to_string(),
                        "code": error_code(&e),
                    }
                });
                (body.to_string(), Vec::new(), true)
            }
        };

        ToolCallMessage {
            identifier: Identifier::new("tool_call_message", uuid::Uuid::new_v4().to_string()),
            tool_call_id: call.call_id.clone(),
            content,
            is_error,
        }
        .with_identifier(Some(resource_id), subjects)
    }

    async fn normalize_raw_result(&self, raw: ToolRawResult) -> (String, Vec<String>, bool) {
        if let Some(content) = raw.content.filter(|s| !s.is_empty()) {
            return (content, Vec::new(), false);
        }

        match raw.identifiers {
            Some(ids) if ids.is_empty() => ("No results found.".to_string(), Vec::new(), false),
            Some(ids) => {
                let subjects: Vec<String> = ids.iter().flat_map(|id| id.subjects.clone()).collect();
                let keys: Vec<String> = ids.iter().map(|id| id.to_key()).collect();
                let resolved = self.resources.get(&keys).await.unwrap_or_default();
                let content = resolved
                    .iter()
                    .filter_map(|r| r.content())
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
                    .join("\n\n");
                (content, subjects, false)
            }
            None => (String::new(), Vec::new(), false),
        }
    }
}

#[derive(serde::Deserialize)]
struct HandoffPayload {
    prompt: String,
}

fn error_code(err: &Error) -> &'static str {
    match err {
        Error::ToolExecutionError { .. } => "tool_execution_error",
        Error::NotFound(_) => "not_found",
        Error::StorageUnavailable(_) => "storage_unavailable",
        Error::Io(_) => "io_error",
        Error::Json(_) => "json_error",
        _ => "internal_error",
    }
}

fn build_assistant_message(resource_id: &str, turn: &crate::llm::AssistantTurn) -> AnyResource {
    let message = ResourceMessage {
        identifier: Identifier::new("message", uuid::Uuid::new_v4().to_string()),
        role: Role::Assistant,
        content: MessageContent::Text(turn.content.clone()),
        tool_calls: turn.tool_calls.clone(),
    }
    .with_identifier(Some(resource_id), Vec::new());
    AnyResource::Message(message)
}

fn build_user_message(resource_id: &str, prompt: &str) -> AnyResource {
    let message = ResourceMessage {
        identifier: Identifier::new("message", uuid::Uuid::new_v4().to_string()),
        role: Role::User,
        content: MessageContent::Text(prompt.to_string()),
        tool_calls: vec![],
    }
    .with_identifier(Some(resource_id), Vec::new());
    AnyResource::Message(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{AssistantTurn, CompletionChoice, CompletionResponse};
    use agentrt_store::{LocalObjectStore, ObjectStore};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct ScriptedLlm {
        responses: Mutex<Vec<CompletionResponse>>,
    }

    #[async_trait]
    impl LlmService for ScriptedLlm {
        async fn create_completions(&self, _req: CompletionRequest) -> Result<CompletionResponse> {
            let mut responses = self.responses.lock();
            Ok(if responses.is_empty() {
                CompletionResponse { choices: vec![] }
            } else {
                responses.remove(0)
            })
        }
    }

    struct RecordingSave {
        batches: Mutex<Vec<Vec<AnyResource>>>,
    }

    #[async_trait]
    impl SaveToServer for RecordingSave {
        async fn save(&self, messages: Vec<AnyResource>) -> Result<()> {
            self.batches.lock().push(messages);
            Ok(())
        }
    }

    struct NoopStream;
    impl StreamToClient for NoopStream {
        fn stream(&self, _message: &AnyResource) {}
    }

    struct CountingStream {
        count: AtomicUsize,
    }
    impl StreamToClient for CountingStream {
        fn stream(&self, _message: &AnyResource) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn tool_call(call_id: &str, tool_name: &str, label: &str) -> ToolCall {
        ToolCall {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            arguments: serde_json::json!({ "label": label }),
        }
    }

    fn hands(llm: ScriptedLlm, tools: ToolRegistry) -> (tempfile::TempDir, AgentHands) {
        let dir = tempfile::tempdir().unwrap();
        let store: Arc<dyn ObjectStore> = Arc::new(LocalObjectStore::new(dir.path()));
        let resources = Arc::new(ResourceIndex::new(store, "resources.jsonl"));
        (
            dir,
            AgentHands::new(Arc::new(llm), Arc::new(tools), resources),
        )
    }

    /// Scenario C: dispatch `[call1, call2, call3]` with delays
    /// `[30ms, 10ms, 50ms]`; completion order is `[call2, call1, call3]`
    /// but returned messages preserve request order.
    #[tokio::test]
    async fn scenario_c_parallel_tools_preserve_request_order() {
        let mut registry = ToolRegistry::new();

        // Each call dispatches to a distinct tool name so each can carry
        // its own delay and label independently.
        struct Delayed {
            name: &'static str,
            millis: u64,
        }
        #[async_trait]
        impl agentrt_tools::ToolService for Delayed {
            fn name(&self) -> &str {
                self.name
            }
            async fn call(&self, arguments: serde_json::Value, _ctx: &ToolCallContext) -> Result<ToolRawResult> {
                tokio::time::sleep(Duration::from_millis(self.millis)).await;
                Ok(ToolRawResult::content(arguments["label"].as_str().unwrap_or("").to_string()))
            }
        }
        registry.register(Arc::new(Delayed { name: "call1", millis: 30 }));
        registry.register(Arc::new(Delayed { name: "call2", millis: 10 }));
        registry.register(Arc::new(Delayed { name: "call3", millis: 50 }));

        let llm = ScriptedLlm {
            responses: Mutex::new(vec![
                CompletionResponse {
                    choices: vec![CompletionChoice {
                        finish_reason: FinishReason::ToolCalls,
                        message: AssistantTurn {
                            content: String::new(),
                            tool_calls: vec![
                                tool_call("c1", "call1", "one"),
                                tool_call("c2", "call2", "two"),
                                tool_call("c3", "call3", "three"),
                            ],
                        },
                    }],
                },
                CompletionResponse {
                    choices: vec![CompletionChoice {
                        finish_reason: FinishReason::Stop,
                        message: AssistantTurn::default(),
                    }],
                },
            ]),
        };

        let (_dir, hands) = hands(llm, registry);
        let save = RecordingSave {
            batches: Mutex::new(Vec::new()),
        };
        hands
            .execute_tool_loop("conversation.c1", &save, &NoopStream, "token", "model")
            .await
            .unwrap();

        let batches = save.batches.lock();
        let first_batch = &batches[0];
        // [assistant, tool_result(call1), tool_result(call2), tool_result(call3)]
        let contents: Vec<String> = first_batch[1..]
            .iter()
            .map(|m| match m {
                AnyResource::ToolCallMessage(t) => t.content.clone(),
                _ => panic!("expected tool call message"),
            })
            .collect();
        assert_eq!(contents, vec!["one", "two", "three"]);
    }

    #[tokio::test]
    async fn no_choices_terminates_without_saving() {
        let llm = ScriptedLlm {
            responses: Mutex::new(vec![]),
        };
        let (_dir, hands) = hands(llm, ToolRegistry::new());
        let save = RecordingSave {
            batches: Mutex::new(Vec::new()),
        };
        hands
            .execute_tool_loop("conversation.c1", &save, &NoopStream, "token", "model")
            .await
            .unwrap();
        assert!(save.batches.lock().is_empty());
    }

    #[tokio::test]
    async fn malformed_tool_calls_finish_reason_continues_the_loop() {
        let llm = ScriptedLlm {
            responses: Mutex::new(vec![
                CompletionResponse {
                    choices: vec![CompletionChoice {
                        finish_reason: FinishReason::ToolCalls,
                        message: AssistantTurn {
                            content: "thinking".into(),
                            tool_calls: vec![],
                        },
                    }],
                },
                CompletionResponse {
                    choices: vec![CompletionChoice {
                        finish_reason: FinishReason::Stop,
                        message: AssistantTurn {
                            content: "done".into(),
                            tool_calls: vec![],
                        },
                    }],
                },
            ]),
        };
        let (_dir, hands) = hands(llm, ToolRegistry::new());
        let save = RecordingSave {
            batches: Mutex::new(Vec::new()),
        };
        hands
            .execute_tool_loop("conversation.c1", &save, &NoopStream, "token", "model")
            .await
            .unwrap();
        assert_eq!(save.batches.lock().len(), 2);
    }

    #[tokio::test]
    async fn tool_error_is_isolated_and_shaped_as_json() {
        struct Failing;
        #[async_trait]
        impl agentrt_tools::ToolService for Failing {
            fn name(&self) -> &str {
                "fails"
            }
            async fn call(&self, _arguments: serde_json::Value, _ctx: &ToolCallContext) -> Result<ToolRawResult> {
                Err(Error::ToolExecutionError {
                    tool: "fails".into(),
                    message: "boom".into(),
                })
            }
        }
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Failing));

        let llm = ScriptedLlm {
            responses: Mutex::new(vec![
                CompletionResponse {
                    choices: vec![CompletionChoice {
                        finish_reason: FinishReason::ToolCalls,
                        message: AssistantTurn {
                            content: String::new(),
                            tool_calls: vec![tool_call("c1", "fails", "")],
                        },
                    }],
                },
                CompletionResponse {
                    choices: vec![CompletionChoice {
                        finish_reason: FinishReason::Stop,
                        message: AssistantTurn::default(),
                    }],
                },
            ]),
        };
        let (_dir, hands) = hands(llm, registry);
        let save = RecordingSave {
            batches: Mutex::new(Vec::new()),
        };
        hands
            .execute_tool_loop("conversation.c1", &save, &NoopStream, "token", "model")
            .await
            .unwrap();

        let batches = save.batches.lock();
        let AnyResource::ToolCallMessage(tcm) = &batches[0][1] else {
            panic!("expected tool call message");
        };
        assert!(tcm.is_error);
        let parsed: serde_json::Value = serde_json::from_str(&tcm.content).unwrap();
        assert_eq!(parsed["error"]["type"], "tool_execution_error");
        assert_eq!(parsed["error"]["message"], "boom");
    }

    #[tokio::test]
    async fn handoff_tool_injects_synthesized_user_message() {
        struct Handoff;
        #[async_trait]
        impl agentrt_tools::ToolService for Handoff {
            fn name(&self) -> &str {
                "run_handoff"
            }
            async fn call(&self, _arguments: serde_json::Value, _ctx: &ToolCallContext) -> Result<ToolRawResult> {
                Ok(ToolRawResult::content(
                    serde_json::json!({ "prompt": "continue the task" }).to_string(),
                ))
            }
        }
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Handoff));

        let llm = ScriptedLlm {
            responses: Mutex::new(vec![
                CompletionResponse {
                    choices: vec![CompletionChoice {
                        finish_reason: FinishReason::ToolCalls,
                        message: AssistantTurn {
                            content: String::new(),
                            tool_calls: vec![tool_call("c1", "run_handoff", "")],
                        },
                    }],
                },
                CompletionResponse {
                    choices: vec![CompletionChoice {
                        finish_reason: FinishReason::Stop,
                        message: AssistantTurn::default(),
                    }],
                },
            ]),
        };
        let (_dir, hands) = hands(llm, registry);
        let save = RecordingSave {
            batches: Mutex::new(Vec::new()),
        };
        hands
            .execute_tool_loop("conversation.c1", &save, &NoopStream, "token", "model")
            .await
            .unwrap();

        let batches = save.batches.lock();
        // batch 0: [assistant, tool_result]; batch 1: synthesized user message
        assert_eq!(batches.len(), 3);
        let AnyResource::Message(m) = &batches[1][0] else {
            panic!("expected synthesized user message");
        };
        assert_eq!(m.role, Role::User);
        assert_eq!(m.content.text(), Some("continue the task"));
    }

    #[tokio::test]
    async fn assistant_messages_are_streamed() {
        let llm = ScriptedLlm {
            responses: Mutex::new(vec![CompletionResponse {
                choices: vec![CompletionChoice {
                    finish_reason: FinishReason::Stop,
                    message: AssistantTurn {
                        content: "hi".into(),
                        tool_calls: vec![],
                    },
                }],
            }]),
        };
        let (_dir, hands) = hands(llm, ToolRegistry::new());
        let save = RecordingSave {
            batches: Mutex::new(Vec::new()),
        };
        let stream = CountingStream {
            count: AtomicUsize::new(0),
        };
        hands
            .execute_tool_loop("conversation.c1", &save, &stream, "token", "model")
            .await
            .unwrap();
        assert_eq!(stream.count.load(Ordering::SeqCst), 1);
    }
}
