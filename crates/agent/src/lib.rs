//! The agent loop: Mind (conversation setup) driving Hands (the tool-call
//! execution loop) over an LLM seam and a tool registry (spec §4.5, §4.6).

mod hands;
mod llm;
mod mind;
mod persistence;

pub use hands::AgentHands;
pub use llm::{AssistantTurn, CompletionChoice, CompletionRequest, CompletionResponse, FinishReason, LlmService};
pub use mind::{AgentMind, ProcessRequest, SetupResult};
pub use persistence::{SaveToServer, ServerPersistence, StreamToClient, SuppressToolChatter};
