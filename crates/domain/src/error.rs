//! Error taxonomy shared across the runtime (spec §7).
//!
//! Propagation semantics are the contract, not the variant names: callers
//! match on `Error::ToolExecutionError` etc. to decide whether to isolate,
//! retry, or surface a failure.

/// Shared error type used across all agentrt crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Missing required parameter to a constructor. Fatal at construction.
    #[error("config: {0}")]
    Config(String),

    /// Conversation or agent missing in `MemoryWindow::build`. Fatal to that turn.
    #[error("not found: {0}")]
    NotFound(String),

    /// ObjectStore connect/read failure. Retried by `Retry` if the caller wraps it.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// An identifier lacks a `tokens` field during budget filtering.
    /// Signals upstream corruption — always fatal.
    #[error("identifier {0} is missing a tokens field")]
    BudgetMissingTokens(String),

    /// A tool service invocation threw. Captured into the tool result
    /// message as JSON; sibling tool calls are unaffected.
    #[error("tool '{tool}' failed: {message}")]
    ToolExecutionError { tool: String, message: String },

    /// `finish_reason == "length"`: the model truncated its output.
    #[error("model truncated its response")]
    ModelTruncation,

    /// `finish_reason == "tool_calls"` but the tool_calls array was empty.
    #[error("model declared tool_calls but supplied none")]
    EmptyToolCalls,

    /// 100 loop iterations elapsed without a stop. Not surfaced as a
    /// failure — the loop terminates silently (see DESIGN.md open question).
    #[error("iteration cap reached without a stop")]
    IterationCapReached,

    /// A resource's content failed Turtle/N-Quads parsing. The resource is
    /// skipped; caller logs at debug level.
    #[error("RDF parse error: {0}")]
    RdfParseError(String),

    /// A supervised longrun exited while its want-up latch was set.
    #[error("process '{0}' exited while up")]
    ProcessExitedWhileUp(String),

    /// A longrun ignored SIGTERM past its stop deadline.
    #[error("process '{0}' required SIGKILL")]
    HardKillNeeded(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
