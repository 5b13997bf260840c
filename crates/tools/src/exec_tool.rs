//! Foreground command execution (spec §4.5 reference `ToolService`).
//!
//! Grounded on the teacher's `tools::exec` foreground path; the
//! background-session half of that module (`ProcessManager` polling,
//! stdin pipes, auto-backgrounding past `yield_ms`) models concrete
//! process-management semantics the runtime leaves to external tools, so
//! it is dropped here rather than carried across.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tokio::process::Command;

use agentrt_domain::{Error, Result};

use crate::{ToolCallContext, ToolRawResult, ToolService};

const DEFAULT_TIMEOUT_SEC: u64 = 30;

#[derive(Debug, Clone, Deserialize)]
pub struct ExecRequest {
    pub command: String,
    #[serde(default)]
    pub workdir: Option<String>,
    #[serde(default)]
    pub timeout_sec: Option<u64>,
}

pub struct ExecTool;

#[async_trait]
impl ToolService for ExecTool {
    fn name(&self) -> &str {
        "exec"
    }

    async fn call(&self, arguments: Value, _ctx: &ToolCallContext) -> Result<ToolRawResult> {
        let req: ExecRequest = serde_json::from_value(arguments)
            .map_err(|e| Error::ToolExecutionError {
                tool: self.name().to_string(),
                message: format!("invalid arguments: {e}"),
            })?;

        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(&req.command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(workdir) = &req.workdir {
            cmd.current_dir(workdir);
        }

        let timeout = Duration::from_secs(req.timeout_sec.unwrap_or(DEFAULT_TIMEOUT_SEC));
        let child = cmd.output();

        let output = tokio::time::timeout(timeout, child)
            .await
            .map_err(|_| Error::ToolExecutionError {
                tool: self.name().to_string(),
                message: format!("command timed out after {}s", timeout.as_secs()),
            })?
            .map_err(|e| Error::ToolExecutionError {
                tool: self.name().to_string(),
                message: e.to_string(),
            })?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.is_empty() {
            if !combined.is_empty() {
                combined.push('\n');
            }
            combined.push_str(&stderr);
        }
        if combined.is_empty() {
            combined = format!("(exit {})", output.status.code().unwrap_or(-1));
        }

        Ok(ToolRawResult::content(combined))
    }
}
