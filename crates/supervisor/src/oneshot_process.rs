//! `OneshotProcess` — runs an init/teardown command to completion; not
//! supervised (spec §4.7).

use agentrt_domain::{Error, Result};

use crate::pgkill::spawn_group;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OneshotOutcome {
    pub code: Option<i32>,
    pub signal: Option<i32>,
}

pub struct OneshotProcess;

impl OneshotProcess {
    /// Runs `command` via `bash -c` to completion and resolves with its
    /// exit status.
    pub async fn run(command: &str) -> Result<OneshotOutcome> {
        let mut child = spawn_group(command, false)?;
        let status = child
            .wait()
            .await
            .map_err(|e| Error::Other(format!("wait on '{command}' failed: {e}")))?;

        #[cfg(unix)]
        let signal = {
            use std::os::unix::process::ExitStatusExt;
            status.signal()
        };
        #[cfg(not(unix))]
        let signal = None;

        Ok(OneshotOutcome { code: status.code(), signal })
    }
}
