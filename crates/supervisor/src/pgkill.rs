//! Process-group spawn/signal helpers (spec §4.7, §9 design note: "a
//! language-neutral approach spawns each child in its own group and
//! signals the negative PID").

use std::process::Stdio;

use tokio::process::{Child, Command};

use agentrt_domain::{Error, Result};

/// Spawn `bash -c <command>` as the leader of a brand new process group,
/// so `signal_group` reaches every descendant the command forks.
pub fn spawn_group(command: &str, piped: bool) -> Result<Child> {
    let mut cmd = Command::new("bash");
    cmd.arg("-c").arg(command);
    if piped {
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
    } else {
        cmd.stdout(Stdio::null()).stderr(Stdio::null());
    }

    #[cfg(unix)]
    unsafe {
        use std::os::unix::process::CommandExt;
        cmd.pre_exec(|| {
            if libc::setsid() == -1 {
                return Err(std::io::Error::last_os_error());
            }
            Ok(())
        });
    }

    cmd.spawn()
        .map_err(|e| Error::Other(format!("spawn '{command}' failed: {e}")))
}

/// `kill(2)` the whole group led by `pid` (negative pid signals the group).
#[cfg(unix)]
pub fn signal_group(pid: u32, signal: libc::c_int) {
    unsafe {
        libc::kill(-(pid as libc::pid_t), signal);
    }
}

#[cfg(not(unix))]
pub fn signal_group(_pid: u32, _signal: i32) {}
