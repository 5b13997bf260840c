//! `SupervisionTree` — owns named longruns and their stdout/stderr log
//! writers. A dead log writer is respawned and re-piped without disturbing
//! the longrun it's attached to (spec §4.7).

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use agentrt_domain::config::SupervisorConfig;
use agentrt_domain::Result;

use crate::log_writer::{LogWriter, LogWriterConfig};
use crate::longrun::{LongrunConfig, LongrunEvent, LongrunProcess, LongrunState};

const LOG_WATCH_INTERVAL_MS: u64 = 50;

struct Entry {
    longrun: Arc<LongrunProcess>,
    stdout: Mutex<Arc<LogWriter>>,
    stderr: Mutex<Arc<LogWriter>>,
}

pub struct SupervisionTree {
    entries: Mutex<HashMap<String, Arc<Entry>>>,
    log_root: PathBuf,
    config: SupervisorConfig,
}

impl SupervisionTree {
    pub fn new(log_root: impl Into<PathBuf>) -> Self {
        Self::with_config(log_root, SupervisorConfig::default())
    }

    /// Builds a tree whose log writers and respawn delay come from the
    /// runtime's `[supervisor]` TOML section.
    pub fn with_config(log_root: impl Into<PathBuf>, config: SupervisorConfig) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            log_root: log_root.into(),
            config,
        }
    }

    /// Registers `name`: spawns its stdout/stderr log writers, pipes the
    /// longrun's child output into them, starts the longrun, and begins
    /// watching both writers for unexpected death.
    pub fn register(&self, name: &str, config: LongrunConfig) -> Result<()> {
        let longrun = Arc::new(LongrunProcess::new(config));
        let stdout = Arc::new(self.spawn_writer(name, "out")?);
        let stderr = Arc::new(self.spawn_writer(name, "err")?);

        longrun.set_stdout_sink(stdout.clone());
        longrun.set_stderr_sink(stderr.clone());
        longrun.start();

        let entry = Arc::new(Entry {
            longrun: longrun.clone(),
            stdout: Mutex::new(stdout),
            stderr: Mutex::new(stderr),
        });
        self.entries.lock().insert(name.to_string(), entry.clone());

        self.watch_transitions(name.to_string(), longrun.clone());
        self.watch_log_writers(name.to_string(), entry);

        Ok(())
    }

    /// Builds a longrun config from this tree's `[supervisor]` section and
    /// registers it in one step.
    pub fn register_from_config(&self, name: &str, command: impl Into<String>) -> Result<()> {
        self.register(name, LongrunConfig::from_supervisor_config(command, &self.config))
    }

    fn spawn_writer(&self, name: &str, stream: &str) -> Result<LogWriter> {
        LogWriter::spawn(LogWriterConfig::from_supervisor_config(
            self.log_root.join(name).join(stream),
            &self.config,
        ))
    }

    pub fn longrun(&self, name: &str) -> Option<Arc<LongrunProcess>> {
        self.entries.lock().get(name).map(|e| e.longrun.clone())
    }

    pub fn state(&self, name: &str) -> Option<LongrunState> {
        self.entries.lock().get(name).map(|e| e.longrun.state())
    }

    pub async fn stop(&self, name: &str, timeout: Duration) -> Result<()> {
        let longrun = self.entries.lock().get(name).map(|e| e.longrun.clone());
        if let Some(longrun) = longrun {
            longrun.stop(timeout).await?;
        }
        Ok(())
    }

    fn watch_transitions(&self, name: String, longrun: Arc<LongrunProcess>) {
        let mut rx = longrun.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(LongrunEvent::Backoff { delay_ms }) => {
                        tracing::warn!(process = %name, delay_ms, "longrun backing off");
                    }
                    Ok(LongrunEvent::Down) => {
                        tracing::info!(process = %name, "longrun down");
                    }
                    Ok(_) => {}
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }

    /// Polls both writers; if one has stopped running (panic, not a
    /// deliberate `close()`), respawns it after the configured respawn
    /// delay and re-pipes the longrun's output into the replacement.
    fn watch_log_writers(&self, name: String, entry: Arc<Entry>) {
        let log_root = self.log_root.clone();
        let respawn_delay_ms = self.config.log_writer_respawn_delay_ms;
        let config = self.config.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_millis(LOG_WATCH_INTERVAL_MS)).await;

                let dead_stdout = entry.stdout.lock().is_finished();
                let dead_stderr = entry.stderr.lock().is_finished();
                if !dead_stdout && !dead_stderr {
                    continue;
                }

                tokio::time::sleep(Duration::from_millis(respawn_delay_ms)).await;

                if dead_stdout {
                    if let Ok(fresh) =
                        LogWriter::spawn(LogWriterConfig::from_supervisor_config(log_root.join(&name).join("out"), &config))
                    {
                        let fresh = Arc::new(fresh);
                        entry.longrun.set_stdout_sink(fresh.clone());
                        *entry.stdout.lock() = fresh;
                    }
                }
                if dead_stderr {
                    if let Ok(fresh) =
                        LogWriter::spawn(LogWriterConfig::from_supervisor_config(log_root.join(&name).join("err"), &config))
                    {
                        let fresh = Arc::new(fresh);
                        entry.longrun.set_stderr_sink(fresh.clone());
                        *entry.stderr.lock() = fresh;
                    }
                }
            }
        });
    }
}
