//! `LogWriter` — a line-delimited append log with size-based rotation,
//! serialized through an internal queue (spec §4.7).

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex as StdMutex;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use agentrt_domain::config::SupervisorConfig as RuntimeSupervisorConfig;
use agentrt_domain::{Error, Result};

use crate::longrun::LogSink;

const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024;
const DEFAULT_MAX_FILES: usize = 10;

#[derive(Debug, Clone)]
pub struct LogWriterConfig {
    pub dir: PathBuf,
    pub max_file_size: u64,
    pub max_files: usize,
    pub timestamp: bool,
}

impl LogWriterConfig {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_files: DEFAULT_MAX_FILES,
            timestamp: false,
        }
    }

    pub fn with_timestamp(mut self, timestamp: bool) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    pub fn with_max_files(mut self, count: usize) -> Self {
        self.max_files = count;
        self
    }

    /// Builds a config from the runtime's `[supervisor]` TOML section plus
    /// the directory this particular writer owns.
    pub fn from_supervisor_config(dir: impl Into<PathBuf>, cfg: &RuntimeSupervisorConfig) -> Self {
        Self {
            dir: dir.into(),
            max_file_size: cfg.log_max_file_size,
            max_files: cfg.log_max_files,
            timestamp: true,
        }
    }
}

enum Msg {
    Line(String),
    Close(oneshot::Sender<()>),
}

/// Writes go through an unbounded queue so concurrent callers never
/// interleave partial lines; `run` is the sole writer of `<dir>/current`.
pub struct LogWriter {
    tx: mpsc::UnboundedSender<Msg>,
    handle: StdMutex<Option<JoinHandle<()>>>,
}

impl LogWriter {
    pub fn spawn(config: LogWriterConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.dir)?;
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run(config, rx));
        Ok(Self {
            tx,
            handle: StdMutex::new(Some(handle)),
        })
    }

    pub fn write(&self, line: &str) -> Result<()> {
        self.tx
            .send(Msg::Line(line.to_string()))
            .map_err(|_| Error::Other("log writer closed".into()))
    }

    /// True once the internal task has stopped running, whether from an
    /// explicit `close()` or an unexpected panic.
    pub fn is_finished(&self) -> bool {
        match self.handle.lock().unwrap().as_ref() {
            Some(handle) => handle.is_finished(),
            None => true,
        }
    }

    /// Flushes pending writes and joins the internal task.
    pub async fn close(&self) -> Result<()> {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(Msg::Close(ack_tx)).is_err() {
            return Ok(());
        }
        let _ = ack_rx.await;
        let handle = self.handle.lock().unwrap().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
        Ok(())
    }
}

impl LogSink for LogWriter {
    fn write_line(&self, line: &str) {
        let _ = self.write(line);
    }
}

async fn run(config: LogWriterConfig, mut rx: mpsc::UnboundedReceiver<Msg>) {
    let current = config.dir.join("current");
    let mut size = current.metadata().map(|m| m.len()).unwrap_or(0);

    while let Some(msg) = rx.recv().await {
        match msg {
            Msg::Line(line) => {
                let record = if config.timestamp {
                    format!("{} {line}\n", chrono::Utc::now().to_rfc3339())
                } else {
                    format!("{line}\n")
                };

                if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(&current) {
                    if file.write_all(record.as_bytes()).is_ok() {
                        size += record.len() as u64;
                    }
                }

                if size >= config.max_file_size {
                    rotate(&config, &current);
                    size = 0;
                }
            }
            Msg::Close(ack) => {
                let _ = ack.send(());
                break;
            }
        }
    }
}

/// `@<ISO8601 with ':' and '.' replaced by '-', 'T' by '_', trailing 'Z'
/// removed>.s` (spec §6 "Log archive names").
fn archive_name() -> String {
    let stamp = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string();
    let stamp = stamp.replace(':', "-").replace('.', "-").replace('T', "_");
    let stamp = stamp.strip_suffix('Z').unwrap_or(&stamp).to_string();
    format!("@{stamp}.s")
}

fn rotate(config: &LogWriterConfig, current: &Path) {
    let archive = config.dir.join(archive_name());
    if std::fs::rename(current, &archive).is_err() {
        return;
    }
    prune(config);
}

/// Archives are pruned lexicographically sorted descending, keeping the
/// top `maxFiles` (spec §6).
fn prune(config: &LogWriterConfig) {
    let Ok(entries) = std::fs::read_dir(&config.dir) else {
        return;
    };
    let mut archives: Vec<_> = entries
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.file_name()
                .to_str()
                .map(|n| n.starts_with('@') && n.ends_with(".s"))
                .unwrap_or(false)
        })
        .map(|e| e.path())
        .collect();
    archives.sort();
    archives.reverse();

    for stale in archives.into_iter().skip(config.max_files) {
        let _ = std::fs::remove_file(stale);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_lines_and_flushes_on_close() {
        let dir = tempfile::tempdir().unwrap();
        let writer = LogWriter::spawn(LogWriterConfig::new(dir.path())).unwrap();
        writer.write("line one").unwrap();
        writer.write("line two").unwrap();
        writer.close().await.unwrap();

        let content = std::fs::read_to_string(dir.path().join("current")).unwrap();
        assert_eq!(content, "line one\nline two\n");
        assert!(writer.is_finished());
    }

    #[tokio::test]
    async fn rotates_when_max_file_size_is_exceeded() {
        let dir = tempfile::tempdir().unwrap();
        let config = LogWriterConfig::new(dir.path()).with_max_file_size(10);
        let writer = LogWriter::spawn(config).unwrap();
        writer.write("0123456789").unwrap();
        writer.write("next file").unwrap();
        writer.close().await.unwrap();

        let archives: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_str().unwrap().starts_with('@'))
            .collect();
        assert_eq!(archives.len(), 1);

        let current = std::fs::read_to_string(dir.path().join("current")).unwrap();
        assert_eq!(current, "next file\n");
    }

    #[tokio::test]
    async fn prunes_oldest_archives_beyond_max_files() {
        let dir = tempfile::tempdir().unwrap();
        let config = LogWriterConfig::new(dir.path())
            .with_max_file_size(1)
            .with_max_files(2);
        let writer = LogWriter::spawn(config).unwrap();
        for i in 0..5 {
            writer.write(&format!("line {i}")).unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }
        writer.close().await.unwrap();

        let archives: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_str().unwrap().starts_with('@'))
            .collect();
        assert!(archives.len() <= 2, "expected at most 2 archives, got {}", archives.len());
    }
}
