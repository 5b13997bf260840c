//! `LongrunProcess` — a supervised, auto-restarting child with exponential
//! backoff (spec §4.7).
//!
//! Lifecycle: `down → starting → up → (backoff → starting → up)* →
//! stopping → down`.

use std::io;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;

use agentrt_domain::config::SupervisorConfig;
use agentrt_domain::Result;

use crate::pgkill::{signal_group, spawn_group};

const DEFAULT_MIN_RESTART_DELAY_MS: u64 = 100;
const DEFAULT_MAX_RESTART_DELAY_MS: u64 = 5000;
const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LongrunState {
    Down,
    Starting,
    Up,
    Backoff,
    Stopping,
}

#[derive(Debug, Clone)]
pub enum LongrunEvent {
    Starting,
    Up,
    Backoff { delay_ms: u64 },
    Stopping,
    Down,
}

/// Destination for a longrun's forwarded stdout/stderr lines. `LogWriter`
/// is the production implementation; tests use a recording stub.
pub trait LogSink: Send + Sync {
    fn write_line(&self, line: &str);
}

type SinkCell = Arc<Mutex<Option<Arc<dyn LogSink>>>>;

#[derive(Debug, Clone)]
pub struct LongrunConfig {
    pub command: String,
    pub min_restart_delay_ms: u64,
    pub max_restart_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl LongrunConfig {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            min_restart_delay_ms: DEFAULT_MIN_RESTART_DELAY_MS,
            max_restart_delay_ms: DEFAULT_MAX_RESTART_DELAY_MS,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }

    /// Builds a config from the runtime's `[supervisor]` TOML section plus
    /// the command this particular longrun should run.
    pub fn from_supervisor_config(command: impl Into<String>, cfg: &SupervisorConfig) -> Self {
        Self {
            command: command.into(),
            min_restart_delay_ms: cfg.min_restart_delay_ms,
            max_restart_delay_ms: cfg.max_restart_delay_ms,
            backoff_multiplier: cfg.backoff_multiplier,
        }
    }

    pub fn with_backoff(mut self, min_ms: u64, max_ms: u64) -> Self {
        self.min_restart_delay_ms = min_ms;
        self.max_restart_delay_ms = max_ms;
        self
    }
}

enum Control {
    Stop { timeout: Duration, ack: oneshot::Sender<()> },
}

/// A supervised `bash -c <command>`, one detached process group per spawn.
pub struct LongrunProcess {
    config: LongrunConfig,
    state: Arc<Mutex<LongrunState>>,
    want_up: Arc<AtomicBool>,
    events: broadcast::Sender<LongrunEvent>,
    control: Mutex<Option<mpsc::UnboundedSender<Control>>>,
    task: Mutex<Option<JoinHandle<()>>>,
    last_pid: Arc<AtomicU32>,
    stdout_sink: SinkCell,
    stderr_sink: SinkCell,
}

impl LongrunProcess {
    pub fn new(config: LongrunConfig) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            config,
            state: Arc::new(Mutex::new(LongrunState::Down)),
            want_up: Arc::new(AtomicBool::new(false)),
            events,
            control: Mutex::new(None),
            task: Mutex::new(None),
            last_pid: Arc::new(AtomicU32::new(0)),
            stdout_sink: Arc::new(Mutex::new(None)),
            stderr_sink: Arc::new(Mutex::new(None)),
        }
    }

    pub fn state(&self) -> LongrunState {
        *self.state.lock()
    }

    pub fn pid(&self) -> Option<u32> {
        match self.last_pid.load(Ordering::SeqCst) {
            0 => None,
            pid => Some(pid),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LongrunEvent> {
        self.events.subscribe()
    }

    /// Re-point where stdout lines are forwarded; takes effect immediately
    /// for any reader task currently running (spec §4.7: "re-pipes").
    pub fn set_stdout_sink(&self, sink: Arc<dyn LogSink>) {
        *self.stdout_sink.lock() = Some(sink);
    }

    pub fn set_stderr_sink(&self, sink: Arc<dyn LogSink>) {
        *self.stderr_sink.lock() = Some(sink);
    }

    /// Sets the want-up latch and spawns the supervising task if one isn't
    /// already running (idempotent while already up).
    pub fn start(&self) {
        self.want_up.store(true, Ordering::SeqCst);

        let mut task = self.task.lock();
        if task.is_some() {
            return;
        }

        let (control_tx, control_rx) = mpsc::unbounded_channel();
        *self.control.lock() = Some(control_tx);

        *task = Some(tokio::spawn(run(
            self.config.clone(),
            self.state.clone(),
            self.want_up.clone(),
            self.events.clone(),
            self.last_pid.clone(),
            self.stdout_sink.clone(),
            self.stderr_sink.clone(),
            control_rx,
        )));
    }

    /// Graceful stop (spec §4.7): clears the latch, `SIGTERM`s the process
    /// group, escalates to `SIGKILL` if `timeout` elapses, resolves once
    /// the child has exited.
    pub async fn stop(&self, timeout: Duration) -> Result<()> {
        let control_tx = self.control.lock().clone();
        let Some(control_tx) = control_tx else {
            *self.state.lock() = LongrunState::Down;
            return Ok(());
        };

        let (ack_tx, ack_rx) = oneshot::channel();
        if control_tx.send(Control::Stop { timeout, ack: ack_tx }).is_err() {
            return Ok(());
        }
        let _ = ack_rx.await;

        let handle = self.task.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
        Ok(())
    }
}

fn forward_lines(stream: impl tokio::io::AsyncRead + Unpin + Send + 'static, sink: SinkCell) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if let Some(sink) = sink.lock().clone() {
                        sink.write_line(&line);
                    }
                }
                _ => break,
            }
        }
    });
}

#[allow(clippy::too_many_arguments)]
async fn run(
    config: LongrunConfig,
    state: Arc<Mutex<LongrunState>>,
    want_up: Arc<AtomicBool>,
    events: broadcast::Sender<LongrunEvent>,
    last_pid: Arc<AtomicU32>,
    stdout_sink: SinkCell,
    stderr_sink: SinkCell,
    mut control_rx: mpsc::UnboundedReceiver<Control>,
) {
    let mut delay = config.min_restart_delay_ms;

    loop {
        if !want_up.load(Ordering::SeqCst) {
            break;
        }

        *state.lock() = LongrunState::Starting;
        let _ = events.send(LongrunEvent::Starting);

        let mut child = match spawn_group(&config.command, true) {
            Ok(child) => child,
            Err(_) => {
                if !back_off(&state, &events, &mut delay, &config, &mut control_rx).await {
                    return;
                }
                continue;
            }
        };

        if let Some(pid) = child.id() {
            last_pid.store(pid, Ordering::SeqCst);
        }
        if let Some(stdout) = child.stdout.take() {
            forward_lines(stdout, stdout_sink.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            forward_lines(stderr, stderr_sink.clone());
        }

        *state.lock() = LongrunState::Up;
        let _ = events.send(LongrunEvent::Up);

        tokio::select! {
            _ = child.wait() => {
                if !want_up.load(Ordering::SeqCst) {
                    *state.lock() = LongrunState::Down;
                    let _ = events.send(LongrunEvent::Down);
                    break;
                }
                if !back_off(&state, &events, &mut delay, &config, &mut control_rx).await {
                    return;
                }
            }
            Some(ctrl) = control_rx.recv() => {
                let Control::Stop { timeout, ack } = ctrl;
                graceful_stop(&mut child, timeout, &state, &events, &want_up).await;
                let _ = ack.send(());
                return;
            }
        }
    }
}

/// Transitions to `Backoff`, emits the current delay, sleeps (interruptible
/// by a pending stop), then doubles the delay up to the configured max.
/// Returns `false` if a stop request was serviced during the sleep.
async fn back_off(
    state: &Arc<Mutex<LongrunState>>,
    events: &broadcast::Sender<LongrunEvent>,
    delay: &mut u64,
    config: &LongrunConfig,
    control_rx: &mut mpsc::UnboundedReceiver<Control>,
) -> bool {
    *state.lock() = LongrunState::Backoff;
    let _ = events.send(LongrunEvent::Backoff { delay_ms: *delay });

    tokio::select! {
        _ = tokio::time::sleep(Duration::from_millis(*delay)) => {
            let doubled = (*delay as f64 * config.backoff_multiplier).round() as u64;
            *delay = doubled.min(config.max_restart_delay_ms);
            true
        }
        Some(ctrl) = control_rx.recv() => {
            let Control::Stop { ack, .. } = ctrl;
            *state.lock() = LongrunState::Down;
            let _ = events.send(LongrunEvent::Down);
            let _ = ack.send(());
            false
        }
    }
}

async fn graceful_stop(
    child: &mut tokio::process::Child,
    timeout: Duration,
    state: &Arc<Mutex<LongrunState>>,
    events: &broadcast::Sender<LongrunEvent>,
    want_up: &Arc<AtomicBool>,
) {
    want_up.store(false, Ordering::SeqCst);
    *state.lock() = LongrunState::Stopping;
    let _ = events.send(LongrunEvent::Stopping);

    if let Some(pid) = child.id() {
        signal_group(pid, libc::SIGTERM);
    }
    if tokio::time::timeout(timeout, child.wait()).await.is_err() {
        if let Some(pid) = child.id() {
            signal_group(pid, libc::SIGKILL);
        }
        let _: io::Result<_> = child.wait().await;
    }

    *state.lock() = LongrunState::Down;
    let _ = events.send(LongrunEvent::Down);
}
