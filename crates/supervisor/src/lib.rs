//! Local, single-host process supervision: auto-restarting longruns with
//! exponential backoff, rotating log writers, and one-shot init/teardown
//! commands (spec §4.7), inspired by the s6 family.

mod log_writer;
mod longrun;
mod oneshot_process;
mod pgkill;
mod tree;

pub use log_writer::{LogWriter, LogWriterConfig};
pub use longrun::{LogSink, LongrunConfig, LongrunEvent, LongrunProcess, LongrunState};
pub use oneshot_process::{OneshotOutcome, OneshotProcess};
pub use tree::SupervisionTree;
