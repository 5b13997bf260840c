//! Tracing, trace visualization, and structured logging (spec §4.8, §4.9).

mod logger;
mod tracer;
mod visualizer;

pub use logger::Logger;
pub use tracer::{extract_attributes, extract_resource_id, TraceContext, TracedError, Tracer};
pub use visualizer::TraceVisualizer;
