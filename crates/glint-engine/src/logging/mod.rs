//! Logging utilities.
//!
//! Centralizes logger initialization (`env_logger` behind the `log` facade)
//! and the sink the render loop reports skipped frames to.

mod init;
mod sink;

pub use init::{init_logging, LoggingConfig};
pub use sink::{DiagnosticSink, LogSink};
