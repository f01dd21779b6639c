//! pmjson Core - Common infrastructure for citation conversion pipelines
//!
//! This crate provides the source-agnostic pieces: opening (optionally
//! gzipped) input files, writing JSON-lines output, logging, progress
//! reporting, and graceful shutdown.

pub mod error;
pub mod logging;
pub mod progress;
pub mod shutdown;
pub mod sink;
pub mod stream;

// Re-exports for convenience
pub use error::JobError;
pub use logging::{IndicatifLogger, init_logging};
pub use progress::{ProgressContext, fmt_num};
pub use shutdown::{is_shutdown_requested, request_shutdown, shutdown_flag};
pub use sink::{JsonLinesSink, cleanup_tmp_files};
pub use stream::{ByteCounter, InputReader, is_gzip, open_input};
