//! pmjson MEDLINE - MEDLINE citation XML to bulk-index JSON lines
//!
//! Converts a directory of MEDLINE/PubMed citation files (`*.xml`, `*.gz`)
//! into one newline-delimited JSON file per input, each citation written
//! as an index action line followed by its document line.
//!
//! # Features
//!
//! - Streaming XML parsing with quick-xml, one citation in memory at a time
//! - Transparent gzip decompression
//! - Parallel processing with rayon, progress reported from a single thread
//!
//! # Example
//!
//! ```ignore
//! use pmjson_core::ProgressContext;
//! use pmjson_medline::{Config, run};
//!
//! let config = Config {
//!     input_dir: "baseline".into(),
//!     output_dir: "json".into(),
//!     ..Default::default()
//! };
//!
//! let summary = run(&config, &ProgressContext::new())?;
//! println!("Wrote {} records", summary.records_written);
//! ```

pub mod config;
pub mod converter;
pub mod extract;
pub mod reader;
pub mod record;
pub mod runner;

// Re-exports
pub use config::{Config, DEFAULT_WORKER_FRACTION, worker_count};
pub use converter::{ConversionJob, FileStats, convert_file, output_path};
pub use extract::{ExtractError, extract};
pub use reader::{CitationReader, Element, ReadError};
pub use record::{DEFAULT_INDEX, DocumentRecord, IndexAction};
pub use runner::{Summary, discover_inputs, run, run_until};
