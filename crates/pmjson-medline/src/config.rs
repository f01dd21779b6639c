//! MEDLINE conversion configuration

use std::path::PathBuf;

use crate::record::DEFAULT_INDEX;

/// Share of hardware threads used for workers when no explicit count is set
pub const DEFAULT_WORKER_FRACTION: f64 = 0.7;

/// Runtime configuration for a conversion run
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory scanned (non-recursively) for `*.xml` and `*.gz`
    pub input_dir: PathBuf,
    /// Directory receiving one `<base>.json` per input
    pub output_dir: PathBuf,
    /// Explicit pool size; overrides `worker_fraction`
    pub workers: Option<usize>,
    /// Fraction of available parallelism to use
    pub worker_fraction: f64,
    /// `_index` written in every action line
    pub index: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("input"),
            output_dir: PathBuf::from("output"),
            workers: None,
            worker_fraction: DEFAULT_WORKER_FRACTION,
            index: DEFAULT_INDEX.to_string(),
        }
    }
}

impl Config {
    /// Number of pool threads for this run (at least 1)
    pub fn pool_size(&self) -> usize {
        match self.workers {
            Some(n) => n.max(1),
            None => worker_count(self.worker_fraction),
        }
    }
}

/// Workers for a fraction of this machine's parallelism
pub fn worker_count(fraction: f64) -> usize {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    scaled_workers(cpus, fraction)
}

/// `floor(cpus * fraction)`, at least 1; non-finite or negative fractions
/// count as 0
fn scaled_workers(cpus: usize, fraction: f64) -> usize {
    let fraction = if fraction.is_finite() {
        fraction.max(0.0)
    } else {
        0.0
    };
    ((cpus as f64 * fraction).floor() as usize).max(1)
}
