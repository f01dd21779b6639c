//! Per-file conversion: input XML → `<base>.json` bulk-index lines

use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use pmjson_core::{JobError, JsonLinesSink};

use crate::extract::extract;
use crate::reader::{CitationReader, ReadError};
use crate::record::IndexAction;

/// One input file to convert into one output file under `output_dir`
#[derive(Debug, Clone)]
pub struct ConversionJob {
    pub input: PathBuf,
    pub output_dir: PathBuf,
}

impl ConversionJob {
    pub fn new(input: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output_dir: output_dir.into(),
        }
    }

    /// File name of the input, for progress and logs
    pub fn label(&self) -> String {
        self.input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.input.display().to_string())
    }

    pub fn output_path(&self) -> PathBuf {
        output_path(&self.input, &self.output_dir)
    }
}

/// Statistics from converting a single file
#[derive(Debug, Clone, Default)]
pub struct FileStats {
    pub records_written: usize,
    /// Citations dropped for a missing required field
    pub records_skipped: usize,
    /// Input bytes read from disk (compressed size for `.gz`)
    pub bytes_read: u64,
    pub elapsed: Duration,
}

/// Output path for an input file: base name up to the first `.`, plus `.json`
/// (e.g., "pubmed26n0001.xml.gz" -> "pubmed26n0001.json")
pub fn output_path(input: &Path, output_dir: &Path) -> PathBuf {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let base = name.split('.').next().unwrap_or_default();
    output_dir.join(format!("{base}.json"))
}

/// Convert one input file.
///
/// Stale output is deleted first. Citations missing PMID or journal title
/// are logged and skipped; a read/parse failure fails the whole file and
/// leaves no output behind.
pub fn convert_file(job: &ConversionJob, index: &str) -> Result<FileStats, JobError> {
    let start = Instant::now();
    let label = job.label();

    // Stale output goes first, so even an unopenable input leaves none
    let mut sink = JsonLinesSink::create(&job.output_path()).map_err(JobError::Write)?;
    let (citations, bytes_read) = CitationReader::open(&job.input).map_err(JobError::Open)?;

    let mut stats = FileStats::default();
    for citation in citations {
        let citation =
            citation.map_err(|e: ReadError| JobError::Parse(format!("{label}: {e}")))?;

        match extract(&citation) {
            Ok(record) => {
                sink.write_pair(&IndexAction::new(index, &record), &record)
                    .map_err(JobError::Write)?;
            }
            Err(e) => {
                stats.records_skipped += 1;
                log::warn!("{label}: skipping citation: {e}");
            }
        }
    }

    stats.records_written = sink.finalize().map_err(JobError::Write)?;
    stats.bytes_read = bytes_read.load(Ordering::Relaxed);
    stats.elapsed = start.elapsed();

    log::debug!(
        "{}: {} records written, {} skipped [{:.1}s]",
        label,
        stats.records_written,
        stats.records_skipped,
        stats.elapsed.as_secs_f64()
    );

    Ok(stats)
}
