//! Main runner for the MEDLINE → JSON-lines pipeline

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use pmjson_core::{JobError, ProgressContext, cleanup_tmp_files, fmt_num, shutdown_flag};
use rayon::prelude::*;

use crate::config::Config;
use crate::converter::{ConversionJob, FileStats, convert_file};

/// Input globs, matched directly inside the input directory
pub const INPUT_PATTERNS: [&str; 2] = ["*.xml", "*.gz"];

/// Pipeline execution summary
#[derive(Debug, Default)]
pub struct Summary {
    pub total_files: usize,
    pub completed_files: usize,
    pub failed_files: usize,
    /// Not started because shutdown was requested
    pub skipped_files: usize,
    pub records_written: usize,
    pub records_skipped: usize,
    /// Completion events consumed by the progress reporter
    pub progress_events: usize,
    pub elapsed: Duration,
}

impl Summary {
    pub fn log(&self) {
        log::info!("=== MEDLINE Conversion Summary ===");
        log::info!(
            "Files: {}/{} completed ({} failed, {} skipped)",
            self.completed_files,
            self.total_files,
            self.failed_files,
            self.skipped_files
        );
        log::info!(
            "Records: {} written, {} skipped",
            fmt_num(self.records_written),
            fmt_num(self.records_skipped)
        );
        log::info!("Time: {:.1}s", self.elapsed.as_secs_f64());

        if let Some(rate) = self.records_per_sec() {
            log::info!("Throughput: {:.0} records/sec", rate);
        }
    }

    /// Records written per second, when both counts are non-zero
    pub fn records_per_sec(&self) -> Option<f64> {
        let secs = self.elapsed.as_secs_f64();
        (self.records_written > 0 && secs > 0.0).then(|| self.records_written as f64 / secs)
    }
}

/// How one job ended
#[derive(Debug)]
pub enum Outcome {
    Converted(FileStats),
    Failed(JobError),
    Skipped,
}

/// Sent by a worker when its job ends, whatever the outcome
#[derive(Debug)]
pub struct Completion {
    pub label: String,
    pub outcome: Outcome,
}

/// Run the pipeline, honoring the process-wide shutdown flag
pub fn run(config: &Config, progress: &ProgressContext) -> Result<Summary> {
    run_until(config, progress, shutdown_flag())
}

/// Run the pipeline; once `stop` is set no further job starts.
///
/// Blocks until every job has completed and every completion has been
/// reported.
pub fn run_until(config: &Config, progress: &ProgressContext, stop: &AtomicBool) -> Result<Summary> {
    let start = Instant::now();

    let inputs = discover_inputs(&config.input_dir)?;

    std::fs::create_dir_all(&config.output_dir).with_context(|| {
        format!(
            "Failed to create output directory {}",
            config.output_dir.display()
        )
    })?;
    cleanup_tmp_files(&config.output_dir).context("Failed to clean stale tmp files")?;

    let jobs = plan_jobs(inputs, &config.output_dir);
    let total_files = jobs.len();
    let workers = config.pool_size();
    log::info!(
        "Converting {} files from {} with {} workers",
        total_files,
        config.input_dir.display(),
        workers
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("pmjson-worker-{i}"))
        .build()
        .context("Failed to create thread pool")?;

    let (tx, rx) = mpsc::channel::<Completion>();

    let tally = std::thread::scope(|scope| {
        let reporter = scope.spawn(move || report(rx, total_files, progress));

        pool.install(|| {
            jobs.par_iter().for_each_with(tx, |tx, job| {
                let outcome = if stop.load(Ordering::Relaxed) {
                    Outcome::Skipped
                } else {
                    match convert_file(job, &config.index) {
                        Ok(stats) => Outcome::Converted(stats),
                        Err(e) => Outcome::Failed(e),
                    }
                };
                // Reporter holds the receiver until every sender is dropped
                let _ = tx.send(Completion {
                    label: job.label(),
                    outcome,
                });
            });
        });

        reporter
            .join()
            .map_err(|_| anyhow!("progress reporter panicked"))
    })?;

    Ok(Summary {
        total_files,
        completed_files: tally.completed,
        failed_files: tally.failed,
        skipped_files: tally.skipped,
        records_written: tally.records_written,
        records_skipped: tally.records_skipped,
        progress_events: tally.events,
        elapsed: start.elapsed(),
    })
}

/// Counters owned by the reporter thread
#[derive(Debug, Default)]
struct Tally {
    events: usize,
    completed: usize,
    failed: usize,
    skipped: usize,
    records_written: usize,
    records_skipped: usize,
}

/// Single consumer of completion events: owns the counters and the bar
fn report(rx: Receiver<Completion>, total: usize, progress: &ProgressContext) -> Tally {
    let pb = progress.files_bar(total);
    let mut tally = Tally::default();

    for Completion { label, outcome } in rx {
        tally.events += 1;
        match outcome {
            Outcome::Converted(stats) => {
                tally.completed += 1;
                tally.records_written += stats.records_written;
                tally.records_skipped += stats.records_skipped;
                log::info!(
                    "[{}/{}] {}: {} records ({} skipped), {:.1} MB [{:.1}s]",
                    tally.events,
                    total,
                    label,
                    fmt_num(stats.records_written),
                    stats.records_skipped,
                    stats.bytes_read as f64 / 1_000_000.0,
                    stats.elapsed.as_secs_f64()
                );
            }
            Outcome::Failed(e) => {
                tally.failed += 1;
                log::error!("[{}/{}] {}: {}", tally.events, total, label, e);
            }
            Outcome::Skipped => {
                tally.skipped += 1;
                log::warn!("[{}/{}] {}: skipped (shutdown requested)", tally.events, total, label);
            }
        }
        pb.inc(1);
        pb.set_message(label);
    }

    pb.finish_and_clear();
    tally
}

/// Regular files directly in `dir` matching [`INPUT_PATTERNS`].
///
/// Each pattern's matches are sorted; `*.xml` matches come first.
/// Hidden files are ignored.
pub fn discover_inputs(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        anyhow::bail!("Input directory not found: {}", dir.display());
    }

    let options = glob::MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: true,
    };
    let escaped = glob::Pattern::escape(&dir.to_string_lossy());

    let mut files = Vec::new();
    for pattern in INPUT_PATTERNS {
        let full = format!("{escaped}/{pattern}");
        let mut matches: Vec<PathBuf> = glob::glob_with(&full, options)
            .with_context(|| format!("Invalid input pattern {full}"))?
            .filter_map(|entry| match entry {
                Ok(path) => Some(path),
                Err(e) => {
                    log::warn!("Cannot read {}: {}", e.path().display(), e.error());
                    None
                }
            })
            .filter(|path| path.is_file())
            .collect();
        matches.sort();
        files.extend(matches);
    }

    Ok(files)
}

/// One job per input; inputs whose output name is already taken
/// (e.g., `a.xml` and `a.xml.gz`) are dropped with a warning so no two
/// jobs share an output file.
fn plan_jobs(inputs: Vec<PathBuf>, output_dir: &Path) -> Vec<ConversionJob> {
    let mut claimed = HashSet::new();
    let mut jobs = Vec::with_capacity(inputs.len());
    for input in inputs {
        let job = ConversionJob::new(input, output_dir);
        if claimed.insert(job.output_path()) {
            jobs.push(job);
        } else {
            log::warn!(
                "{}: output {} already produced by another input, skipping",
                job.input.display(),
                job.output_path().display()
            );
        }
    }
    jobs
}
