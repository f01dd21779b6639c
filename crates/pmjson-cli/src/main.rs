//! pmjson - MEDLINE citation XML to bulk-index JSON lines
//!
//! Converts every `*.xml` / `*.gz` file in an input directory into one
//! newline-delimited JSON file of index action/document pairs.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use clap::error::ErrorKind;
use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};
use pmjson_core::{ProgressContext, fmt_num, is_shutdown_requested, request_shutdown};
use pmjson_medline::Summary;

mod config;

use config::{FileConfig, resolve_workers};

const USAGE: &str = "pmjson [OPTIONS] <INPUT_DIR> <OUTPUT_DIR>";

/// Exit code after an interrupted run (128 + SIGINT)
const EXIT_INTERRUPTED: u8 = 130;

#[derive(Parser, Debug)]
#[command(name = "pmjson")]
#[command(about = "Convert MEDLINE citation XML into bulk-index JSON lines")]
#[command(version)]
#[command(override_usage = USAGE)]
struct Cli {
    /// Directory containing MEDLINE *.xml and *.gz files
    input_dir: PathBuf,

    /// Directory receiving one <name>.json per input file
    output_dir: PathBuf,

    /// Number of worker threads (overrides --worker-fraction)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Fraction of available CPUs to use for workers
    #[arg(long)]
    worker_fraction: Option<f64>,

    /// Index name written in every action line
    #[arg(long)]
    index: Option<String>,

    /// Config file path (default: ./pmjson.toml or ~/.config/pmjson/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            let rendered = e.render().to_string();
            if let Some(reason) = rendered.lines().next() {
                eprintln!("{reason}");
            }
            eprintln!("usage: {USAGE}");
            return ExitCode::from(1);
        }
    };

    // Progress context (TTY auto-detect)
    let progress = ProgressContext::new();

    // Logging:
    //   TTY:     quiet (warn) unless --debug, the progress bar shows activity
    //   non-TTY: info unless --debug, logs are the only progress indicator
    let is_tty = progress.is_tty();
    let multi = if is_tty { Some(progress.multi()) } else { None };
    let quiet = is_tty && !cli.debug;
    pmjson_core::init_logging(quiet, cli.debug, multi);

    match run(cli, &progress) {
        Ok(code) => code,
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli, progress: &ProgressContext) -> Result<ExitCode> {
    let file_config = match &cli.config {
        Some(path) => FileConfig::from_file(path)?,
        None => FileConfig::load()?,
    };

    let fraction = cli.worker_fraction.unwrap_or(file_config.workers.fraction);
    let workers = resolve_workers(cli.workers, fraction, file_config.workers.max)?;

    let config = pmjson_medline::Config {
        input_dir: cli.input_dir,
        output_dir: cli.output_dir,
        workers: Some(workers),
        worker_fraction: fraction,
        index: cli.index.unwrap_or(file_config.output.index),
    };

    setup_signal_handler()?;

    let summary = pmjson_medline::run(&config, progress)?;

    if progress.is_tty() {
        print_summary(&summary, progress);
    } else {
        summary.log();
    }

    if is_shutdown_requested() {
        log::warn!(
            "Interrupted: {} files not started",
            summary.skipped_files
        );
        return Ok(ExitCode::from(EXIT_INTERRUPTED));
    }
    Ok(ExitCode::SUCCESS)
}

fn setup_signal_handler() -> Result<()> {
    // First signal: stop starting new files
    // Second signal: exit immediately
    for signal in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM] {
        // SAFETY: the handler only performs an atomic swap and `_exit`,
        // both async-signal-safe
        let registered = unsafe {
            signal_hook::low_level::register(signal, || {
                if request_shutdown() {
                    signal_hook::low_level::exit(i32::from(EXIT_INTERRUPTED));
                }
            })
        };
        registered.with_context(|| format!("Failed to register handler for signal {signal}"))?;
    }
    Ok(())
}

fn print_summary(summary: &Summary, progress: &ProgressContext) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Files").fg(Color::Cyan),
            Cell::new("Count").fg(Color::Cyan),
        ]);

    table.add_row(vec!["Total".to_string(), fmt_num(summary.total_files)]);
    table.add_row(vec![
        Cell::new("Completed"),
        Cell::new(fmt_num(summary.completed_files)).fg(Color::Green),
    ]);
    if summary.failed_files > 0 {
        table.add_row(vec![
            Cell::new("Failed"),
            Cell::new(fmt_num(summary.failed_files)).fg(Color::Red),
        ]);
    }
    if summary.skipped_files > 0 {
        table.add_row(vec![
            Cell::new("Skipped"),
            Cell::new(fmt_num(summary.skipped_files)).fg(Color::Yellow),
        ]);
    }
    table.add_row(vec!["Records written".to_string(), fmt_num(summary.records_written)]);
    table.add_row(vec!["Records skipped".to_string(), fmt_num(summary.records_skipped)]);
    table.add_row(vec![
        "Time".to_string(),
        format!("{:.1}s", summary.elapsed.as_secs_f64()),
    ]);

    progress.println(format!("\n{table}"));
}
