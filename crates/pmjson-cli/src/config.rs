//! Configuration loading from TOML files

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use pmjson_medline::{DEFAULT_INDEX, DEFAULT_WORKER_FRACTION};
use serde::Deserialize;

/// Settings read from `pmjson.toml`
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    pub workers: WorkersConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct WorkersConfig {
    /// Fraction of available parallelism
    pub fraction: f64,
    /// Upper bound on the derived worker count
    pub max: Option<usize>,
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self {
            fraction: DEFAULT_WORKER_FRACTION,
            max: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub index: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            index: DEFAULT_INDEX.to_string(),
        }
    }
}

impl FileConfig {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./pmjson.toml (current directory)
    /// 2. ~/.config/pmjson/config.toml
    ///
    /// If no config file found, returns default config.
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("pmjson.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(dirs) = directories::ProjectDirs::from("", "", "pmjson") {
            let user_config = dirs.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: FileConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }
}

/// Pool size: an explicit count wins; otherwise the fraction of this
/// machine's threads, capped by `max`
pub fn resolve_workers(explicit: Option<usize>, fraction: f64, max: Option<usize>) -> Result<usize> {
    if let Some(n) = explicit {
        anyhow::ensure!(n >= 1, "--workers must be at least 1");
        return Ok(n);
    }
    anyhow::ensure!(
        fraction.is_finite() && fraction > 0.0 && fraction <= 1.0,
        "worker fraction must be in (0, 1], got {fraction}"
    );
    let n = pmjson_medline::worker_count(fraction);
    Ok(match max {
        Some(cap) => n.min(cap.max(1)),
        None => n,
    })
}
