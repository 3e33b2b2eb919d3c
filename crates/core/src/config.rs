//! Run configuration
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `APPROX_PI_LOG_THRESHOLD` | `1000000` | Run size above which worker logs are sampled |
//! | `APPROX_PI_LOG_EVERY` | `1000` | Sampling stride for large runs |
//!
//! ## Example
//!
//! ```rust,ignore
//! use approx_pi::{OutputConfig, RunConfig};
//!
//! let config = RunConfig::new(1_000_000, 4)
//!     .with_threads(2)
//!     .with_output(OutputConfig::disabled());
//! ```

use std::fs;
use std::io;
use std::path::PathBuf;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::partition::WorkerId;
use crate::sink::FileSink;

const DEFAULT_LOG_THRESHOLD: u64 = 1_000_000;
const DEFAULT_LOG_EVERY: u64 = 1_000;

/// Name of the summary file written next to the worker logs
pub const RESULTS_FILE: &str = "results.txt";

const WORKER_LOG_PREFIX: &str = "worker-output-";

/// Worker log volume control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Sampling {
    /// Runs with more iterations than this are sampled
    pub threshold: u64,
    /// Keep every `every`-th index once sampling kicks in
    pub every: u64,
}

impl Default for Sampling {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_LOG_THRESHOLD,
            every: DEFAULT_LOG_EVERY,
        }
    }
}

impl Sampling {
    /// Replace fields set by `APPROX_PI_LOG_THRESHOLD` / `APPROX_PI_LOG_EVERY`
    pub fn overlay_env(self) -> Self {
        let threshold = std::env::var("APPROX_PI_LOG_THRESHOLD")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(self.threshold);

        let every = std::env::var("APPROX_PI_LOG_EVERY")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|&v| v > 0)
            .unwrap_or(self.every);

        Self { threshold, every }
    }

    /// Log stride for a run of `total` iterations
    pub fn stride(&self, total: u64) -> u64 {
        if total > self.threshold {
            self.every.max(1)
        } else {
            1
        }
    }
}

/// Where and how much workers log
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub enabled: bool,
    pub directory: PathBuf,
    pub sampling: Sampling,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: PathBuf::from("output"),
            sampling: Sampling::default(),
        }
    }
}

impl OutputConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn in_directory(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            ..Self::default()
        }
    }

    pub fn worker_log_path(&self, id: WorkerId) -> PathBuf {
        self.directory.join(format!("{}{}.txt", WORKER_LOG_PREFIX, id))
    }

    pub fn results_path(&self) -> PathBuf {
        self.directory.join(RESULTS_FILE)
    }

    /// Create the output directory and clear logs left by a previous run
    ///
    /// No-op when output is disabled.
    pub fn prepare(&self) -> io::Result<()> {
        if !self.enabled {
            return Ok(());
        }
        fs::create_dir_all(&self.directory)?;
        for entry in fs::read_dir(&self.directory)? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name == RESULTS_FILE
                || (name.starts_with(WORKER_LOG_PREFIX) && name.ends_with(".txt"))
            {
                debug!(file = %name, "removing stale output");
                fs::remove_file(entry.path())?;
            }
        }
        Ok(())
    }

    /// Open the log for one worker, or `None` when disabled or unavailable
    pub fn open_sink(&self, id: WorkerId, total: u64) -> Option<FileSink> {
        if !self.enabled {
            return None;
        }
        let path = self.worker_log_path(id);
        match FileSink::create(&path, self.sampling.stride(total)) {
            Ok(sink) => Some(sink),
            Err(e) => {
                warn!(worker = %id, path = %path.display(), "worker log unavailable: {}", e);
                None
            }
        }
    }
}

/// Everything the supervisor needs for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Total series terms across all workers
    pub iterations: u64,
    /// Worker processes, including the calling one
    pub processes: u32,
    /// Threads per process; 0 runs a single worker inline
    pub threads: u32,
    pub output: OutputConfig,
}

impl RunConfig {
    pub fn new(iterations: u64, processes: u32) -> Self {
        Self {
            iterations,
            processes,
            threads: 0,
            output: OutputConfig::default(),
        }
    }

    pub fn with_threads(mut self, threads: u32) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_output(mut self, output: OutputConfig) -> Self {
        self.output = output;
        self
    }
}
