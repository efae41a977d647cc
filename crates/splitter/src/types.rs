//! Splitter type definitions.

use chrono::{DateTime, Utc};
use kbsplit_core::config::DEFAULT_CHUNK_SIZE;
use kbsplit_core::{AppConfig, AppError, AppResult, EmptyCategoryPolicy};
use serde::Serialize;

/// Tunables for one split run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitOptions {
    /// Read chunk size in bytes
    pub chunk_size: usize,

    /// Policy for categories with zero documents
    pub empty_categories: EmptyCategoryPolicy,

    /// Emit a progress event every N extracted objects (0 disables)
    pub progress_interval: u64,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            empty_categories: EmptyCategoryPolicy::Write,
            progress_interval: 100,
        }
    }
}

impl SplitOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            chunk_size: config.chunk_size,
            empty_categories: config.empty_categories,
            progress_interval: config.progress_interval,
        }
    }
}

/// Per-category tally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub category: String,

    /// Documents written
    pub count: u64,

    /// Documents lost to a failed sink
    pub dropped: u64,

    /// Whether an output file exists for this category
    pub created: bool,

    /// Destination location
    pub location: String,
}

/// A sink that failed during the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SinkFailure {
    pub category: String,
    pub location: String,
    pub error: String,
}

/// Summary of a split run.
#[derive(Debug, Clone, Serialize)]
pub struct SplitReport {
    /// When the run started
    pub started_at: DateTime<Utc>,

    /// Input file, when splitting a file
    pub input: Option<String>,

    /// Bytes consumed from the input
    pub bytes_read: u64,

    /// Complete top-level objects found by the scanner
    pub objects_extracted: u64,

    /// Objects that parsed as JSON and were classified
    pub objects_parsed: u64,

    /// Objects skipped because they failed to parse
    pub objects_skipped: u64,

    /// Counts in rule-table order, fallback last
    pub categories: Vec<CategoryCount>,

    /// Sinks that failed
    pub sink_failures: Vec<SinkFailure>,

    /// Whether the run stopped before end of input
    pub cancelled: bool,

    /// Structural error that ended the scan early (truncated or unbalanced
    /// input); the written files hold only the objects before it
    pub structural_error: Option<String>,

    /// Duration in seconds
    pub duration_secs: f64,
}

impl SplitReport {
    /// Documents written across all categories.
    pub fn total_written(&self) -> u64 {
        self.categories.iter().map(|c| c.count).sum()
    }

    /// Count for one category (0 when unknown).
    pub fn count_for(&self, category: &str) -> u64 {
        self.categories
            .iter()
            .find(|c| c.category == category)
            .map(|c| c.count)
            .unwrap_or(0)
    }

    /// Documents lost to failed sinks.
    pub fn total_dropped(&self) -> u64 {
        self.categories.iter().map(|c| c.dropped).sum()
    }

    /// True when the whole input was scanned and every parsed document
    /// reached its file.
    pub fn is_complete(&self) -> bool {
        !self.cancelled && self.structural_error.is_none() && self.sink_failures.is_empty()
    }

    /// Turn an incomplete run into the matching error.
    pub fn check(&self) -> AppResult<()> {
        if let Some(err) = &self.structural_error {
            return Err(AppError::Structural(err.clone()));
        }
        if self.cancelled {
            return Err(AppError::Cancelled);
        }
        if !self.sink_failures.is_empty() {
            let failed: Vec<String> = self
                .sink_failures
                .iter()
                .map(|f| format!("{} ({})", f.category, f.error))
                .collect();
            return Err(AppError::Sink(format!(
                "{} category file(s) failed: {}",
                failed.len(),
                failed.join(", ")
            )));
        }
        Ok(())
    }
}
