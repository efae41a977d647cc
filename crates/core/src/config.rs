//! Configuration management for the splitter.
//!
//! Configuration is merged from several sources, lowest precedence first:
//! - Built-in defaults
//! - Config file (`kbsplit.yaml`, or the path given by `KBSPLIT_CONFIG` / `--config`)
//! - Environment variables
//! - Command-line flags
//!
//! The rule table itself is interpreted by the splitter crate; this module
//! only carries the raw entries.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Default read chunk size in bytes.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Default name of the catch-all category.
pub const DEFAULT_FALLBACK: &str = "General";

/// Config file looked up in the current directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "kbsplit.yaml";

/// What to do with categories that receive no documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmptyCategoryPolicy {
    /// Open every category file up front; empty ones end up as `[\n\n]`.
    #[default]
    Write,
    /// Only create a category file once its first document arrives.
    Skip,
}

/// One ordered entry of the category rule table, as written in config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleConfig {
    pub name: String,
    pub keywords: Vec<String>,
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Config file that was merged, if any
    pub config_file: Option<PathBuf>,

    /// Input JSON array file
    pub input: Option<PathBuf>,

    /// Directory receiving one `<category>.json` per category
    pub output_dir: PathBuf,

    /// Read chunk size in bytes
    pub chunk_size: usize,

    /// Name of the catch-all category
    pub fallback: String,

    /// Policy for categories with zero documents
    pub empty_categories: EmptyCategoryPolicy,

    /// Emit a progress event every N extracted objects
    pub progress_interval: u64,

    /// Rule table override (None = built-in table)
    pub rules: Option<Vec<RuleConfig>>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    input: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    chunk_size: Option<usize>,
    fallback: Option<String>,
    empty_categories: Option<EmptyCategoryPolicy>,
    progress_interval: Option<u64>,
    rules: Option<Vec<RuleConfig>>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_file: None,
            input: None,
            output_dir: PathBuf::from("split"),
            chunk_size: DEFAULT_CHUNK_SIZE,
            fallback: DEFAULT_FALLBACK.to_string(),
            empty_categories: EmptyCategoryPolicy::default(),
            progress_interval: 100,
            rules: None,
            log_level: None,
            verbose: false,
            no_color: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, a config file and environment variables.
    ///
    /// The config file is `config_file` when given, else `KBSPLIT_CONFIG`,
    /// else `./kbsplit.yaml` if it exists. An explicitly named file that does
    /// not exist is an error.
    ///
    /// Environment variables:
    /// - `KBSPLIT_CONFIG`: Path to config file
    /// - `KBSPLIT_INPUT`: Input file
    /// - `KBSPLIT_OUTPUT_DIR`: Output directory
    /// - `KBSPLIT_CHUNK_SIZE`: Read chunk size in bytes
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    pub fn load(config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        let explicit = config_file.or_else(|| std::env::var("KBSPLIT_CONFIG").ok().map(PathBuf::from));

        match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(AppError::Config(format!(
                        "Config file does not exist: {:?}",
                        path
                    )));
                }
                config = config.merge_yaml(&path)?;
            }
            None => {
                let path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    config = config.merge_yaml(&path)?;
                }
            }
        }

        // Environment variables override the config file
        if let Ok(input) = std::env::var("KBSPLIT_INPUT") {
            config.input = Some(PathBuf::from(input));
        }

        if let Ok(dir) = std::env::var("KBSPLIT_OUTPUT_DIR") {
            config.output_dir = PathBuf::from(dir);
        }

        if let Ok(size) = std::env::var("KBSPLIT_CHUNK_SIZE") {
            config.chunk_size = size.parse().map_err(|e| {
                AppError::Config(format!("Invalid KBSPLIT_CHUNK_SIZE {:?}: {}", size, e))
            })?;
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    pub fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();
        result.config_file = Some(path.to_path_buf());

        if let Some(input) = config_file.input {
            result.input = Some(input);
        }
        if let Some(dir) = config_file.output_dir {
            result.output_dir = dir;
        }
        if let Some(size) = config_file.chunk_size {
            result.chunk_size = size;
        }
        if let Some(fallback) = config_file.fallback {
            result.fallback = fallback;
        }
        if let Some(policy) = config_file.empty_categories {
            result.empty_categories = policy;
        }
        if let Some(interval) = config_file.progress_interval {
            result.progress_interval = interval;
        }
        if let Some(rules) = config_file.rules {
            result.rules = Some(rules);
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        tracing::debug!("Merged config file {:?}", path);
        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Flags take precedence over environment variables and the config file.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        input: Option<PathBuf>,
        output_dir: Option<PathBuf>,
        chunk_size: Option<usize>,
        skip_empty: bool,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(input) = input {
            self.input = Some(input);
        }

        if let Some(dir) = output_dir {
            self.output_dir = dir;
        }

        if let Some(size) = chunk_size {
            self.chunk_size = size;
        }

        if skip_empty {
            self.empty_categories = EmptyCategoryPolicy::Skip;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Validate settings shared by every command.
    pub fn validate(&self) -> AppResult<()> {
        if self.chunk_size == 0 {
            return Err(AppError::Config("chunk_size must be greater than zero".to_string()));
        }

        if self.fallback.trim().is_empty() {
            return Err(AppError::Config("fallback category name is empty".to_string()));
        }

        Ok(())
    }

    /// Return the input path, checking that it names an existing file.
    pub fn require_input(&self) -> AppResult<&Path> {
        let input = self.input.as_deref().ok_or_else(|| {
            AppError::Config(
                "No input file given (pass INPUT, set KBSPLIT_INPUT, or set `input` in the config file)"
                    .to_string(),
            )
        })?;

        if !input.is_file() {
            return Err(AppError::Config(format!("Input file does not exist: {:?}", input)));
        }

        Ok(input)
    }
}
