//! Knowledge-base splitter core library.
//!
//! Shared foundations for the splitter crates:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging infrastructure
//! - Layered configuration

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::{AppConfig, EmptyCategoryPolicy, RuleConfig};
pub use error::{AppError, AppResult};
