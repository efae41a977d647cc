//! Command handlers for the kbsplit CLI.

pub mod classify;
pub mod rules;
pub mod split;

// Re-export command types for convenience
pub use classify::ClassifyCommand;
pub use rules::RulesCommand;
pub use split::SplitCommand;
