//! Rules command handler.
//!
//! Prints the rule table a split run would use.

use clap::Args;
use kbsplit_core::{config::AppConfig, AppResult};
use kbsplit_splitter::RuleTable;

/// Show the effective category rule table
#[derive(Args, Debug)]
pub struct RulesCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl RulesCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        config.validate()?;
        let table = RuleTable::from_app_config(config)?;

        tracing::debug!(
            "Rule table from {}",
            if config.rules.is_some() { "config" } else { "built-in defaults" }
        );

        if self.json {
            println!("{}", serde_json::to_string_pretty(&table)?);
            return Ok(());
        }

        for (position, rule) in table.rules().iter().enumerate() {
            println!("{}. {}: {}", position + 1, rule.name, rule.keywords.join(", "));
        }
        println!("fallback: {}", table.fallback());

        Ok(())
    }
}
