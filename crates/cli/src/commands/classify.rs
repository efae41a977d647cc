//! Classify command handler.

use clap::Args;
use kbsplit_core::{config::AppConfig, AppResult};
use kbsplit_splitter::{Classifier, RuleTable};

/// Show which category a piece of text would be assigned
#[derive(Args, Debug)]
pub struct ClassifyCommand {
    /// Text to classify (as it would appear in a document's `content`)
    pub text: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl ClassifyCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        config.validate()?;
        let table = RuleTable::from_app_config(config)?;
        let found = Classifier::new(&table).explain(&self.text);

        if self.json {
            let output = serde_json::json!({
                "category": found.category,
                "keyword": found.keyword,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            match found.keyword {
                Some(keyword) => println!("{} (matched \"{}\")", found.category, keyword),
                None => println!("{} (no keyword matched)", found.category),
            }
        }

        Ok(())
    }
}
