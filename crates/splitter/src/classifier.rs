//! First-match-wins keyword classification.

use serde_json::{Map, Value};

use crate::rules::RuleTable;

/// Outcome of matching one text against the rule table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match<'a> {
    pub category: &'a str,
    /// Keyword that selected the category; `None` for the fallback.
    pub keyword: Option<&'a str>,
}

/// Assigns documents to exactly one category of a rule table.
#[derive(Debug, Clone, Copy)]
pub struct Classifier<'a> {
    table: &'a RuleTable,
}

impl<'a> Classifier<'a> {
    pub fn new(table: &'a RuleTable) -> Self {
        Self { table }
    }

    /// Match `content` against the rules in declaration order.
    pub fn explain(&self, content: &str) -> Match<'a> {
        let lowered = content.to_lowercase();

        for rule in self.table.rules() {
            if let Some(keyword) = rule.first_match(&lowered) {
                return Match {
                    category: &rule.name,
                    keyword: Some(keyword),
                };
            }
        }

        Match {
            category: self.table.fallback(),
            keyword: None,
        }
    }

    /// Category for a piece of text.
    pub fn category_for(&self, content: &str) -> &'a str {
        self.explain(content).category
    }

    /// Classify a document and record the result in `metadata.category`.
    ///
    /// A missing or non-string `content` counts as empty text. A missing
    /// or `null` `metadata` becomes an object; any other non-object value
    /// is replaced so that the category can be recorded.
    pub fn classify(&self, doc: &mut Map<String, Value>) -> &'a str {
        let category = self.category_for(content_of(doc));
        tag_category(doc, category);
        category
    }
}

fn content_of(doc: &Map<String, Value>) -> &str {
    doc.get("content").and_then(Value::as_str).unwrap_or("")
}

fn tag_category(doc: &mut Map<String, Value>, category: &str) {
    let value = Value::String(category.to_string());

    match doc.get_mut("metadata") {
        Some(Value::Object(metadata)) => {
            metadata.insert("category".to_string(), value);
        }
        Some(other) => {
            if !other.is_null() {
                tracing::warn!(
                    "Replacing non-object metadata ({}) to record category '{}'",
                    other,
                    category
                );
            }
            let mut metadata = Map::new();
            metadata.insert("category".to_string(), value);
            *other = Value::Object(metadata);
        }
        None => {
            let mut metadata = Map::new();
            metadata.insert("category".to_string(), value);
            doc.insert("metadata".to_string(), Value::Object(metadata));
        }
    }
}
