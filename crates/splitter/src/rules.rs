//! Category rule table.
//!
//! An ordered list of categories, each with a set of lowercase keyword
//! substrings, plus the name of the catch-all category. Order matters:
//! the classifier assigns the first category with any matching keyword.

use kbsplit_core::{AppConfig, AppError, AppResult, RuleConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Name of the built-in catch-all category.
pub const FALLBACK_CATEGORY: &str = "General";

/// Built-in rule table, in match order.
pub const BUILTIN_RULES: &[(&str, &[&str])] = &[
    (
        "Malware_Analysis",
        &[
            "malware",
            "obfuscation",
            "packing",
            "anti-debugging",
            "anti-analysis",
            "reverse engineering",
            "binary",
            "virtualization",
        ],
    ),
    (
        "Forensics_IR",
        &[
            "forensic",
            "timestomping",
            "snapshot",
            "logging",
            "artifact",
            "incident response",
            "evidence",
            "memory",
        ],
    ),
    (
        "Network_Security",
        &[
            "network", "traffic", "tls", "c2", "wireless", "pcap", "handshake", "dns",
        ],
    ),
    (
        "Exploitation",
        &[
            "exploit",
            "injection",
            "rop",
            "jop",
            "buffer overflow",
            "vulnerability",
            "bypass",
            "privilege escalation",
        ],
    ),
    (
        "Cloud_Security",
        &[
            "cloud",
            "aws",
            "azure",
            "container",
            "kubernetes",
            "iac",
            "infrastructure as code",
            "serverless",
        ],
    ),
    (
        "Defense_Compliance",
        &[
            "nist",
            "policy",
            "compliance",
            "dlp",
            "ueba",
            "monitor",
            "mitigate",
            "governance",
        ],
    ),
    (
        "Cryptography",
        &["crypto", "encryption", "hashing", "quantum", "cipher", "key"],
    ),
    (
        "Web_Security",
        &[
            "xss",
            "csrf",
            "sql injection",
            "web",
            "browser",
            "cookie",
            "session",
        ],
    ),
];

/// One category and the keywords that select it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub name: String,
    pub keywords: Vec<String>,
}

impl CategoryRule {
    /// First keyword found in `lowered`, if any.
    ///
    /// `lowered` must already be lower-cased.
    pub fn first_match(&self, lowered: &str) -> Option<&str> {
        self.keywords
            .iter()
            .map(String::as_str)
            .find(|keyword| lowered.contains(keyword))
    }
}

/// Immutable, validated rule table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleTable {
    rules: Vec<CategoryRule>,
    fallback: String,
}

impl RuleTable {
    /// The built-in cybersecurity table with `General` as fallback.
    pub fn builtin() -> Self {
        Self {
            rules: builtin_rules(),
            fallback: FALLBACK_CATEGORY.to_string(),
        }
    }

    /// Build a table from config entries, preserving their order.
    ///
    /// Keywords are trimmed and lower-cased so that matching is
    /// case-insensitive.
    pub fn from_config(entries: &[RuleConfig], fallback: &str) -> AppResult<Self> {
        let rules = entries
            .iter()
            .map(|entry| CategoryRule {
                name: entry.name.clone(),
                keywords: entry.keywords.clone(),
            })
            .collect();

        Self::new(rules, fallback)
    }

    /// Table for an application config: its `rules` override when present,
    /// otherwise the built-in rules, with the configured fallback name.
    pub fn from_app_config(config: &AppConfig) -> AppResult<Self> {
        match &config.rules {
            Some(entries) => Self::from_config(entries, &config.fallback),
            None => Self::new(builtin_rules(), &config.fallback),
        }
    }

    /// Validate and assemble a table.
    ///
    /// Names are trimmed and keywords trimmed and lower-cased. Names must
    /// stay distinct ignoring case, since they become file names.
    pub fn new(rules: Vec<CategoryRule>, fallback: &str) -> AppResult<Self> {
        let fallback = fallback.trim();
        validate_name(fallback)?;

        if rules.is_empty() {
            return Err(AppError::Rules("rule table has no categories".to_string()));
        }

        let rules: Vec<CategoryRule> = rules
            .into_iter()
            .map(|rule| CategoryRule {
                name: rule.name.trim().to_string(),
                keywords: rule.keywords.iter().map(|k| k.trim().to_lowercase()).collect(),
            })
            .collect();

        let fallback_key = fallback.to_lowercase();
        let mut seen = HashSet::new();
        for rule in &rules {
            validate_name(&rule.name)?;

            let key = rule.name.to_lowercase();
            if key == fallback_key {
                return Err(AppError::Rules(format!(
                    "category '{}' clashes with the fallback category",
                    rule.name
                )));
            }
            if !seen.insert(key) {
                return Err(AppError::Rules(format!(
                    "category '{}' is declared more than once",
                    rule.name
                )));
            }
            if rule.keywords.is_empty() {
                return Err(AppError::Rules(format!(
                    "category '{}' has no keywords",
                    rule.name
                )));
            }
            // An empty keyword would match every document.
            if rule.keywords.iter().any(|k| k.is_empty()) {
                return Err(AppError::Rules(format!(
                    "category '{}' has an empty keyword",
                    rule.name
                )));
            }
        }

        Ok(Self {
            rules,
            fallback: fallback.to_string(),
        })
    }

    /// Rules in match order.
    pub fn rules(&self) -> &[CategoryRule] {
        &self.rules
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    /// Every category name, rules first (in order) then the fallback.
    pub fn category_names(&self) -> Vec<&str> {
        self.rules
            .iter()
            .map(|r| r.name.as_str())
            .chain(std::iter::once(self.fallback.as_str()))
            .collect()
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::builtin()
    }
}

fn builtin_rules() -> Vec<CategoryRule> {
    BUILTIN_RULES
        .iter()
        .map(|(name, keywords)| CategoryRule {
            name: name.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        })
        .collect()
}

/// Characters that are not valid in a file name on some platform.
const RESERVED_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Category names double as file stems.
fn validate_name(name: &str) -> AppResult<()> {
    if name.trim().is_empty() {
        return Err(AppError::Rules("category name is empty".to_string()));
    }
    let reserved = name.contains(RESERVED_CHARS) || name.chars().any(char::is_control);
    if name == "." || name == ".." || reserved {
        return Err(AppError::Rules(format!(
            "category name '{}' cannot be used as a file name",
            name
        )));
    }
    Ok(())
}
