//! Glob-style name patterns for `SHOW FUNCTIONS ... LIKE`.
//!
//! `*` matches any run of characters and `|` separates alternatives.
//! Matching is anchored and case-insensitive. Every other character matches
//! itself literally.

use regex::Regex;

use crate::error::CatalogError;

/// A compiled name pattern.
#[derive(Debug, Clone)]
pub struct NamePattern {
    source: String,
    /// `None` matches every name.
    regex: Option<Regex>,
}

impl NamePattern {
    /// Compiles `pattern`. Fails only if the compiled form exceeds the
    /// regex size limit.
    pub fn new(pattern: &str) -> Result<Self, CatalogError> {
        let alternatives: Vec<String> = pattern
            .split('|')
            .map(|alt| {
                alt.trim()
                    .split('*')
                    .map(regex::escape)
                    .collect::<Vec<_>>()
                    .join(".*")
            })
            .collect();
        let source = format!("(?i)^(?:{})$", alternatives.join("|"));
        let regex = Regex::new(&source).map_err(|e| CatalogError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        Ok(NamePattern {
            source: pattern.to_string(),
            regex: Some(regex),
        })
    }

    /// Pattern matching every name.
    pub fn any() -> Self {
        NamePattern {
            source: "*".to_string(),
            regex: None,
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        self.regex.as_ref().map_or(true, |regex| regex.is_match(name))
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}
