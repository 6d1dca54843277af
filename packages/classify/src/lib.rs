#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Keyword-based categorization and filtering of fitness listings.
//!
//! Listing names are matched against an ordered [`KeywordTable`] to pick a
//! [`Category`], and against an allowlist/denylist to decide whether the
//! listing is a fitness business at all.

pub mod table;

use fitness_map_location_models::Category;
use thiserror::Error;

pub use table::{CategoryRule, DenyRule, ExclusionRules, KeywordTable};

/// Errors that can occur while loading a keyword table.
#[derive(Debug, Error)]
pub enum ClassifyError {
    /// I/O error reading a table file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing failed.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// The table parsed but is not usable.
    #[error("Invalid keyword table: {message}")]
    Invalid {
        /// Description of what went wrong.
        message: String,
    },
}

/// Classifies and filters listings using one [`KeywordTable`].
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    table: KeywordTable,
}

impl Classifier {
    /// Wraps a validated table. Use [`Classifier::default`] for the
    /// built-in rules.
    #[must_use]
    pub const fn new(table: KeywordTable) -> Self {
        Self { table }
    }

    /// The rules this classifier applies.
    #[must_use]
    pub const fn table(&self) -> &KeywordTable {
        &self.table
    }

    /// Maps a listing name to a category.
    ///
    /// Rules are tried in precedence order and the first with a keyword
    /// contained in the lower-cased name wins. If the name matches nothing
    /// the same rules are tried against `context` (the search query that
    /// found the listing). Empty names are always [`Category::Others`].
    #[must_use]
    pub fn classify(&self, name: &str, context: Option<&str>) -> Category {
        if name.trim().is_empty() {
            return Category::Others;
        }

        self.match_rules(&name.to_lowercase())
            .or_else(|| {
                context
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .and_then(|c| self.match_rules(&c.to_lowercase()))
            })
            .unwrap_or(Category::Others)
    }

    fn match_rules(&self, lower: &str) -> Option<Category> {
        self.table
            .categories()
            .iter()
            .find(|rule| contains_any(lower, &rule.keywords))
            .map(|rule| rule.category)
    }

    /// Whether a listing should be dropped as a non-fitness business.
    ///
    /// An allowlist match always keeps the listing. Otherwise it is dropped
    /// if any deny rule matches and the name contains none of that rule's
    /// `unless` terms. Empty names are kept.
    #[must_use]
    pub fn is_excluded(&self, name: &str) -> bool {
        let lower = name.trim().to_lowercase();
        if lower.is_empty() {
            return false;
        }

        let rules = self.table.exclusions();
        if contains_any(&lower, &rules.allow) {
            return false;
        }

        rules
            .deny
            .iter()
            .any(|rule| contains_any(&lower, &rule.keywords) && !contains_any(&lower, &rule.unless))
    }
}

/// Returns `true` if `haystack` contains any of the given needles.
fn contains_any(haystack: &str, needles: &[String]) -> bool {
    needles.iter().any(|n| haystack.contains(n.as_str()))
}
