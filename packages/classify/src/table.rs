//! The versioned keyword table shared by the classifier and the exclusion
//! filter.
//!
//! The table is parsed once into an immutable [`KeywordTable`]: keywords
//! are lower-cased and trimmed, category rules are sorted by rank, and the
//! whole thing is validated before anything consults it.

use std::collections::BTreeSet;
use std::path::Path;

use fitness_map_location_models::Category;
use serde::{Deserialize, Serialize};

use crate::ClassifyError;

/// The only table format version this crate understands.
pub const SUPPORTED_VERSION: u32 = 1;

const BUILTIN_TOML: &str = include_str!("../rules/keywords.toml");

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TableFile {
    version: u32,
    #[serde(default)]
    categories: Vec<CategoryRule>,
    #[serde(default)]
    exclusions: ExclusionRules,
}

/// Keywords that place a listing in one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategoryRule {
    /// Category assigned on match.
    pub category: Category,
    /// Precedence, lowest first.
    pub rank: u32,
    /// Lower-cased substrings.
    pub keywords: Vec<String>,
}

/// One denylist entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DenyRule {
    /// Any of these excludes the listing...
    pub keywords: Vec<String>,
    /// ...unless the name also contains one of these.
    #[serde(default)]
    pub unless: Vec<String>,
}

/// Allowlist and denylist for the keep/drop filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExclusionRules {
    /// A match forces keep.
    #[serde(default)]
    pub allow: Vec<String>,
    /// Checked only when no allow keyword matched.
    #[serde(default)]
    pub deny: Vec<DenyRule>,
}

/// Validated, immutable keyword configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordTable {
    version: u32,
    categories: Vec<CategoryRule>,
    exclusions: ExclusionRules,
}

impl KeywordTable {
    /// Returns the table embedded in the binary.
    ///
    /// # Panics
    ///
    /// Panics if the embedded TOML fails to parse or validate. Since it is
    /// a compile-time constant, failures indicate a development error and
    /// are caught by the tests below.
    #[must_use]
    pub fn builtin() -> Self {
        Self::from_toml(BUILTIN_TOML)
            .unwrap_or_else(|e| panic!("Failed to load built-in keyword table: {e}"))
    }

    /// Parses and validates a keyword table.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError`] if the TOML is malformed or the table
    /// fails validation.
    pub fn from_toml(toml_str: &str) -> Result<Self, ClassifyError> {
        let file: TableFile = toml::de::from_str(toml_str)?;
        Self::from_file(file)
    }

    /// Reads a keyword table from disk.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifyError`] if the file cannot be read, parsed, or
    /// validated.
    pub fn from_path(path: &Path) -> Result<Self, ClassifyError> {
        let contents = std::fs::read_to_string(path)?;
        let table = Self::from_toml(&contents)?;
        log::info!(
            "Loaded keyword table from {} ({} category rules, {} deny rules)",
            path.display(),
            table.categories.len(),
            table.exclusions.deny.len()
        );
        Ok(table)
    }

    fn from_file(file: TableFile) -> Result<Self, ClassifyError> {
        if file.version != SUPPORTED_VERSION {
            return Err(invalid(format!(
                "unsupported keyword table version {} (expected {SUPPORTED_VERSION})",
                file.version
            )));
        }

        let mut seen = BTreeSet::new();
        let mut categories = Vec::with_capacity(file.categories.len());
        for rule in file.categories {
            if rule.category == Category::Others {
                return Err(invalid(format!(
                    "'{}' is the fallback and cannot have a rule",
                    Category::Others
                )));
            }
            if !seen.insert(rule.category) {
                return Err(invalid(format!("duplicate rule for '{}'", rule.category)));
            }
            let context = format!("category '{}'", rule.category);
            categories.push(CategoryRule {
                category: rule.category,
                rank: rule.rank,
                keywords: clean_keywords(&context, rule.keywords)?,
            });
        }
        // stable: equal ranks keep file order
        categories.sort_by_key(|rule| rule.rank);

        let allow = if file.exclusions.allow.is_empty() {
            Vec::new()
        } else {
            clean_keywords("exclusions.allow", file.exclusions.allow)?
        };

        let deny = file
            .exclusions
            .deny
            .into_iter()
            .enumerate()
            .map(|(i, rule)| {
                let context = format!("exclusions.deny[{i}]");
                let keywords = clean_keywords(&context, rule.keywords)?;
                let unless = if rule.unless.is_empty() {
                    Vec::new()
                } else {
                    clean_keywords(&format!("{context}.unless"), rule.unless)?
                };
                Ok(DenyRule { keywords, unless })
            })
            .collect::<Result<Vec<_>, ClassifyError>>()?;

        Ok(Self {
            version: file.version,
            categories,
            exclusions: ExclusionRules { allow, deny },
        })
    }

    /// Table format version.
    #[must_use]
    pub const fn version(&self) -> u32 {
        self.version
    }

    /// Category rules in precedence order.
    #[must_use]
    pub fn categories(&self) -> &[CategoryRule] {
        &self.categories
    }

    /// Keep/drop filter rules.
    #[must_use]
    pub const fn exclusions(&self) -> &ExclusionRules {
        &self.exclusions
    }
}

impl Default for KeywordTable {
    fn default() -> Self {
        Self::builtin()
    }
}

fn invalid(message: String) -> ClassifyError {
    ClassifyError::Invalid { message }
}

fn clean_keywords(context: &str, keywords: Vec<String>) -> Result<Vec<String>, ClassifyError> {
    if keywords.is_empty() {
        return Err(invalid(format!("{context} has no keywords")));
    }
    keywords
        .into_iter()
        .map(|keyword| {
            let cleaned = keyword.trim().to_lowercase();
            if cleaned.is_empty() {
                Err(invalid(format!("{context} has a blank keyword")))
            } else {
                Ok(cleaned)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_table_loads() {
        let table = KeywordTable::builtin();
        assert_eq!(table.version(), SUPPORTED_VERSION);
        assert_eq!(table.categories().len(), Category::all().len() - 1);
        assert!(!table.exclusions().allow.is_empty());
        assert!(!table.exclusions().deny.is_empty());
    }

    #[test]
    fn builtin_precedence_order() {
        let order: Vec<Category> = KeywordTable::builtin()
            .categories()
            .iter()
            .map(|rule| rule.category)
            .collect();
        assert_eq!(
            order,
            [
                Category::YogaPilates,
                Category::MartialArts,
                Category::DanceStudio,
                Category::CyclingSpin,
                Category::Bft,
                Category::Gym,
                Category::FitnessStudio,
            ]
        );
    }

    #[test]
    fn builtin_keywords_are_lowercase_and_trimmed() {
        let table = KeywordTable::builtin();
        let all = table
            .categories()
            .iter()
            .flat_map(|rule| rule.keywords.iter())
            .chain(table.exclusions().allow.iter());
        for keyword in all {
            assert_eq!(keyword, &keyword.trim().to_lowercase());
        }
    }

    #[test]
    fn sorts_by_rank_keeping_file_order_for_ties() {
        let table = KeywordTable::from_toml(
            r#"
            version = 1
            [[categories]]
            category = "gym"
            rank = 5
            keywords = ["gym"]
            [[categories]]
            category = "bft"
            rank = 1
            keywords = ["bft"]
            [[categories]]
            category = "dance_studio"
            rank = 5
            keywords = ["Dance "]
            "#,
        )
        .unwrap();
        let order: Vec<Category> = table.categories().iter().map(|r| r.category).collect();
        assert_eq!(
            order,
            [Category::Bft, Category::Gym, Category::DanceStudio]
        );
        assert_eq!(table.categories()[2].keywords, ["dance"]);
    }

    #[test]
    fn accepts_display_labels_for_categories() {
        let table = KeywordTable::from_toml(
            r#"
            version = 1
            [[categories]]
            category = "Yoga/Pilates Studio"
            rank = 1
            keywords = ["yoga"]
            "#,
        )
        .unwrap();
        assert_eq!(table.categories()[0].category, Category::YogaPilates);
    }

    fn rejects(toml_str: &str, needle: &str) {
        match KeywordTable::from_toml(toml_str) {
            Err(ClassifyError::Invalid { message }) => {
                assert!(message.contains(needle), "{message:?} missing {needle:?}");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_unsupported_version() {
        rejects("version = 2", "version");
    }

    #[test]
    fn rejects_duplicate_categories() {
        rejects(
            r#"
            version = 1
            [[categories]]
            category = "gym"
            rank = 1
            keywords = ["gym"]
            [[categories]]
            category = "gym"
            rank = 2
            keywords = ["weights"]
            "#,
            "duplicate",
        );
    }

    #[test]
    fn rejects_rule_for_fallback() {
        rejects(
            r#"
            version = 1
            [[categories]]
            category = "others"
            rank = 1
            keywords = ["misc"]
            "#,
            "fallback",
        );
    }

    #[test]
    fn rejects_empty_and_blank_keywords() {
        rejects(
            r#"
            version = 1
            [[categories]]
            category = "gym"
            rank = 1
            keywords = []
            "#,
            "no keywords",
        );
        rejects(
            r#"
            version = 1
            [[exclusions.deny]]
            keywords = ["clinic"]
            unless = ["  "]
            "#,
            "blank",
        );
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        assert!(matches!(
            KeywordTable::from_toml("version = "),
            Err(ClassifyError::Toml(_))
        ));
        assert!(matches!(
            KeywordTable::from_toml("version = 1\nunexpected = true"),
            Err(ClassifyError::Toml(_))
        ));
    }
}
