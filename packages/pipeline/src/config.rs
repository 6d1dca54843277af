//! File-based pipeline configuration.
//!
//! Every field has a default, so an empty file (or no file at all) gives
//! the standard run over `data/`. The CLI overrides individual fields from
//! its flags after loading.
//!
//! ```toml
//! city = "Singapore"
//! strategy = "boundary_then_centroid"
//! apply_exclusions = true
//!
//! [income]
//! open_ended_midpoint = 25000.0
//!
//! [inputs]
//! locations = "data/fitness_locations.csv"
//! ```

use std::path::{Path, PathBuf};

use fitness_map_classify::{Classifier, KeywordTable};
use fitness_map_region::income::MidpointPolicy;
use fitness_map_spatial::AssignmentStrategy;
use serde::{Deserialize, Serialize};

use crate::prepare::Bounds;
use crate::{DEFAULT_CITY, PipelineError, PipelineOptions};

/// Where input data is read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InputPaths {
    /// Listings CSV.
    pub locations: PathBuf,
    /// Planning areas CSV.
    pub planning_areas: PathBuf,
    /// Household income CSV.
    pub household_income: PathBuf,
    /// Raw planning-area API rows; replaces `planning_areas` when set.
    pub regions_json: Option<PathBuf>,
    /// Raw household income API rows; replaces `household_income` when set.
    pub income_json: Option<PathBuf>,
}

impl Default for InputPaths {
    fn default() -> Self {
        Self {
            locations: PathBuf::from("data/fitness_locations.csv"),
            planning_areas: PathBuf::from("data/planning_areas.csv"),
            household_income: PathBuf::from("data/household_income.csv"),
            regions_json: None,
            income_json: None,
        }
    }
}

/// Where results are written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputPaths {
    /// Enriched listings CSV.
    pub combined: PathBuf,
    /// Listings removed by the non-fitness filter.
    pub excluded: PathBuf,
    /// Summary statistics JSON.
    pub summary: PathBuf,
}

impl Default for OutputPaths {
    fn default() -> Self {
        Self {
            combined: PathBuf::from("data/combined_data.csv"),
            excluded: PathBuf::from("data/excluded_locations.csv"),
            summary: PathBuf::from("data/summary.json"),
        }
    }
}

/// Complete configuration for a `process` run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub inputs: InputPaths,
    pub outputs: OutputPaths,
    /// Search location that marks a city-wide search.
    pub city: String,
    pub strategy: AssignmentStrategy,
    pub income: MidpointPolicy,
    pub apply_exclusions: bool,
    pub use_search_context: bool,
    pub dedupe: bool,
    /// Apply [`PipelineConfig::bounds`].
    pub filter_bounds: bool,
    pub bounds: Bounds,
    /// Keyword table replacing the built-in one.
    pub keyword_table: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            inputs: InputPaths::default(),
            outputs: OutputPaths::default(),
            city: DEFAULT_CITY.to_string(),
            strategy: AssignmentStrategy::default(),
            income: MidpointPolicy::default(),
            apply_exclusions: false,
            use_search_context: true,
            dedupe: false,
            filter_bounds: false,
            bounds: Bounds::default(),
            keyword_table: None,
        }
    }
}

impl PipelineConfig {
    /// Parses a configuration file's contents.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Toml`] if the TOML is malformed or names an
    /// unknown field.
    pub fn from_toml(toml_str: &str) -> Result<Self, PipelineError> {
        Ok(toml::de::from_str(toml_str)?)
    }

    /// Reads a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&contents)?;
        log::info!("Loaded pipeline configuration from {}", path.display());
        Ok(config)
    }

    /// Loads the keyword table (built-in unless overridden).
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Classify`] if the override file cannot be
    /// loaded.
    pub fn keyword_table(&self) -> Result<KeywordTable, PipelineError> {
        Ok(match &self.keyword_table {
            Some(path) => KeywordTable::from_path(path)?,
            None => KeywordTable::builtin(),
        })
    }

    /// Builds the run options this configuration describes.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if the keyword table override cannot be
    /// loaded.
    pub fn to_options(&self) -> Result<PipelineOptions, PipelineError> {
        Ok(PipelineOptions {
            city: self.city.clone(),
            strategy: self.strategy,
            classifier: Classifier::new(self.keyword_table()?),
            use_search_context: self.use_search_context,
            apply_exclusions: self.apply_exclusions,
            dedupe: self.dedupe,
            bounds: self.filter_bounds.then_some(self.bounds),
        })
    }
}
