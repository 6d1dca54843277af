#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Planning area reconciliation.
//!
//! Normalizes planning area names so that records from the places search
//! and the planning-area/income API can be joined despite inconsistent
//! capitalization, turns raw income bucket counts into weighted averages,
//! and left-joins those statistics onto located listings.

pub mod boundary;
pub mod income;
pub mod join;
pub mod normalize;

use fitness_map_region_models::BoundaryError;
use thiserror::Error;

/// Errors that can occur while parsing planning area or income data.
#[derive(Debug, Error)]
pub enum RegionError {
    /// JSON parsing failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// `GeoJSON` parsing failed.
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    /// The region geometry was unusable.
    #[error("Boundary error: {0}")]
    Boundary(#[from] BoundaryError),

    /// A raw API row lacked a required field.
    #[error("Missing field '{field}'")]
    MissingField {
        /// Field name.
        field: &'static str,
    },

    /// Data conversion error.
    #[error("Conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}
