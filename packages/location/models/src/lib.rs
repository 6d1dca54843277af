#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Fitness location record types and the category taxonomy.
//!
//! A [`LocationRecord`] is one business listing discovered by the places
//! search. After planning area assignment, income join, and
//! classification it becomes an [`EnrichedLocationRecord`], the flat row
//! consumed by the map and report renderers.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

pub use fitness_map_region_models::UNKNOWN_REGION;

/// Fitness business category.
///
/// The closed set of labels the classifier can produce. [`Category::Others`]
/// is the fallback when no keyword rule matches.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum Category {
    /// Body Fit Training franchises.
    #[serde(rename = "BFT", alias = "bft")]
    #[strum(to_string = "BFT", serialize = "bft")]
    Bft,
    /// General fitness and personal training studios.
    #[serde(rename = "Fitness Studio", alias = "fitness_studio")]
    #[strum(to_string = "Fitness Studio", serialize = "fitness_studio")]
    FitnessStudio,
    /// Yoga, pilates, and reformer studios.
    #[serde(rename = "Yoga/Pilates Studio", alias = "yoga_pilates")]
    #[strum(to_string = "Yoga/Pilates Studio", serialize = "yoga_pilates")]
    YogaPilates,
    /// Gyms and strength facilities.
    #[serde(rename = "Gym", alias = "gym")]
    #[strum(to_string = "Gym", serialize = "gym")]
    Gym,
    /// Boxing, BJJ, muay thai, and other combat sports.
    #[serde(rename = "Martial Arts", alias = "martial_arts")]
    #[strum(to_string = "Martial Arts", serialize = "martial_arts")]
    MartialArts,
    /// Dance, barre, and pole studios.
    #[serde(rename = "Dance Studio", alias = "dance_studio")]
    #[strum(to_string = "Dance Studio", serialize = "dance_studio")]
    DanceStudio,
    /// Spin and indoor cycling studios.
    #[serde(rename = "Cycling/Spin", alias = "cycling_spin")]
    #[strum(to_string = "Cycling/Spin", serialize = "cycling_spin")]
    CyclingSpin,
    /// Anything no rule matched.
    #[default]
    #[serde(rename = "Others", alias = "others")]
    #[strum(to_string = "Others", serialize = "others")]
    Others,
}

impl Category {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Bft,
            Self::FitnessStudio,
            Self::YogaPilates,
            Self::Gym,
            Self::MartialArts,
            Self::DanceStudio,
            Self::CyclingSpin,
            Self::Others,
        ]
    }

    /// Human-readable label, identical to the `Display` output.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Bft => "BFT",
            Self::FitnessStudio => "Fitness Studio",
            Self::YogaPilates => "Yoga/Pilates Studio",
            Self::Gym => "Gym",
            Self::MartialArts => "Martial Arts",
            Self::DanceStudio => "Dance Studio",
            Self::CyclingSpin => "Cycling/Spin",
            Self::Others => "Others",
        }
    }
}

/// Whether a listing came from a city-wide search or a neighbourhood
/// search.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum SearchCoverage {
    /// Found by searching a specific neighbourhood.
    Local,
    /// Found by searching the whole city.
    General,
}

impl SearchCoverage {
    /// Classifies a search location against the bare city name (e.g.
    /// `"Singapore"`).
    #[must_use]
    pub fn from_search_location(search_location: &str, city: &str) -> Self {
        if search_location.trim() == city {
            Self::General
        } else {
            Self::Local
        }
    }
}

/// A business listing as produced by the places search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationRecord {
    /// Business display name.
    pub name: String,
    /// Opaque external place identifier.
    pub place_id: String,
    /// Formatted street address.
    pub formatted_address: String,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Average star rating, 0 when the listing has none.
    pub rating: f64,
    /// Number of user ratings, 0 when absent.
    pub user_ratings_total: u64,
    /// Website URL.
    pub website: Option<String>,
    /// Formatted phone number.
    pub phone_number: Option<String>,
    /// Search keyword that discovered this listing.
    pub search_query: String,
    /// Search locale that discovered this listing.
    pub search_location: String,
}

impl LocationRecord {
    /// Checks the fields the pipeline cannot default.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidLocationError`] if the name is blank, either
    /// coordinate is not finite, or the rating is negative or not finite.
    pub fn validate(&self) -> Result<(), InvalidLocationError> {
        if self.name.trim().is_empty() {
            return Err(InvalidLocationError::EmptyName);
        }
        if !self.latitude.is_finite() || !self.longitude.is_finite() {
            return Err(InvalidLocationError::NonFiniteCoordinate {
                latitude: self.latitude,
                longitude: self.longitude,
            });
        }
        if !self.rating.is_finite() || self.rating < 0.0 {
            return Err(InvalidLocationError::InvalidRating {
                rating: self.rating,
            });
        }
        Ok(())
    }
}

/// A locations CSV row before validation. Every column is optional text
/// so one bad cell skips one row instead of failing the whole file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawLocationRow {
    /// `name` column.
    pub name: Option<String>,
    /// `place_id` column.
    pub place_id: Option<String>,
    /// `formatted_address` column.
    pub formatted_address: Option<String>,
    /// `latitude` column.
    pub latitude: Option<String>,
    /// `longitude` column.
    pub longitude: Option<String>,
    /// `rating` column.
    pub rating: Option<String>,
    /// `user_ratings_total` column.
    pub user_ratings_total: Option<String>,
    /// `website` column.
    pub website: Option<String>,
    /// `phone_number` column.
    pub phone_number: Option<String>,
    /// `search_query` column.
    pub search_query: Option<String>,
    /// `search_location` column.
    pub search_location: Option<String>,
}

impl TryFrom<RawLocationRow> for LocationRecord {
    type Error = InvalidLocationError;

    fn try_from(row: RawLocationRow) -> Result<Self, Self::Error> {
        let name = non_empty(row.name).ok_or(InvalidLocationError::EmptyName)?;
        let latitude = parse_required_f64("latitude", row.latitude)?;
        let longitude = parse_required_f64("longitude", row.longitude)?;
        let rating = parse_optional_f64("rating", row.rating)?.unwrap_or(0.0);
        let user_ratings_total = parse_count("user_ratings_total", row.user_ratings_total)?;

        let record = Self {
            name,
            place_id: row.place_id.unwrap_or_default().trim().to_string(),
            formatted_address: row.formatted_address.unwrap_or_default().trim().to_string(),
            latitude,
            longitude,
            rating,
            user_ratings_total,
            website: non_empty(row.website),
            phone_number: non_empty(row.phone_number),
            search_query: row.search_query.unwrap_or_default().trim().to_string(),
            search_location: row.search_location.unwrap_or_default().trim().to_string(),
        };
        record.validate()?;
        Ok(record)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn parse_optional_f64(
    field: &'static str,
    value: Option<String>,
) -> Result<Option<f64>, InvalidLocationError> {
    let Some(raw) = non_empty(value) else {
        return Ok(None);
    };
    raw.parse::<f64>()
        .map(Some)
        .map_err(|_| InvalidLocationError::InvalidNumber { field, value: raw })
}

fn parse_required_f64(
    field: &'static str,
    value: Option<String>,
) -> Result<f64, InvalidLocationError> {
    parse_optional_f64(field, value)?.ok_or(InvalidLocationError::MissingField { field })
}

/// Parses a count that may have been written as a float (`"12.0"`) by a
/// dataframe export.
fn parse_count(field: &'static str, value: Option<String>) -> Result<u64, InvalidLocationError> {
    let Some(raw) = non_empty(value) else {
        return Ok(0);
    };
    if let Ok(n) = raw.parse::<u64>() {
        return Ok(n);
    }
    match raw.parse::<f64>() {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Ok(f) if f.is_finite() && f >= 0.0 && f.fract() == 0.0 => Ok(f as u64),
        _ => Err(InvalidLocationError::InvalidNumber { field, value: raw }),
    }
}

/// A location after planning area assignment, income join, and
/// classification.
///
/// Deliberately flat so it serializes to a single CSV row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedLocationRecord {
    /// Business display name.
    pub name: String,
    /// Opaque external place identifier.
    pub place_id: String,
    /// Formatted street address.
    pub formatted_address: String,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Average star rating, 0 when the listing has none.
    pub rating: f64,
    /// Number of user ratings.
    pub user_ratings_total: u64,
    /// Website URL.
    pub website: Option<String>,
    /// Formatted phone number.
    pub phone_number: Option<String>,
    /// Search keyword that discovered this listing.
    pub search_query: String,
    /// Search locale that discovered this listing.
    pub search_location: String,
    /// Assigned planning area, [`UNKNOWN_REGION`] when none.
    pub planning_area: String,
    /// Weighted average monthly household income of the planning area.
    pub weighted_average_income: f64,
    /// Household count of the planning area.
    pub total_households: u64,
    /// Classified category.
    pub category: Category,
    /// Listing has a non-empty website.
    pub has_website: bool,
    /// Listing has a non-empty phone number.
    pub has_phone: bool,
    /// Listing has a rating above zero.
    pub has_rating: bool,
    /// City-wide or neighbourhood search.
    pub search_coverage: SearchCoverage,
}

impl EnrichedLocationRecord {
    /// Builds an enriched record with every enrichment field at its
    /// default (`"Unknown"`, 0, 0, [`Category::Others`]).
    #[must_use]
    pub fn from_location(location: LocationRecord, city: &str) -> Self {
        let search_coverage = SearchCoverage::from_search_location(&location.search_location, city);
        Self {
            has_website: location.website.is_some(),
            has_phone: location.phone_number.is_some(),
            has_rating: location.rating > 0.0,
            search_coverage,
            name: location.name,
            place_id: location.place_id,
            formatted_address: location.formatted_address,
            latitude: location.latitude,
            longitude: location.longitude,
            rating: location.rating,
            user_ratings_total: location.user_ratings_total,
            website: location.website,
            phone_number: location.phone_number,
            search_query: location.search_query,
            search_location: location.search_location,
            planning_area: UNKNOWN_REGION.to_string(),
            weighted_average_income: 0.0,
            total_households: 0,
            category: Category::Others,
        }
    }
}

/// Reason a location row was rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum InvalidLocationError {
    /// A required column was empty or absent.
    MissingField {
        /// Column name.
        field: &'static str,
    },
    /// A numeric column did not parse.
    InvalidNumber {
        /// Column name.
        field: &'static str,
        /// The offending text.
        value: String,
    },
    /// The business name was empty.
    EmptyName,
    /// A coordinate was NaN or infinite.
    NonFiniteCoordinate {
        /// Latitude as given.
        latitude: f64,
        /// Longitude as given.
        longitude: f64,
    },
    /// The rating was negative, NaN or infinite.
    InvalidRating {
        /// Rating as given.
        rating: f64,
    },
}

impl std::fmt::Display for InvalidLocationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField { field } => write!(f, "missing required field '{field}'"),
            Self::InvalidNumber { field, value } => {
                write!(f, "field '{field}' is not a number: {value:?}")
            }
            Self::EmptyName => write!(f, "empty business name"),
            Self::NonFiniteCoordinate {
                latitude,
                longitude,
            } => write!(f, "non-finite coordinate ({latitude}, {longitude})"),
            Self::InvalidRating { rating } => write!(f, "invalid rating {rating}"),
        }
    }
}

impl std::error::Error for InvalidLocationError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn raw(name: &str, lat: &str, lng: &str) -> RawLocationRow {
        RawLocationRow {
            name: Some(name.to_string()),
            place_id: Some("abc".to_string()),
            latitude: Some(lat.to_string()),
            longitude: Some(lng.to_string()),
            ..RawLocationRow::default()
        }
    }

    #[test]
    fn category_labels_round_trip_through_strum() {
        for category in Category::all() {
            assert_eq!(category.to_string(), category.label());
            assert_eq!(Category::from_str(category.label()).unwrap(), *category);
        }
        assert_eq!(
            Category::from_str("yoga_pilates").unwrap(),
            Category::YogaPilates
        );
    }

    #[test]
    fn default_category_is_others() {
        assert_eq!(Category::default(), Category::Others);
    }

    #[test]
    fn converts_minimal_row_with_defaults() {
        let record = LocationRecord::try_from(raw("Pure Yoga", "1.3", "103.8")).unwrap();
        assert!((record.rating - 0.0).abs() < f64::EPSILON);
        assert_eq!(record.user_ratings_total, 0);
        assert_eq!(record.website, None);
        assert_eq!(record.search_query, "");
    }

    #[test]
    fn accepts_float_formatted_counts() {
        let mut row = raw("Gym", "1.3", "103.8");
        row.user_ratings_total = Some("42.0".to_string());
        assert_eq!(LocationRecord::try_from(row).unwrap().user_ratings_total, 42);
    }

    #[test]
    fn blank_website_becomes_none() {
        let mut row = raw("Gym", "1.3", "103.8");
        row.website = Some("   ".to_string());
        row.phone_number = Some("+65 6123 4567".to_string());
        let record = LocationRecord::try_from(row).unwrap();
        assert_eq!(record.website, None);
        assert_eq!(record.phone_number.as_deref(), Some("+65 6123 4567"));
    }

    #[test]
    fn rejects_malformed_rows() {
        assert_eq!(
            LocationRecord::try_from(raw("", "1.3", "103.8")),
            Err(InvalidLocationError::EmptyName)
        );
        assert_eq!(
            LocationRecord::try_from(raw("Gym", "north", "103.8")),
            Err(InvalidLocationError::InvalidNumber {
                field: "latitude",
                value: "north".to_string(),
            })
        );
        assert_eq!(
            LocationRecord::try_from(raw("Gym", "", "103.8")),
            Err(InvalidLocationError::MissingField { field: "latitude" })
        );
        assert!(matches!(
            LocationRecord::try_from(raw("Gym", "NaN", "103.8")),
            Err(InvalidLocationError::NonFiniteCoordinate { .. })
        ));
    }

    #[test]
    fn rejects_unusable_ratings() {
        for rating in ["NaN", "inf", "-1.5"] {
            let row = RawLocationRow {
                rating: Some(rating.to_string()),
                ..raw("Weird Gym", "1.3", "103.8")
            };
            assert!(
                matches!(
                    LocationRecord::try_from(row),
                    Err(InvalidLocationError::InvalidRating { .. })
                ),
                "{rating}"
            );
        }

        let row = RawLocationRow {
            rating: Some("4.5".to_string()),
            ..raw("Good Gym", "1.3", "103.8")
        };
        assert!(LocationRecord::try_from(row).is_ok());
    }

    #[test]
    fn enriched_defaults() {
        let mut location = LocationRecord::try_from(raw("Gym", "1.3", "103.8")).unwrap();
        location.search_location = "Singapore".to_string();
        location.rating = 4.5;
        let enriched = EnrichedLocationRecord::from_location(location, "Singapore");
        assert_eq!(enriched.planning_area, UNKNOWN_REGION);
        assert_eq!(enriched.category, Category::Others);
        assert_eq!(enriched.total_households, 0);
        assert!(enriched.has_rating);
        assert!(!enriched.has_website);
        assert_eq!(enriched.search_coverage, SearchCoverage::General);
    }

    #[test]
    fn search_coverage_is_local_for_neighbourhoods() {
        assert_eq!(
            SearchCoverage::from_search_location("Tampines, Singapore", "Singapore"),
            SearchCoverage::Local
        );
    }
}
