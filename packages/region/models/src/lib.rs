#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Planning area and household income types.
//!
//! These types describe the geographic units locations are assigned to
//! and the per-area income statistics joined onto them. They are
//! independent of the fitness listing data.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Region name used when no planning area can be assigned.
pub const UNKNOWN_REGION: &str = "Unknown";

/// A point in degree space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
}

impl GeoPoint {
    /// Creates a point from latitude and longitude.
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Planar Euclidean distance in degrees. No geodesic correction, so
    /// only meaningful for comparisons at city scale.
    #[must_use]
    pub fn planar_distance(self, other: Self) -> f64 {
        (self.lat - other.lat).hypot(self.lng - other.lng)
    }

    /// Both coordinates are finite.
    #[must_use]
    pub const fn is_finite(self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }
}

/// A planning area with its centroid and optional boundary ring.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionRecord {
    name: String,
    centroid: GeoPoint,
    boundary: Vec<GeoPoint>,
}

impl RegionRecord {
    /// Creates a region from a name and a known centroid, with no
    /// boundary. The centroid is not checked; assignment ignores regions
    /// whose centroid is not finite.
    #[must_use]
    pub fn from_centroid(name: impl Into<String>, centroid: GeoPoint) -> Self {
        Self {
            name: name.into(),
            centroid,
            boundary: Vec::new(),
        }
    }

    /// Creates a region from a boundary ring and an optional independently
    /// supplied centroid.
    ///
    /// An open ring is closed by repeating its first point. When
    /// `centroid` is `None` it is the arithmetic mean of the ring points as
    /// stored, closing point included.
    ///
    /// # Errors
    ///
    /// Returns [`BoundaryError`] if the ring has fewer than 3 distinct
    /// vertices, contains non-finite coordinates, or if there is neither a
    /// boundary nor a finite centroid.
    pub fn new(
        name: impl Into<String>,
        centroid: Option<GeoPoint>,
        mut boundary: Vec<GeoPoint>,
    ) -> Result<Self, BoundaryError> {
        let name = name.into();

        if !boundary.is_empty() {
            if boundary.iter().any(|p| !p.is_finite()) {
                return Err(BoundaryError::NonFinite { region: name });
            }
            let distinct = count_distinct(&boundary);
            if distinct < 3 {
                return Err(BoundaryError::Degenerate {
                    region: name,
                    distinct,
                });
            }
            if boundary.first() != boundary.last() {
                boundary.push(boundary[0]);
            }
        }

        let centroid = match centroid {
            Some(c) if c.is_finite() => c,
            Some(_) => return Err(BoundaryError::NonFinite { region: name }),
            None if boundary.is_empty() => {
                return Err(BoundaryError::NoGeometry { region: name });
            }
            None => mean_point(&boundary),
        };

        Ok(Self {
            name,
            centroid,
            boundary,
        })
    }

    /// Region name in its canonical source spelling.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Region centroid.
    #[must_use]
    pub const fn centroid(&self) -> GeoPoint {
        self.centroid
    }

    /// Closed boundary ring, empty if the region has none.
    #[must_use]
    pub fn boundary(&self) -> &[GeoPoint] {
        &self.boundary
    }
}

#[allow(clippy::cast_precision_loss)]
fn mean_point(points: &[GeoPoint]) -> GeoPoint {
    let n = points.len() as f64;
    let (lat_sum, lng_sum) = points
        .iter()
        .fold((0.0, 0.0), |(lat, lng), p| (lat + p.lat, lng + p.lng));
    GeoPoint::new(lat_sum / n, lng_sum / n)
}

fn count_distinct(points: &[GeoPoint]) -> usize {
    let mut sorted: Vec<(u64, u64)> = points
        .iter()
        .map(|p| (p.lat.to_bits(), p.lng.to_bits()))
        .collect();
    sorted.sort_unstable();
    sorted.dedup();
    sorted.len()
}

/// Household income statistics for one planning area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomeRecord {
    /// Planning area name as spelled by the income source.
    pub region_name: String,
    /// Number of households across all counted buckets.
    pub total_households: u64,
    /// Bucket-midpoint weighted mean of monthly household income.
    pub weighted_average_income: f64,
    /// Household count per income bucket label.
    pub income_distribution: BTreeMap<String, u64>,
}

impl IncomeRecord {
    /// Creates a record from pre-computed totals, with no bucket
    /// breakdown.
    #[must_use]
    pub fn from_totals(
        region_name: impl Into<String>,
        total_households: u64,
        weighted_average_income: f64,
    ) -> Self {
        Self {
            region_name: region_name.into(),
            total_households,
            weighted_average_income,
            income_distribution: BTreeMap::new(),
        }
    }
}

/// Error returned when a region's geometry is unusable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoundaryError {
    /// Fewer than 3 distinct boundary vertices.
    Degenerate {
        /// Region name.
        region: String,
        /// Number of distinct vertices found.
        distinct: usize,
    },
    /// A coordinate was NaN or infinite.
    NonFinite {
        /// Region name.
        region: String,
    },
    /// Neither a boundary nor a centroid was supplied.
    NoGeometry {
        /// Region name.
        region: String,
    },
}

impl std::fmt::Display for BoundaryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Degenerate { region, distinct } => write!(
                f,
                "boundary of {region} has {distinct} distinct vertices, expected at least 3"
            ),
            Self::NonFinite { region } => write!(f, "geometry of {region} is not finite"),
            Self::NoGeometry { region } => write!(f, "{region} has neither boundary nor centroid"),
        }
    }
}

impl std::error::Error for BoundaryError {}
