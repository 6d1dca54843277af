#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Planning area assignment for listing coordinates.
//!
//! The default strategy picks the planning area whose centroid is nearest
//! in plain `(lat, lng)` space. When boundaries are available the
//! [`RegionIndex`] can instead test polygon containment first, using an
//! R-tree over boundary envelopes, and fall back to the nearest centroid.

use fitness_map_region_models::{GeoPoint, RegionRecord, UNKNOWN_REGION};
use geo::{BoundingRect, Contains, LineString, Polygon};
use rstar::{AABB, RTree, RTreeObject};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// How a point is matched to a planning area.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AssignmentStrategy {
    /// Nearest centroid by planar distance.
    #[default]
    NearestCentroid,
    /// First boundary polygon containing the point, else nearest centroid.
    BoundaryThenCentroid,
}

impl AssignmentStrategy {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::NearestCentroid, Self::BoundaryThenCentroid]
    }
}

/// Returns the name of the region whose centroid is nearest to `point`.
///
/// Distance is Euclidean in degree space, which is adequate at city scale.
/// Ties go to the region that appears first. Regions with a non-finite
/// centroid never match. Returns [`UNKNOWN_REGION`] when no region has a
/// usable centroid.
#[must_use]
pub fn assign_region(point: GeoPoint, regions: &[RegionRecord]) -> String {
    nearest_centroid(point, regions).map_or_else(
        || UNKNOWN_REGION.to_string(),
        |i| regions[i].name().to_string(),
    )
}

fn nearest_centroid(point: GeoPoint, regions: &[RegionRecord]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, region) in regions.iter().enumerate() {
        let distance = point.planar_distance(region.centroid());
        if !distance.is_finite() {
            continue;
        }
        match best {
            Some((_, current)) if distance >= current => {}
            _ => best = Some((i, distance)),
        }
    }
    best.map(|(i, _)| i)
}

/// A boundary polygon stored in the R-tree with the position of its
/// region in the input slice.
struct BoundaryEntry {
    index: usize,
    envelope: AABB<[f64; 2]>,
    polygon: Polygon<f64>,
}

impl RTreeObject for BoundaryEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Planning areas prepared for repeated lookups.
///
/// Built once per run. Cloning the region list up front lets the index
/// hand out `&str` names without tying callers to the input slice.
pub struct RegionIndex {
    regions: Vec<RegionRecord>,
    boundaries: RTree<BoundaryEntry>,
    strategy: AssignmentStrategy,
}

impl RegionIndex {
    /// Builds an index over `regions`.
    ///
    /// Regions without a boundary only take part in centroid matching.
    #[must_use]
    pub fn new(regions: &[RegionRecord], strategy: AssignmentStrategy) -> Self {
        let boundaries = match strategy {
            AssignmentStrategy::NearestCentroid => RTree::new(),
            AssignmentStrategy::BoundaryThenCentroid => {
                let entries: Vec<BoundaryEntry> = regions
                    .iter()
                    .enumerate()
                    .filter_map(|(index, region)| boundary_entry(index, region))
                    .collect();
                log::info!(
                    "Loaded {} of {} planning area boundaries into spatial index",
                    entries.len(),
                    regions.len()
                );
                RTree::bulk_load(entries)
            }
        };

        Self {
            regions: regions.to_vec(),
            boundaries,
            strategy,
        }
    }

    /// The strategy this index was built with.
    #[must_use]
    pub const fn strategy(&self) -> AssignmentStrategy {
        self.strategy
    }

    /// Number of regions in the index.
    #[must_use]
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Whether the index holds no regions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Assigns a point to a planning area name.
    ///
    /// Returns [`UNKNOWN_REGION`] when no region contains the point or has a
    /// finite centroid.
    #[must_use]
    pub fn assign(&self, point: GeoPoint) -> &str {
        if self.strategy == AssignmentStrategy::BoundaryThenCentroid
            && let Some(index) = self.containing(point)
        {
            return self.regions[index].name();
        }

        nearest_centroid(point, &self.regions)
            .map_or(UNKNOWN_REGION, |i| self.regions[i].name())
    }

    /// Lowest input position among the boundaries containing `point`.
    fn containing(&self, point: GeoPoint) -> Option<usize> {
        let geo_point = geo::Point::new(point.lng, point.lat);
        let query_env = AABB::from_point([point.lng, point.lat]);

        self.boundaries
            .locate_in_envelope_intersecting(&query_env)
            .filter(|entry| entry.polygon.contains(&geo_point))
            .map(|entry| entry.index)
            .min()
    }
}

fn boundary_entry(index: usize, region: &RegionRecord) -> Option<BoundaryEntry> {
    if region.boundary().is_empty() {
        return None;
    }

    let exterior: LineString<f64> = region
        .boundary()
        .iter()
        .map(|p| (p.lng, p.lat))
        .collect::<Vec<_>>()
        .into();
    let polygon = Polygon::new(exterior, vec![]);

    let Some(rect) = polygon.bounding_rect() else {
        log::warn!("No bounding box for planning area {}", region.name());
        return None;
    };
    let envelope =
        AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]);

    Some(BoundaryEntry {
        index,
        envelope,
        polygon,
    })
}
