//! Listing clean-up applied before enrichment: duplicate removal and a
//! bounding box filter.

use std::collections::BTreeSet;

use fitness_map_location_models::LocationRecord;
use serde::{Deserialize, Serialize};

/// Latitude/longitude bounding box, inclusive on every edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Maximum latitude.
    pub north: f64,
    /// Minimum latitude.
    pub south: f64,
    /// Maximum longitude.
    pub east: f64,
    /// Minimum longitude.
    pub west: f64,
}

impl Bounds {
    /// Approximate bounding box of Singapore.
    pub const SINGAPORE: Self = Self {
        north: 1.4708,
        south: 1.2494,
        east: 104.0245,
        west: 103.6058,
    };

    /// Whether the point lies inside the box.
    #[must_use]
    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        (self.south..=self.north).contains(&latitude) && (self.west..=self.east).contains(&longitude)
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::SINGAPORE
    }
}

/// Removes duplicate listings, keeping the first occurrence.
///
/// Runs three passes, each over the survivors of the previous one:
/// identical place id (blank ids never match), identical lower-cased
/// `name|address`, and identical coordinates rounded to 4 decimal places
/// (about 11 m). Returns the survivors and the number removed.
#[must_use]
pub fn dedupe(locations: Vec<LocationRecord>) -> (Vec<LocationRecord>, usize) {
    let before = locations.len();

    let locations = retain_first(locations, |l| {
        (!l.place_id.is_empty()).then(|| l.place_id.clone())
    });
    let by_id = locations.len();

    let locations = retain_first(locations, |l| {
        Some(format!(
            "{}|{}",
            l.name.trim().to_lowercase(),
            l.formatted_address.trim().to_lowercase()
        ))
    });
    let by_name = locations.len();

    let locations = retain_first(locations, |l| {
        Some(format!("{:.4}|{:.4}", l.latitude, l.longitude))
    });

    log::info!(
        "Deduplicated {before} locations: {} by place id, {} by name and address, {} by coordinates",
        before - by_id,
        by_id - by_name,
        by_name - locations.len(),
    );

    let removed = before - locations.len();
    (locations, removed)
}

fn retain_first(
    locations: Vec<LocationRecord>,
    key: impl Fn(&LocationRecord) -> Option<String>,
) -> Vec<LocationRecord> {
    let mut seen = BTreeSet::new();
    locations
        .into_iter()
        .filter(|l| key(l).is_none_or(|k| seen.insert(k)))
        .collect()
}

/// Keeps only listings inside `bounds`. Returns the survivors and the
/// number dropped.
#[must_use]
pub fn within_bounds(locations: Vec<LocationRecord>, bounds: &Bounds) -> (Vec<LocationRecord>, usize) {
    let before = locations.len();
    let kept: Vec<LocationRecord> = locations
        .into_iter()
        .filter(|l| bounds.contains(l.latitude, l.longitude))
        .collect();
    let dropped = before - kept.len();
    if dropped > 0 {
        log::info!("Dropped {dropped} locations outside the bounding box");
    }
    (kept, dropped)
}
