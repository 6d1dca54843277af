//! Household income bucket parsing and weighted averages.
//!
//! The income API reports, per planning area, a household count for each
//! monthly income bracket (`sgd_1000_to_1999`, `sgd_20000_over`, ...).
//! Each bracket is reduced to a midpoint and the area's average is the
//! household-weighted mean of those midpoints.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use fitness_map_region_models::IncomeRecord;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::RegionError;

/// Prefix shared by every counted income bucket.
const BUCKET_PREFIX: &str = "sgd_";

static RANGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]+)_to_([0-9]+)$").expect("valid regex"));

static OPEN_ENDED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]+)_over$").expect("valid regex"));

/// How bucket labels are turned into representative incomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MidpointPolicy {
    /// Value used for the open-ended top bucket (`sgd_20000_over`).
    ///
    /// `None` uses the bucket's lower bound, which is what the published
    /// averages were computed with. That understates the top bucket, so
    /// callers with a better estimate can set one here.
    pub open_ended_midpoint: Option<f64>,
}

/// A parsed income bucket label.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IncomeBucket {
    /// `sgd_<lo>_to_<hi>`
    Range {
        /// Lower bound.
        lower: f64,
        /// Upper bound.
        upper: f64,
    },
    /// `sgd_<lo>_over`
    OpenEnded {
        /// Lower bound.
        lower: f64,
    },
    /// `sgd_<n>`
    Single(f64),
    /// An `sgd_` label that did not parse. Counted with midpoint 0.
    Unrecognized,
}

impl IncomeBucket {
    /// Parses a bucket label. Returns `None` for labels that are not
    /// income buckets at all (e.g. `no_working_person`), which are
    /// excluded from household totals.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        let lower = label.to_lowercase();
        let body = lower.strip_prefix(BUCKET_PREFIX)?;

        if let Some(caps) = RANGE_RE.captures(body) {
            return Some(
                match (caps[1].parse::<f64>(), caps[2].parse::<f64>()) {
                    (Ok(lower), Ok(upper)) => Self::Range { lower, upper },
                    _ => Self::Unrecognized,
                },
            );
        }
        if let Some(caps) = OPEN_ENDED_RE.captures(body) {
            return Some(
                caps[1]
                    .parse::<f64>()
                    .map_or(Self::Unrecognized, |lower| Self::OpenEnded { lower }),
            );
        }
        Some(body.parse::<f64>().map_or(Self::Unrecognized, Self::Single))
    }

    /// Representative income for households in this bucket.
    #[must_use]
    pub fn midpoint(self, policy: &MidpointPolicy) -> f64 {
        match self {
            Self::Range { lower, upper } => (lower + upper) / 2.0,
            Self::OpenEnded { lower } => policy.open_ended_midpoint.unwrap_or(lower),
            Self::Single(value) => value,
            Self::Unrecognized => 0.0,
        }
    }
}

/// Builds an [`IncomeRecord`] from raw bucket counts.
///
/// Labels that are not income buckets are dropped. The resulting
/// distribution sums to `total_households`, and the weighted average is 0
/// when there are no households.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn from_distribution(
    region_name: impl Into<String>,
    distribution: BTreeMap<String, u64>,
    policy: &MidpointPolicy,
) -> IncomeRecord {
    let mut income_distribution = BTreeMap::new();
    let mut total_households = 0u64;
    let mut weighted_sum = 0.0;

    for (label, count) in distribution {
        let Some(bucket) = IncomeBucket::parse(&label) else {
            continue;
        };
        total_households += count;
        weighted_sum += bucket.midpoint(policy) * count as f64;
        income_distribution.insert(label, count);
    }

    let weighted_average_income = if total_households == 0 {
        0.0
    } else {
        weighted_sum / total_households as f64
    };

    IncomeRecord {
        region_name: region_name.into(),
        total_households,
        weighted_average_income,
        income_distribution,
    }
}

/// Converts one row of the household income API response.
///
/// The row names its planning area under `planning_area` (or
/// `planningArea`) and carries one numeric field per bucket. Non-numeric
/// and negative bucket values are skipped.
///
/// # Errors
///
/// Returns [`RegionError`] if the row is not an object or has no planning
/// area name.
pub fn from_onemap_row(
    row: &serde_json::Value,
    policy: &MidpointPolicy,
) -> Result<IncomeRecord, RegionError> {
    let obj = row.as_object().ok_or_else(|| RegionError::Conversion {
        message: "income row is not a JSON object".to_string(),
    })?;

    let name = ["planning_area", "planningArea"]
        .iter()
        .find_map(|key| obj.get(*key).and_then(serde_json::Value::as_str))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(RegionError::MissingField {
            field: "planning_area",
        })?;

    let mut distribution = BTreeMap::new();
    for (key, value) in obj {
        if !key.to_lowercase().starts_with(BUCKET_PREFIX) {
            continue;
        }
        let Some(count) = count_from_json(value) else {
            log::debug!("{name}: ignoring non-count bucket {key}={value}");
            continue;
        };
        distribution.insert(key.clone(), count);
    }

    Ok(from_distribution(name, distribution, policy))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn count_from_json(value: &serde_json::Value) -> Option<u64> {
    if let Some(n) = value.as_u64() {
        return Some(n);
    }
    value
        .as_f64()
        .filter(|f| f.is_finite() && *f >= 0.0)
        .map(|f| f.round() as u64)
}
