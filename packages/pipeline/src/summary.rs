//! Read-only aggregation over an enriched record set.

use std::collections::{BTreeMap, BTreeSet};

use fitness_map_location_models::{Category, EnrichedLocationRecord, SearchCoverage};
use serde::Serialize;

/// Number of entries in [`Summary::top_rated_locations`].
pub const TOP_RATED_LIMIT: usize = 10;

/// Summary statistics for one pipeline run.
///
/// Every map is ordered so the serialized form is stable across runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    /// Records in the output set.
    pub total_locations: usize,
    /// Input rows rejected as malformed.
    pub skipped: usize,
    /// Records removed by the non-fitness filter.
    pub excluded: usize,
    /// Listings dropped as duplicates.
    pub duplicates_removed: usize,
    /// Listings dropped for falling outside the bounding box.
    pub out_of_bounds: usize,
    /// Records per category; categories with no records are absent.
    pub categories: BTreeMap<Category, usize>,
    /// Records per assigned planning area, `"Unknown"` included.
    pub planning_areas: BTreeMap<String, usize>,
    /// `None` for an empty set.
    pub average_rating: Option<f64>,
    /// Records with a website.
    pub locations_with_websites: usize,
    /// Records with a phone number.
    pub locations_with_phones: usize,
    /// Records with a non-zero rating.
    pub locations_with_ratings: usize,
    /// Records per search scope.
    pub search_coverage: BTreeMap<SearchCoverage, usize>,
    /// Distinct `search_location` values.
    pub unique_search_locations: usize,
    /// Mean `weighted_average_income` per category, misses counted as 0.
    pub average_income_by_category: BTreeMap<Category, f64>,
    /// Highest rated first; ties keep input order.
    pub top_rated_locations: Vec<TopRated>,
    /// `None` for an empty set.
    pub income_statistics: Option<IncomeStats>,
}

/// One entry of the top-rated list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopRated {
    /// Business name.
    pub name: String,
    /// Assigned category.
    pub category: Category,
    /// Star rating.
    pub rating: f64,
    /// Assigned planning area.
    pub planning_area: String,
}

/// Distribution of `weighted_average_income` across records.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IncomeStats {
    /// Lowest value.
    pub min: f64,
    /// Middle value, or the mean of the two middle values.
    pub median: f64,
    /// Arithmetic mean.
    pub mean: f64,
    /// Highest value.
    pub max: f64,
}

impl IncomeStats {
    /// Computes the statistics, or `None` for an empty slice. The median
    /// of an even count is the mean of the two middle values.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let n = sorted.len();
        let median = if n % 2 == 1 {
            sorted[n / 2]
        } else {
            f64::midpoint(sorted[n / 2 - 1], sorted[n / 2])
        };

        Some(Self {
            min: sorted[0],
            median,
            mean: sorted.iter().sum::<f64>() / n as f64,
            max: sorted[n - 1],
        })
    }
}

/// Aggregates an enriched record set. The drop counters (`skipped`,
/// `excluded`, ...) are left at zero for the caller to fill in.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn summarize(records: &[EnrichedLocationRecord]) -> Summary {
    if records.is_empty() {
        return Summary::default();
    }

    let mut categories = BTreeMap::new();
    let mut planning_areas = BTreeMap::new();
    let mut search_coverage = BTreeMap::new();
    let mut income_by_category: BTreeMap<Category, (f64, usize)> = BTreeMap::new();
    let mut search_locations = BTreeSet::new();

    for record in records {
        *categories.entry(record.category).or_insert(0) += 1;
        *planning_areas
            .entry(record.planning_area.clone())
            .or_insert(0) += 1;
        *search_coverage.entry(record.search_coverage).or_insert(0) += 1;
        let (sum, count) = income_by_category.entry(record.category).or_insert((0.0, 0));
        *sum += record.weighted_average_income;
        *count += 1;
        search_locations.insert(record.search_location.as_str());
    }

    let n = records.len() as f64;
    let incomes: Vec<f64> = records.iter().map(|r| r.weighted_average_income).collect();

    Summary {
        total_locations: records.len(),
        skipped: 0,
        excluded: 0,
        duplicates_removed: 0,
        out_of_bounds: 0,
        categories,
        planning_areas,
        average_rating: Some(records.iter().map(|r| r.rating).sum::<f64>() / n),
        locations_with_websites: records.iter().filter(|r| r.has_website).count(),
        locations_with_phones: records.iter().filter(|r| r.has_phone).count(),
        locations_with_ratings: records.iter().filter(|r| r.has_rating).count(),
        search_coverage,
        unique_search_locations: search_locations.len(),
        average_income_by_category: income_by_category
            .into_iter()
            .map(|(category, (sum, count))| (category, sum / count as f64))
            .collect(),
        top_rated_locations: top_rated(records),
        income_statistics: IncomeStats::from_values(&incomes),
    }
}

fn top_rated(records: &[EnrichedLocationRecord]) -> Vec<TopRated> {
    let mut ranked: Vec<&EnrichedLocationRecord> = records.iter().collect();
    // stable sort keeps input order among equal ratings
    ranked.sort_by(|a, b| b.rating.total_cmp(&a.rating));
    ranked
        .into_iter()
        .take(TOP_RATED_LIMIT)
        .map(|r| TopRated {
            name: r.name.clone(),
            category: r.category,
            rating: r.rating,
            planning_area: r.planning_area.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use fitness_map_location_models::LocationRecord;

    use super::*;

    fn record(name: &str, category: Category, rating: f64, area: &str, income: f64) -> EnrichedLocationRecord {
        let location = LocationRecord {
            name: name.to_string(),
            place_id: name.to_lowercase(),
            formatted_address: String::new(),
            latitude: 1.3,
            longitude: 103.8,
            rating,
            user_ratings_total: 0,
            website: (rating > 4.0).then(|| "https://example.com".to_string()),
            phone_number: None,
            search_query: "gym".to_string(),
            search_location: (if income > 0.0 { "Bedok, Singapore" } else { "Singapore" })
                .to_string(),
        };
        let mut record = EnrichedLocationRecord::from_location(location, "Singapore");
        record.category = category;
        record.planning_area = area.to_string();
        record.weighted_average_income = income;
        record
    }

    #[test]
    fn empty_set_gives_empty_summary() {
        let summary = summarize(&[]);
        assert_eq!(summary, Summary::default());
        assert!(summary.average_rating.is_none());
        assert!(summary.income_statistics.is_none());
    }

    #[test]
    fn counts_and_means() {
        let records = vec![
            record("A", Category::Gym, 4.5, "Bedok", 10_000.0),
            record("B", Category::Gym, 3.5, "Bedok", 6_000.0),
            record("C", Category::YogaPilates, 0.0, "Tampines", 0.0),
        ];
        let summary = summarize(&records);

        assert_eq!(summary.total_locations, 3);
        assert_eq!(summary.categories[&Category::Gym], 2);
        assert_eq!(summary.categories[&Category::YogaPilates], 1);
        assert_eq!(summary.planning_areas["Bedok"], 2);
        assert!((summary.average_rating.unwrap() - 8.0 / 3.0).abs() < 1e-9);
        assert_eq!(summary.locations_with_websites, 1);
        assert_eq!(summary.locations_with_phones, 0);
        assert_eq!(summary.locations_with_ratings, 2);
        assert_eq!(summary.search_coverage[&SearchCoverage::Local], 2);
        assert_eq!(summary.search_coverage[&SearchCoverage::General], 1);
        assert_eq!(summary.unique_search_locations, 2);
        assert!((summary.average_income_by_category[&Category::Gym] - 8_000.0).abs() < 1e-9);
        assert!(summary.average_income_by_category[&Category::YogaPilates].abs() < 1e-9);
    }

    #[test]
    fn income_percentiles() {
        let stats = IncomeStats::from_values(&[9.0, 1.0, 5.0, 3.0]).unwrap();
        assert!((stats.min - 1.0).abs() < f64::EPSILON);
        assert!((stats.median - 4.0).abs() < f64::EPSILON);
        assert!((stats.mean - 4.5).abs() < f64::EPSILON);
        assert!((stats.max - 9.0).abs() < f64::EPSILON);

        let odd = IncomeStats::from_values(&[7.0, 2.0, 3.0]).unwrap();
        assert!((odd.median - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn top_rated_is_capped_and_stable() {
        let mut records: Vec<EnrichedLocationRecord> = (0..12)
            .map(|i| record(&format!("Tie {i}"), Category::Gym, 4.0, "Bedok", 1.0))
            .collect();
        records.insert(5, record("Best", Category::Bft, 5.0, "Yishun", 1.0));

        let top = summarize(&records).top_rated_locations;
        assert_eq!(top.len(), TOP_RATED_LIMIT);
        assert_eq!(top[0].name, "Best");
        let rest: Vec<&str> = top[1..].iter().map(|t| t.name.as_str()).collect();
        assert_eq!(
            rest,
            ["Tie 0", "Tie 1", "Tie 2", "Tie 3", "Tie 4", "Tie 5", "Tie 6", "Tie 7", "Tie 8"]
        );
    }

    #[test]
    fn serializes_with_display_labels() {
        let summary = summarize(&[record("A", Category::YogaPilates, 4.5, "Bedok", 1.0)]);
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["categories"]["Yoga/Pilates Studio"], 1);
        assert_eq!(json["search_coverage"]["Local"], 1);
    }
}
