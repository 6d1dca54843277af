#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Fitness location enrichment pipeline.
//!
//! Takes validated listings, planning areas, and income statistics and
//! produces one flat [`EnrichedLocationRecord`] per listing:
//!
//! 1. Malformed listings are skipped and counted
//! 2. Optional duplicate removal and bounding box filter
//! 3. Planning area assignment
//! 4. Income join on the normalized planning area name
//! 5. Keyword classification
//! 6. Optional non-fitness filter
//!
//! followed by [`summary::summarize`]. The run is deterministic: output
//! order follows input order and nothing depends on time or randomness.

pub mod config;
pub mod io;
pub mod prepare;
pub mod progress;
pub mod summary;

use fitness_map_classify::{Classifier, ClassifyError};
use fitness_map_location_models::{EnrichedLocationRecord, LocationRecord};
use fitness_map_region::RegionError;
use fitness_map_region::join::{IncomeTable, join};
use fitness_map_region_models::{GeoPoint, IncomeRecord, RegionRecord};
use fitness_map_spatial::{AssignmentStrategy, RegionIndex};
use thiserror::Error;

use crate::prepare::Bounds;
use crate::progress::{NullProgress, ProgressCallback};
use crate::summary::Summary;

/// City name whose bare search location counts as a city-wide search.
pub const DEFAULT_CITY: &str = "Singapore";

/// Errors from the file-facing parts of the pipeline. [`run`] itself
/// never fails.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reading or writing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON parsing or serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration file did not parse.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Planning area or income data was unusable.
    #[error(transparent)]
    Region(#[from] RegionError),

    /// Keyword table failed to load.
    #[error(transparent)]
    Classify(#[from] ClassifyError),

    /// A CSV lacked a column the operation needs.
    #[error("Missing column '{column}'")]
    MissingColumn {
        /// Column name.
        column: &'static str,
    },
}

/// Knobs for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Search location that marks a city-wide search.
    pub city: String,
    /// How listings are matched to planning areas.
    pub strategy: AssignmentStrategy,
    /// Keyword rules for classification and filtering.
    pub classifier: Classifier,
    /// Fall back to the search query when the name matches no category.
    pub use_search_context: bool,
    /// Move listings the keyword filter flags into
    /// [`PipelineOutput::excluded`].
    pub apply_exclusions: bool,
    /// Drop duplicate listings before enrichment.
    pub dedupe: bool,
    /// Drop listings outside this box before enrichment.
    pub bounds: Option<Bounds>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            city: DEFAULT_CITY.to_string(),
            strategy: AssignmentStrategy::default(),
            classifier: Classifier::default(),
            use_search_context: true,
            apply_exclusions: false,
            dedupe: false,
            bounds: None,
        }
    }
}

/// Result of a pipeline run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineOutput {
    /// Enriched listings, in input order.
    pub records: Vec<EnrichedLocationRecord>,
    /// Enriched listings removed by the non-fitness filter, in input order.
    pub excluded: Vec<EnrichedLocationRecord>,
    /// Statistics over `records`, with the run's drop counters filled in.
    pub summary: Summary,
}

/// Runs the pipeline without progress reporting.
#[must_use]
pub fn run(
    locations: &[LocationRecord],
    regions: &[RegionRecord],
    incomes: &[IncomeRecord],
    options: &PipelineOptions,
) -> PipelineOutput {
    run_with_progress(locations, regions, incomes, options, &NullProgress)
}

/// Planning area index and income table shared by every listing in a
/// run. Build once with [`Lookups::build`] and pass to [`run_with_lookups`]
/// to reuse across batches.
pub struct Lookups {
    /// Planning area assignment.
    pub regions: RegionIndex,
    /// Income statistics keyed by normalized planning area name.
    pub incomes: IncomeTable,
}

impl Lookups {
    /// Builds both lookup structures.
    #[must_use]
    pub fn build(
        regions: &[RegionRecord],
        incomes: &[IncomeRecord],
        strategy: AssignmentStrategy,
    ) -> Self {
        let lookups = Self {
            regions: RegionIndex::new(regions, strategy),
            incomes: IncomeTable::build(incomes),
        };
        log::debug!(
            "Built lookups: {} planning areas, {} income records",
            lookups.regions.len(),
            lookups.incomes.len()
        );
        lookups
    }
}

/// Runs the pipeline, reporting one unit of progress per listing.
///
/// Total over any input: malformed listings are skipped and counted,
/// lookups that miss fall back to `"Unknown"` and 0, and an empty batch
/// yields empty records and an empty summary.
#[must_use]
pub fn run_with_progress(
    locations: &[LocationRecord],
    regions: &[RegionRecord],
    incomes: &[IncomeRecord],
    options: &PipelineOptions,
    progress: &dyn ProgressCallback,
) -> PipelineOutput {
    let lookups = Lookups::build(regions, incomes, options.strategy);
    run_with_lookups(locations, &lookups, options, progress)
}

/// Runs the pipeline against prebuilt [`Lookups`].
///
/// The assignment strategy is the one `lookups` was built with;
/// `options.strategy` is not consulted.
#[must_use]
pub fn run_with_lookups(
    locations: &[LocationRecord],
    lookups: &Lookups,
    options: &PipelineOptions,
    progress: &dyn ProgressCallback,
) -> PipelineOutput {
    let mut skipped = 0;
    let mut valid = Vec::with_capacity(locations.len());
    for location in locations {
        match location.validate() {
            Ok(()) => valid.push(location.clone()),
            Err(e) => {
                log::warn!("Skipping location {:?} ({}): {e}", location.name, location.place_id);
                skipped += 1;
            }
        }
    }

    let (valid, duplicates_removed) = if options.dedupe {
        prepare::dedupe(valid)
    } else {
        (valid, 0)
    };
    let (valid, out_of_bounds) = match &options.bounds {
        Some(bounds) => prepare::within_bounds(valid, bounds),
        None => (valid, 0),
    };

    let index = &lookups.regions;
    log::info!(
        "Assigning {} locations to {} planning areas ({})",
        valid.len(),
        index.len(),
        index.strategy()
    );

    progress.set_total(valid.len() as u64);
    progress.set_message("Assigning planning areas".to_string());
    let located: Vec<EnrichedLocationRecord> = valid
        .into_iter()
        .map(|location| {
            let point = GeoPoint::new(location.latitude, location.longitude);
            let planning_area = index.assign(point).to_string();
            let mut record = EnrichedLocationRecord::from_location(location, &options.city);
            record.planning_area = planning_area;
            progress.inc(1);
            record
        })
        .collect();

    let joined = join(located, &lookups.incomes);

    let mut records = Vec::with_capacity(joined.len());
    let mut excluded = Vec::new();
    for mut record in joined {
        let context = options
            .use_search_context
            .then_some(record.search_query.as_str());
        record.category = options.classifier.classify(&record.name, context);

        if options.apply_exclusions && options.classifier.is_excluded(&record.name) {
            log::debug!("Excluding non-fitness location {:?}", record.name);
            excluded.push(record);
        } else {
            records.push(record);
        }
    }

    progress.finish(format!(
        "Enriched {} locations ({} excluded, {skipped} skipped)",
        records.len(),
        excluded.len()
    ));

    let mut summary = summary::summarize(&records);
    summary.skipped = skipped;
    summary.excluded = excluded.len();
    summary.duplicates_removed = duplicates_removed;
    summary.out_of_bounds = out_of_bounds;

    PipelineOutput {
        records,
        excluded,
        summary,
    }
}

#[cfg(test)]
mod tests {
    use fitness_map_location_models::{Category, UNKNOWN_REGION};

    use super::*;

    fn loc(name: &str, lat: f64, lng: f64) -> LocationRecord {
        LocationRecord {
            name: name.to_string(),
            place_id: format!("id-{name}"),
            formatted_address: String::new(),
            latitude: lat,
            longitude: lng,
            rating: 4.0,
            user_ratings_total: 10,
            website: None,
            phone_number: None,
            search_query: "gym".to_string(),
            search_location: "Singapore".to_string(),
        }
    }

    fn regions() -> Vec<RegionRecord> {
        vec![
            RegionRecord::from_centroid("Bukit Timah", GeoPoint::new(1.35, 3.80)),
            RegionRecord::from_centroid("Tampines", GeoPoint::new(1.35, 3.95)),
        ]
    }

    fn incomes() -> Vec<IncomeRecord> {
        vec![IncomeRecord::from_totals("BUKIT TIMAH", 1000, 15_710.0)]
    }

    #[test]
    fn bukit_timah_scenario() {
        let output = run(
            &[loc("Pure Yoga", 1.351, 3.801), loc("Far Away Gym", 9.0, 9.0)],
            &regions(),
            &incomes(),
            &PipelineOptions::default(),
        );

        let first = &output.records[0];
        assert_eq!(first.planning_area, "Bukit Timah");
        assert!((first.weighted_average_income - 15_710.0).abs() < f64::EPSILON);
        assert_eq!(first.total_households, 1000);
        assert_eq!(first.category, Category::YogaPilates);

        let second = &output.records[1];
        assert_eq!(second.planning_area, "Tampines");
        assert!(second.weighted_average_income.abs() < f64::EPSILON);
        assert_eq!(second.total_households, 0);
        assert_eq!(second.category, Category::Gym);
    }

    #[test]
    fn lookups_are_reused_across_batches() {
        let lookups = Lookups::build(&regions(), &incomes(), AssignmentStrategy::NearestCentroid);
        let options = PipelineOptions::default();
        let first_batch = [loc("Pure Yoga", 1.351, 3.801)];
        let second_batch = [loc("Far Away Gym", 9.0, 9.0), loc("Ritual Gym", 1.35, 3.80)];

        let first = run_with_lookups(&first_batch, &lookups, &options, &NullProgress);
        let second = run_with_lookups(&second_batch, &lookups, &options, &NullProgress);

        let combined: Vec<LocationRecord> =
            first_batch.iter().chain(&second_batch).cloned().collect();
        let fresh = run(&combined, &regions(), &incomes(), &options);

        let reused: Vec<EnrichedLocationRecord> =
            first.records.into_iter().chain(second.records).collect();
        assert_eq!(reused, fresh.records);
        assert_eq!(lookups.regions.len(), 2);
        assert_eq!(lookups.incomes.len(), 1);
    }

    #[derive(Default)]
    struct Recorder {
        total: std::sync::Mutex<Option<u64>>,
        advanced: std::sync::atomic::AtomicU64,
        finished: std::sync::Mutex<Option<String>>,
    }

    impl ProgressCallback for Recorder {
        fn set_total(&self, total: u64) {
            *self.total.lock().unwrap() = Some(total);
        }

        fn inc(&self, delta: u64) {
            self.advanced
                .fetch_add(delta, std::sync::atomic::Ordering::Relaxed);
        }

        fn set_message(&self, _msg: String) {}

        fn finish(&self, msg: String) {
            *self.finished.lock().unwrap() = Some(msg);
        }
    }

    #[test]
    fn progress_counts_assigned_locations() {
        let recorder = Recorder::default();
        let output = run_with_progress(
            &[loc("Pure Yoga", 1.351, 3.801), loc("", 1.0, 1.0), loc("Ritual Gym", 1.35, 3.8)],
            &regions(),
            &incomes(),
            &PipelineOptions::default(),
            &recorder,
        );

        assert_eq!(output.records.len(), 2);
        assert_eq!(*recorder.total.lock().unwrap(), Some(2));
        assert_eq!(
            recorder.advanced.load(std::sync::atomic::Ordering::Relaxed),
            2
        );
        assert_eq!(
            recorder.finished.lock().unwrap().as_deref(),
            Some("Enriched 2 locations (0 excluded, 1 skipped)")
        );
    }

    #[test]
    fn run_is_idempotent() {
        let locations = vec![
            loc("Pure Yoga", 1.351, 3.801),
            loc("Evolve MMA", 1.36, 3.9),
            loc("Far Away Gym", 9.0, 9.0),
        ];
        let options = PipelineOptions {
            apply_exclusions: true,
            ..PipelineOptions::default()
        };
        let a = run(&locations, &regions(), &incomes(), &options);
        let b = run(&locations, &regions(), &incomes(), &options);
        assert_eq!(a, b);
        assert_eq!(
            serde_json::to_string(&a.summary).unwrap(),
            serde_json::to_string(&b.summary).unwrap()
        );
    }

    #[test]
    fn empty_batch_is_not_an_error() {
        let output = run(&[], &regions(), &incomes(), &PipelineOptions::default());
        assert!(output.records.is_empty());
        assert!(output.excluded.is_empty());
        assert_eq!(output.summary, Summary::default());
    }

    #[test]
    fn no_regions_means_unknown() {
        let output = run(
            &[loc("Ritual Gym", 1.3, 103.8)],
            &[],
            &incomes(),
            &PipelineOptions::default(),
        );
        assert_eq!(output.records[0].planning_area, UNKNOWN_REGION);
        assert_eq!(output.records[0].total_households, 0);
    }

    #[test]
    fn malformed_locations_are_skipped_and_counted() {
        let output = run(
            &[
                loc("", 1.35, 3.8),
                loc("Bad Coordinates Gym", f64::NAN, 3.8),
                LocationRecord {
                    rating: f64::NAN,
                    ..loc("Weird Gym", 1.35, 3.8)
                },
                loc("Good Gym", 1.35, 3.8),
            ],
            &regions(),
            &incomes(),
            &PipelineOptions::default(),
        );
        assert_eq!(output.records.len(), 1);
        assert_eq!(output.summary.skipped, 3);
        assert!((output.summary.average_rating.unwrap() - 4.0).abs() < f64::EPSILON);
        assert_eq!(output.summary.total_locations, 1);
    }

    #[test]
    fn exclusions_move_records_aside() {
        let locations = vec![loc("Marina Bay Hotel", 1.35, 3.8), loc("Ritual Gym", 1.35, 3.8)];

        let kept_all = run(&locations, &regions(), &incomes(), &PipelineOptions::default());
        assert_eq!(kept_all.records.len(), 2);

        let options = PipelineOptions {
            apply_exclusions: true,
            ..PipelineOptions::default()
        };
        let filtered = run(&locations, &regions(), &incomes(), &options);
        assert_eq!(filtered.records.len(), 1);
        assert_eq!(filtered.records[0].name, "Ritual Gym");
        assert_eq!(filtered.excluded.len(), 1);
        assert_eq!(filtered.summary.excluded, 1);
    }

    #[test]
    fn search_context_is_optional() {
        let mut location = loc("The Movement Collective", 1.35, 3.8);
        location.search_query = "yoga studio".to_string();

        let with_context = run(
            std::slice::from_ref(&location),
            &regions(),
            &[],
            &PipelineOptions::default(),
        );
        assert_eq!(with_context.records[0].category, Category::YogaPilates);

        let options = PipelineOptions {
            use_search_context: false,
            ..PipelineOptions::default()
        };
        let without = run(&[location], &regions(), &[], &options);
        assert_eq!(without.records[0].category, Category::Others);
    }

    #[test]
    fn dedupe_and_bounds_are_counted() {
        let mut duplicate = loc("Ritual Gym", 1.30, 103.80);
        duplicate.place_id = "id-Ritual Gym".to_string();
        let locations = vec![
            loc("Ritual Gym", 1.30, 103.80),
            duplicate,
            loc("Far Away Gym", 9.0, 9.0),
        ];
        let options = PipelineOptions {
            dedupe: true,
            bounds: Some(Bounds::SINGAPORE),
            ..PipelineOptions::default()
        };
        let output = run(&locations, &regions(), &incomes(), &options);
        assert_eq!(output.records.len(), 1);
        assert_eq!(output.summary.duplicates_removed, 1);
        assert_eq!(output.summary.out_of_bounds, 1);
    }
}
