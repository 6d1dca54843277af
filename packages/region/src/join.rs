//! Left join of planning area income statistics onto located listings.

use std::collections::BTreeMap;

use fitness_map_location_models::EnrichedLocationRecord;
use fitness_map_region_models::IncomeRecord;

use crate::normalize::normalize;

/// Income records keyed by normalized planning area name.
///
/// Built once per run and consulted for every location.
#[derive(Debug, Clone, Default)]
pub struct IncomeTable {
    by_key: BTreeMap<String, IncomeRecord>,
}

impl IncomeTable {
    /// Builds the lookup table.
    ///
    /// If two records normalize to the same key the later one wins.
    #[must_use]
    pub fn build(incomes: &[IncomeRecord]) -> Self {
        let mut by_key = BTreeMap::new();
        for income in incomes {
            let key = normalize(&income.region_name);
            if let Some(previous) = by_key.insert(key, income.clone()) {
                log::debug!(
                    "Duplicate income record for {}: replacing {} with {}",
                    income.region_name,
                    previous.region_name,
                    income.region_name,
                );
            }
        }
        Self { by_key }
    }

    /// Number of distinct planning areas in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    /// Whether the table holds no income records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    /// Looks up a planning area by any spelling of its name.
    #[must_use]
    pub fn lookup(&self, region_name: &str) -> Option<&IncomeRecord> {
        self.by_key.get(&normalize(region_name))
    }

    /// Copies income statistics onto a record, or zeroes them on a miss.
    /// Returns whether the lookup hit.
    pub fn apply(&self, record: &mut EnrichedLocationRecord) -> bool {
        if let Some(income) = self.lookup(&record.planning_area) {
            record.weighted_average_income = income.weighted_average_income;
            record.total_households = income.total_households;
            true
        } else {
            record.weighted_average_income = 0.0;
            record.total_households = 0;
            false
        }
    }
}

/// Joins income statistics from a prebuilt table onto located records.
///
/// Produces exactly one output record per input record, in input order.
/// Records whose planning area has no income data get 0 and 0.
#[must_use]
pub fn join(
    mut records: Vec<EnrichedLocationRecord>,
    table: &IncomeTable,
) -> Vec<EnrichedLocationRecord> {
    let misses = records
        .iter_mut()
        .map(|record| table.apply(record))
        .filter(|hit| !hit)
        .count();
    if misses > 0 {
        log::info!(
            "{misses} of {} locations had no income data for their planning area",
            records.len()
        );
    }
    records
}
