//! CSV and JSON file interface.
//!
//! Readers are lenient: a row that fails to parse is logged and skipped
//! so one bad cell never sinks a whole file. Each `read_*` function takes
//! any [`Read`]; the `load_*`/`save_*` wrappers open paths.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use fitness_map_classify::Classifier;
use fitness_map_location_models::{EnrichedLocationRecord, LocationRecord, RawLocationRow};
use fitness_map_region::RegionError;
use fitness_map_region::boundary::{parse_polygon_coordinates, region_from_onemap_row};
use fitness_map_region::income::{self, MidpointPolicy};
use fitness_map_region_models::{GeoPoint, IncomeRecord, RegionRecord};
use serde::Deserialize;

use crate::PipelineError;
use crate::summary::Summary;

/// Listings read from a CSV plus the number of rows rejected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationLoad {
    /// Valid listings in file order.
    pub locations: Vec<LocationRecord>,
    /// Rows that failed to parse or validate.
    pub skipped: usize,
}

/// Reads listings from `locations.csv`-shaped data.
///
/// # Errors
///
/// Returns [`PipelineError::Csv`] if the header row cannot be read.
pub fn read_locations(reader: impl Read) -> Result<LocationLoad, PipelineError> {
    let mut csv_reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    csv_reader.headers()?;

    let mut load = LocationLoad::default();
    for (i, result) in csv_reader.deserialize::<RawLocationRow>().enumerate() {
        let row = match result {
            Ok(row) => row,
            Err(e) => {
                log::warn!("Skipping malformed location row {}: {e}", i + 1);
                load.skipped += 1;
                continue;
            }
        };
        match LocationRecord::try_from(row) {
            Ok(location) => load.locations.push(location),
            Err(e) => {
                log::warn!("Skipping location row {}: {e}", i + 1);
                load.skipped += 1;
            }
        }
    }

    log::info!(
        "Read {} locations ({} rows skipped)",
        load.locations.len(),
        load.skipped
    );
    Ok(load)
}

/// Opens and reads a listings CSV.
///
/// # Errors
///
/// Returns [`PipelineError`] if the file cannot be opened or has no
/// readable header.
pub fn load_locations(path: &Path) -> Result<LocationLoad, PipelineError> {
    read_locations(File::open(path)?)
}

#[derive(Debug, Deserialize)]
struct RegionRow {
    planning_area_name: String,
    #[serde(default)]
    centroid_latitude: Option<f64>,
    #[serde(default)]
    centroid_longitude: Option<f64>,
    #[serde(default)]
    polygon_coordinates: Option<String>,
}

impl RegionRow {
    /// `Ok(None)` for a row with neither a boundary nor a usable centroid.
    fn into_region(self) -> Result<Option<RegionRecord>, RegionError> {
        let ring = match self
            .polygon_coordinates
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            Some(json) => parse_polygon_coordinates(json)?,
            None => Vec::new(),
        };

        // 0,0 is what the export writes for an area it had no polygon for
        let centroid = match (self.centroid_latitude, self.centroid_longitude) {
            (Some(lat), Some(lng)) if lat.abs() > 0.0 || lng.abs() > 0.0 => {
                Some(GeoPoint::new(lat, lng))
            }
            _ => None,
        };

        if ring.is_empty() && centroid.is_none() {
            return Ok(None);
        }
        Ok(Some(RegionRecord::new(
            self.planning_area_name.trim(),
            centroid,
            ring,
        )?))
    }
}

/// Reads planning areas from `planning_areas.csv`-shaped data.
///
/// # Errors
///
/// Returns [`PipelineError::Csv`] if the header row cannot be read.
pub fn read_regions(reader: impl Read) -> Result<Vec<RegionRecord>, PipelineError> {
    let mut csv_reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    csv_reader.headers()?;

    let mut regions = Vec::new();
    for result in csv_reader.deserialize::<RegionRow>() {
        let row = match result {
            Ok(row) => row,
            Err(e) => {
                log::warn!("Skipping malformed planning area row: {e}");
                continue;
            }
        };
        let name = row.planning_area_name.clone();
        match row.into_region() {
            Ok(Some(region)) => regions.push(region),
            Ok(None) => log::warn!("Dropping planning area {name}: no boundary or centroid"),
            Err(e) => log::warn!("Dropping planning area {name}: {e}"),
        }
    }

    log::info!("Read {} planning areas", regions.len());
    Ok(regions)
}

/// Opens and reads a planning areas CSV.
///
/// # Errors
///
/// Returns [`PipelineError`] if the file cannot be opened or has no
/// readable header.
pub fn load_regions(path: &Path) -> Result<Vec<RegionRecord>, PipelineError> {
    read_regions(File::open(path)?)
}

/// Parses a JSON array of raw planning-area API rows. Rows that fail to
/// convert are logged and skipped.
///
/// # Errors
///
/// Returns [`PipelineError::Json`] if the text is not a JSON array.
pub fn parse_regions_json(json: &str) -> Result<Vec<RegionRecord>, PipelineError> {
    let rows: Vec<serde_json::Value> = serde_json::from_str(json)?;
    let regions: Vec<RegionRecord> = rows
        .iter()
        .filter_map(|row| match region_from_onemap_row(row) {
            Ok(region) => Some(region),
            Err(e) => {
                log::warn!("Skipping planning area row: {e}");
                None
            }
        })
        .collect();
    log::info!("Parsed {} of {} planning area rows", regions.len(), rows.len());
    Ok(regions)
}

/// Reads a JSON dump of raw planning-area API rows.
///
/// # Errors
///
/// Returns [`PipelineError`] if the file cannot be read or is not a JSON
/// array.
pub fn load_regions_json(path: &Path) -> Result<Vec<RegionRecord>, PipelineError> {
    parse_regions_json(&std::fs::read_to_string(path)?)
}

#[derive(Debug, Deserialize)]
struct IncomeRow {
    planning_area: String,
    #[serde(default)]
    total_households: Option<f64>,
    #[serde(default)]
    weighted_average_income: Option<f64>,
    #[serde(default)]
    income_distribution: Option<String>,
}

impl IncomeRow {
    fn into_income(self, policy: &MidpointPolicy) -> Result<IncomeRecord, PipelineError> {
        let name = self.planning_area.trim();

        if let (Some(households), Some(average)) =
            (self.total_households, self.weighted_average_income)
        {
            return from_totals(name, households, average);
        }

        if let Some(distribution) = self
            .income_distribution
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            match from_distribution_cell(name, distribution, policy) {
                Ok(record) => return Ok(record),
                Err(e) => log::warn!("{name}: unreadable income distribution, using totals: {e}"),
            }
        }

        from_totals(
            name,
            self.total_households.unwrap_or(0.0),
            self.weighted_average_income.unwrap_or(0.0),
        )
    }
}

fn from_distribution_cell(
    name: &str,
    distribution: &str,
    policy: &MidpointPolicy,
) -> Result<IncomeRecord, PipelineError> {
    let mut row: serde_json::Map<String, serde_json::Value> = serde_json::from_str(distribution)?;
    row.insert(
        "planning_area".to_string(),
        serde_json::Value::String(name.to_string()),
    );
    Ok(income::from_onemap_row(
        &serde_json::Value::Object(row),
        policy,
    )?)
}

fn from_totals(name: &str, households: f64, average: f64) -> Result<IncomeRecord, PipelineError> {
    if !households.is_finite() || households < 0.0 || !average.is_finite() || average < 0.0 {
        return Err(RegionError::Conversion {
            message: format!("{name}: negative or non-finite income totals"),
        }
        .into());
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let households = households.round() as u64;
    Ok(IncomeRecord::from_totals(name, households, average))
}

/// Reads household income from `household_income.csv`-shaped data.
///
/// The `total_households` and `weighted_average_income` columns are used
/// when both are present. Otherwise the totals are recomputed under
/// `policy` from an `income_distribution` JSON object, if the row has a
/// readable one.
///
/// # Errors
///
/// Returns [`PipelineError::Csv`] if the header row cannot be read.
pub fn read_incomes(
    reader: impl Read,
    policy: &MidpointPolicy,
) -> Result<Vec<IncomeRecord>, PipelineError> {
    let mut csv_reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    csv_reader.headers()?;

    let mut incomes = Vec::new();
    for result in csv_reader.deserialize::<IncomeRow>() {
        let parsed = result
            .map_err(PipelineError::from)
            .and_then(|row| row.into_income(policy));
        match parsed {
            Ok(record) => incomes.push(record),
            Err(e) => log::warn!("Skipping household income row: {e}"),
        }
    }

    log::info!("Read income data for {} planning areas", incomes.len());
    Ok(incomes)
}

/// Opens and reads a household income CSV.
///
/// # Errors
///
/// Returns [`PipelineError`] if the file cannot be opened or has no
/// readable header.
pub fn load_incomes(
    path: &Path,
    policy: &MidpointPolicy,
) -> Result<Vec<IncomeRecord>, PipelineError> {
    read_incomes(File::open(path)?, policy)
}

/// Parses a JSON array of raw household income API rows.
///
/// # Errors
///
/// Returns [`PipelineError::Json`] if the text is not a JSON array.
pub fn parse_incomes_json(
    json: &str,
    policy: &MidpointPolicy,
) -> Result<Vec<IncomeRecord>, PipelineError> {
    let rows: Vec<serde_json::Value> = serde_json::from_str(json)?;
    let incomes: Vec<IncomeRecord> = rows
        .iter()
        .filter_map(|row| match income::from_onemap_row(row, policy) {
            Ok(record) => Some(record),
            Err(e) => {
                log::warn!("Skipping household income row: {e}");
                None
            }
        })
        .collect();
    log::info!("Parsed {} of {} household income rows", incomes.len(), rows.len());
    Ok(incomes)
}

/// Reads a JSON dump of raw household income API rows.
///
/// # Errors
///
/// Returns [`PipelineError`] if the file cannot be read or is not a JSON
/// array.
pub fn load_incomes_json(
    path: &Path,
    policy: &MidpointPolicy,
) -> Result<Vec<IncomeRecord>, PipelineError> {
    parse_incomes_json(&std::fs::read_to_string(path)?, policy)
}

/// Writes enriched records as CSV with a header row.
///
/// # Errors
///
/// Returns [`PipelineError`] if serialization or the write fails.
pub fn write_records(
    writer: impl Write,
    records: &[EnrichedLocationRecord],
) -> Result<(), PipelineError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for record in records {
        csv_writer.serialize(record)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Writes enriched records to a CSV file, creating parent directories.
///
/// # Errors
///
/// Returns [`PipelineError`] if the file cannot be created or written.
pub fn save_records(path: &Path, records: &[EnrichedLocationRecord]) -> Result<(), PipelineError> {
    write_records(create(path)?, records)?;
    log::info!("Saved {} records to {}", records.len(), path.display());
    Ok(())
}

/// Writes the summary as pretty-printed JSON, creating parent
/// directories.
///
/// # Errors
///
/// Returns [`PipelineError`] if the file cannot be created or written.
pub fn save_summary(path: &Path, summary: &Summary) -> Result<(), PipelineError> {
    let mut file = create(path)?;
    serde_json::to_writer_pretty(&mut file, summary)?;
    file.write_all(b"\n")?;
    log::info!("Saved summary to {}", path.display());
    Ok(())
}

fn create(path: &Path) -> Result<File, PipelineError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(File::create(path)?)
}

/// Row counts from [`filter_csv`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterCounts {
    /// Rows written to the kept output.
    pub kept: usize,
    /// Rows written to the excluded output.
    pub excluded: usize,
}

/// Splits any CSV with a `name` column into kept and excluded rows using
/// the non-fitness filter. Columns and their order are preserved.
///
/// # Errors
///
/// Returns [`PipelineError::MissingColumn`] if there is no `name` column,
/// or [`PipelineError::Csv`] on a read or write failure.
pub fn filter_csv(
    reader: impl Read,
    kept: impl Write,
    excluded: impl Write,
    classifier: &Classifier,
) -> Result<FilterCounts, PipelineError> {
    let mut csv_reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = csv_reader.headers()?.clone();
    let name_index = headers
        .iter()
        .position(|h| h.trim() == "name")
        .ok_or(PipelineError::MissingColumn { column: "name" })?;

    let mut kept_writer = csv::WriterBuilder::new().flexible(true).from_writer(kept);
    let mut excluded_writer = csv::WriterBuilder::new().flexible(true).from_writer(excluded);
    kept_writer.write_record(&headers)?;
    excluded_writer.write_record(&headers)?;

    let mut counts = FilterCounts::default();
    for result in csv_reader.records() {
        let record = result?;
        let name = record.get(name_index).unwrap_or("");
        if classifier.is_excluded(name) {
            excluded_writer.write_record(&record)?;
            counts.excluded += 1;
        } else {
            kept_writer.write_record(&record)?;
            counts.kept += 1;
        }
    }

    kept_writer.flush()?;
    excluded_writer.flush()?;
    Ok(counts)
}

/// Runs [`filter_csv`] between files, creating parent directories for
/// the outputs.
///
/// # Errors
///
/// Returns [`PipelineError`] if any file cannot be opened or the filter
/// fails.
pub fn filter_csv_file(
    input: &Path,
    kept: &Path,
    excluded: &Path,
    classifier: &Classifier,
) -> Result<FilterCounts, PipelineError> {
    let counts = filter_csv(File::open(input)?, create(kept)?, create(excluded)?, classifier)?;
    log::info!(
        "Kept {} locations, excluded {} from {}",
        counts.kept,
        counts.excluded,
        input.display()
    );
    Ok(counts)
}
