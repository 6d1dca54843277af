#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the fitness location enrichment pipeline.

mod report;

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use fitness_map_classify::Classifier;
use fitness_map_cli_utils::{EnrichmentBar, MultiProgress};
use fitness_map_pipeline::config::PipelineConfig;
use fitness_map_pipeline::{io, run_with_progress};
use fitness_map_spatial::AssignmentStrategy;

#[derive(Parser)]
#[command(name = "fitness_map_cli", about = "Fitness location enrichment pipeline")]
struct Cli {
    /// Pipeline configuration file (TOML). Flags override its values.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Keyword table (TOML) replacing the built-in rules
    #[arg(long, global = true)]
    keyword_table: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assign planning areas, join income, classify, and write the combined data
    Process(ProcessArgs),
    /// Split a listings CSV into fitness and non-fitness rows
    Clean {
        /// CSV with a `name` column (defaults to the configured locations file)
        input: Option<PathBuf>,
        /// Where to write kept rows
        #[arg(long, default_value = "data/cleaned_locations.csv")]
        kept: PathBuf,
        /// Where to write excluded rows (defaults to the configured path)
        #[arg(long)]
        excluded: Option<PathBuf>,
    },
    /// Show the category and filter verdict for one business name
    Classify {
        /// Business name
        name: String,
        /// Search query to fall back on when the name matches no rule
        #[arg(long)]
        context: Option<String>,
    },
    /// List the active keyword rules
    Rules,
}

#[derive(Args)]
#[allow(clippy::struct_excessive_bools)]
struct ProcessArgs {
    /// Listings CSV
    #[arg(long)]
    locations: Option<PathBuf>,
    /// Planning areas CSV
    #[arg(long)]
    planning_areas: Option<PathBuf>,
    /// Household income CSV
    #[arg(long)]
    household_income: Option<PathBuf>,
    /// Raw planning-area API rows (JSON array), used instead of the CSV
    #[arg(long)]
    regions_json: Option<PathBuf>,
    /// Raw household income API rows (JSON array), used instead of the CSV
    #[arg(long)]
    income_json: Option<PathBuf>,
    /// Combined output CSV
    #[arg(long)]
    output: Option<PathBuf>,
    /// Excluded listings CSV (written with `--exclude`)
    #[arg(long)]
    excluded_output: Option<PathBuf>,
    /// Summary JSON
    #[arg(long)]
    summary_output: Option<PathBuf>,
    /// `nearest_centroid` or `boundary_then_centroid`
    #[arg(long, value_parser = parse_strategy)]
    strategy: Option<AssignmentStrategy>,
    /// Income used for the open-ended top bucket (default: its lower bound)
    #[arg(long)]
    open_ended_midpoint: Option<f64>,
    /// Search location that counts as a city-wide search
    #[arg(long)]
    city: Option<String>,
    /// Drop listings the keyword filter flags as non-fitness
    #[arg(long)]
    exclude: bool,
    /// Drop duplicate listings
    #[arg(long)]
    dedupe: bool,
    /// Drop listings outside the configured bounding box
    #[arg(long)]
    filter_bounds: bool,
    /// Classify by name only, ignoring the search query
    #[arg(long)]
    no_search_context: bool,
}

impl ProcessArgs {
    fn apply(self, config: &mut PipelineConfig) {
        let inputs = &mut config.inputs;
        if let Some(path) = self.locations {
            inputs.locations = path;
        }
        if let Some(path) = self.planning_areas {
            inputs.planning_areas = path;
        }
        if let Some(path) = self.household_income {
            inputs.household_income = path;
        }
        if self.regions_json.is_some() {
            inputs.regions_json = self.regions_json;
        }
        if self.income_json.is_some() {
            inputs.income_json = self.income_json;
        }

        let outputs = &mut config.outputs;
        if let Some(path) = self.output {
            outputs.combined = path;
        }
        if let Some(path) = self.excluded_output {
            outputs.excluded = path;
        }
        if let Some(path) = self.summary_output {
            outputs.summary = path;
        }

        if let Some(strategy) = self.strategy {
            config.strategy = strategy;
        }
        if let Some(midpoint) = self.open_ended_midpoint {
            config.income.open_ended_midpoint = Some(midpoint);
        }
        if let Some(city) = self.city {
            config.city = city;
        }
        config.apply_exclusions |= self.exclude;
        config.dedupe |= self.dedupe;
        config.filter_bounds |= self.filter_bounds;
        if self.no_search_context {
            config.use_search_context = false;
        }
    }
}

fn parse_strategy(s: &str) -> Result<AssignmentStrategy, String> {
    s.parse().map_err(|_| {
        let names: Vec<String> = AssignmentStrategy::all()
            .iter()
            .map(ToString::to_string)
            .collect();
        format!("unknown strategy '{s}' (expected one of: {})", names.join(", "))
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = fitness_map_cli_utils::init_logger();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    if cli.keyword_table.is_some() {
        config.keyword_table = cli.keyword_table;
    }

    match cli.command {
        Commands::Process(args) => {
            args.apply(&mut config);
            process(&config, &multi)?;
        }
        Commands::Clean {
            input,
            kept,
            excluded,
        } => {
            let classifier = Classifier::new(config.keyword_table()?);
            let input = input.unwrap_or_else(|| config.inputs.locations.clone());
            let excluded = excluded.unwrap_or_else(|| config.outputs.excluded.clone());
            let counts = io::filter_csv_file(&input, &kept, &excluded, &classifier)?;
            println!(
                "Kept {} locations -> {}",
                counts.kept,
                kept.display()
            );
            println!(
                "Excluded {} locations -> {}",
                counts.excluded,
                excluded.display()
            );
        }
        Commands::Classify { name, context } => {
            let classifier = Classifier::new(config.keyword_table()?);
            let category = classifier.classify(&name, context.as_deref());
            let verdict = if classifier.is_excluded(&name) {
                "excluded"
            } else {
                "kept"
            };
            println!("{name}: {category} ({verdict})");
        }
        Commands::Rules => {
            report::print_rules(&config.keyword_table()?);
        }
    }

    Ok(())
}

fn process(config: &PipelineConfig, multi: &MultiProgress) -> Result<(), Box<dyn std::error::Error>> {
    let inputs = &config.inputs;

    let load = io::load_locations(&inputs.locations)?;
    let regions = match &inputs.regions_json {
        Some(path) => io::load_regions_json(path)?,
        None => io::load_regions(&inputs.planning_areas)?,
    };
    let incomes = match &inputs.income_json {
        Some(path) => io::load_incomes_json(path, &config.income)?,
        None => io::load_incomes(&inputs.household_income, &config.income)?,
    };

    if regions.is_empty() {
        log::warn!("No planning areas loaded; every location will be assigned \"Unknown\"");
    }

    let options = config.to_options()?;
    let progress = EnrichmentBar::new(multi);
    let mut output = run_with_progress(
        &load.locations,
        &regions,
        &incomes,
        &options,
        &progress,
    );
    output.summary.skipped += load.skipped;

    let outputs = &config.outputs;
    io::save_records(&outputs.combined, &output.records)?;
    if options.apply_exclusions {
        io::save_records(&outputs.excluded, &output.excluded)?;
    }
    io::save_summary(&outputs.summary, &output.summary)?;

    report::print_summary(&output.summary);
    print_written(&[
        Some(outputs.combined.as_path()),
        options.apply_exclusions.then_some(outputs.excluded.as_path()),
        Some(outputs.summary.as_path()),
    ]);

    Ok(())
}

fn print_written(paths: &[Option<&Path>]) {
    println!();
    for path in paths.iter().flatten() {
        println!("Wrote {}", path.display());
    }
}
