#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Terminal plumbing for the fitness map binaries.
//!
//! [`init_logger`] routes `log` output through `indicatif-log-bridge` so
//! log lines are printed above the enrichment bar, and [`EnrichmentBar`]
//! renders a pipeline run.

use std::time::Duration;

use fitness_map_pipeline::progress::ProgressCallback;
use indicatif::{ProgressBar, ProgressStyle};

pub use indicatif::MultiProgress;

const SPINNER_TEMPLATE: &str = "{spinner:.green} {msg}";
const BAR_TEMPLATE: &str = "  {msg:<28} [{bar:32.cyan/blue}] {pos}/{len} locations ({elapsed})";

/// Per-listing bar for one enrichment run.
///
/// Spins while inputs are validated and filtered, and switches to a
/// counted bar once the run reports how many listings it will assign.
pub struct EnrichmentBar {
    bar: ProgressBar,
}

impl EnrichmentBar {
    /// Adds the bar to `multi`.
    #[must_use]
    pub fn new(multi: &MultiProgress) -> Self {
        let bar = multi.add(ProgressBar::new_spinner());
        bar.enable_steady_tick(Duration::from_millis(120));
        if let Ok(style) = ProgressStyle::with_template(SPINNER_TEMPLATE) {
            bar.set_style(style);
        }
        bar.set_message("Preparing locations");
        Self { bar }
    }
}

impl ProgressCallback for EnrichmentBar {
    fn set_total(&self, total: u64) {
        self.bar.set_length(total);
        if let Ok(style) = ProgressStyle::with_template(BAR_TEMPLATE) {
            self.bar.set_style(style.progress_chars("=> "));
        }
    }

    fn inc(&self, delta: u64) {
        self.bar.inc(delta);
    }

    fn set_message(&self, msg: String) {
        self.bar.set_message(msg);
    }

    fn finish(&self, msg: String) {
        self.bar.finish_with_message(msg);
    }
}

/// Installs `pretty_env_logger` (filtered by `RUST_LOG`) behind
/// `indicatif-log-bridge`.
///
/// Returns the [`MultiProgress`] the enrichment bar must be added to.
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();

    let logger = pretty_env_logger::formatted_builder()
        .parse_env("RUST_LOG")
        .build();
    let level = logger.filter();

    if let Err(e) = indicatif_log_bridge::LogWrapper::new(multi.clone(), logger).try_init() {
        eprintln!("Logger already initialized: {e}");
    }
    log::set_max_level(level);

    multi
}
