//! Progress reporting for [`crate::run_with_progress`].
//!
//! A run reports one stage: `set_total` with the number of listings that
//! survived validation and filtering, one `inc` per assigned listing, then
//! `finish` with the outcome line.

/// Receives progress updates from a pipeline run.
pub trait ProgressCallback: Send + Sync {
    /// Number of listings the run will assign.
    fn set_total(&self, total: u64);

    /// Advances by `delta` listings.
    fn inc(&self, delta: u64);

    /// Names the current step.
    fn set_message(&self, msg: String);

    /// Ends the run, leaving `msg` visible.
    fn finish(&self, msg: String);
}

/// Discards every update. Used by [`crate::run`].
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
}
