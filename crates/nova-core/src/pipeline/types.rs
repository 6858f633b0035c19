use crate::artifact::Artifact;
use crate::qa::classify::Severity;
use crate::qa::report::Report;

/// Thread-safe progress reporting for a pipeline run.
///
/// Implementors can drive progress bars or any other UI feedback. All
/// methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    fn begin_stage(&self, _name: &str) {}

    fn finish_stage(&self, _name: &str) {}
}

/// No-op progress reporter, used when `run_pipeline` delegates.
pub(super) struct NoOpReporter;
impl ProgressReporter for NoOpReporter {}

/// Everything a completed run produced: the final artifact, every
/// monitoring report, and the worst-of severity across them, which is the
/// operator-facing health signal for the run.
#[derive(Debug)]
pub struct RunOutcome {
    pub artifact: Artifact,
    pub reports: Vec<Report>,
    pub status: Severity,
}
