use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::qa::report::ReportSink;

/// Historical metric values from a prior run, keyed by metric name.
/// Monitoring stages prefer these over their statically configured
/// reference when classifying.
pub type ReferenceMetrics = BTreeMap<String, f64>;

/// Run-scoped values handed read-only to every stage. This is
/// configuration, not shared mutable state: stages receive it by
/// reference and never write back.
#[derive(Clone)]
pub struct RunContext {
    /// Observing program, e.g. "supernova".
    pub program: String,
    /// Target observation night (YYMMDD), when the run has one.
    pub night: Option<String>,
    /// Root output directory owned by this run.
    pub outdir: PathBuf,
    pub reference_metrics: Option<ReferenceMetrics>,
    /// Where monitoring stages persist their reports.
    pub sink: Arc<dyn ReportSink>,
}
