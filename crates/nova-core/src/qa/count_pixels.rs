use std::collections::BTreeMap;

use rayon::prelude::*;
use tracing::{debug, info};

use crate::artifact::{Artifact, DataKind};
use crate::context::RunContext;
use crate::error::{NovaError, Result};
use crate::io::image_io::{load_frame, mean_pixel_value};
use crate::pipeline::config::CountPixelsParams;
use crate::stage::{Algorithm, MonitoringStage};

use super::classify::{classify, median, BandSet, Severity, ToleranceBand};
use super::plots;
use super::report::Report;

/// Metric key under which the aggregate count is reported and under which
/// a prior run's reference value is looked up.
pub const COUNT_KEY: &str = "COUNT";

/// Monitors the mean pixel value of the coadded images: computes the
/// per-image means, reduces to the median, and classifies it against the
/// configured warn/normal bands relative to the reference count.
pub struct CountPixels {
    params: Option<CountPixelsParams>,
}

impl CountPixels {
    pub fn new(params: Option<CountPixelsParams>) -> Self {
        Self { params }
    }
}

impl Algorithm for CountPixels {
    fn name(&self) -> &'static str {
        "count-pixels"
    }

    fn input_kind(&self) -> DataKind {
        DataKind::CoaddedSet
    }

    fn output_kind(&self) -> DataKind {
        DataKind::CoaddedSet
    }
}

impl MonitoringStage for CountPixels {
    fn execute(&self, input: &Artifact, ctx: &RunContext) -> Result<Report> {
        if !self.accepts(input.kind) {
            return Err(self.incompatible(input.kind));
        }
        // Scientific thresholds are never defaulted: no parameter block,
        // no report.
        let params = self.params.as_ref().ok_or_else(|| NovaError::MissingParameter {
            stage: self.name().to_string(),
            key: "monitoring.count_pixels".to_string(),
        })?;
        if input.images.is_empty() {
            return Err(NovaError::Pipeline(
                "count-pixels: no coadded images to measure".to_string(),
            ));
        }

        let counts: Vec<f64> = input
            .images
            .par_iter()
            .map(|path| Ok(mean_pixel_value(&load_frame(path)?)))
            .collect::<Result<_>>()?;
        let count = median(&counts);

        // An explicit reference from a prior run wins over the configured
        // one; having neither is non-fatal and classifies absolutely.
        let reference = ctx
            .reference_metrics
            .as_ref()
            .and_then(|metrics| metrics.get(COUNT_KEY).copied())
            .or(params.count_ref);
        debug!(count, ?reference, "resolved count reference");

        let bands = BandSet::new(vec![
            ToleranceBand::new(
                params.count_warn_range[0],
                params.count_warn_range[1],
                Severity::Warning,
            ),
            ToleranceBand::new(
                params.count_normal_range[0],
                params.count_normal_range[1],
                Severity::Normal,
            ),
        ]);
        let status = classify(&counts, reference, params.reference_mode, &bands);
        info!(stage = self.name(), count, %status, "classified mean pixel count");

        let mut metrics = BTreeMap::new();
        metrics.insert(COUNT_KEY.to_string(), format!("{count}"));
        metrics.insert("COUNT_PER_IMAGE".to_string(), format!("{counts:?}"));

        let report = Report {
            program: ctx.program.clone(),
            stage: self.name().to_string(),
            params: params.snapshot(),
            status,
            metrics,
        };
        ctx.sink.persist(&report)?;
        plots::plot_metric_values(
            &counts,
            &ctx.outdir.join("qa").join(format!("{}.png", self.name())),
        )?;

        Ok(report)
    }
}
