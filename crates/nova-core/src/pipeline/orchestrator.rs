use std::sync::Arc;

use tracing::info;

use crate::artifact::{Artifact, DataKind};
use crate::context::RunContext;
use crate::error::{NovaError, Result};
use crate::qa::classify::Severity;
use crate::qa::count_pixels::CountPixels;
use crate::qa::report::ReportSink;
use crate::stage::Stage;
use crate::stages::{
    ChooseRefstars, Coaddition, FindData, ImageDifferencing, MakeSubimages, Photometry,
    SourceExtraction,
};
use crate::tools::ToolRunner;

use super::config::{PipelineConfig, StageName};
use super::types::{NoOpReporter, ProgressReporter, RunOutcome};

/// Run the configured pipeline with a thread-safe progress reporter.
///
/// Stages execute strictly in order. Processing output becomes the next
/// stage's input; monitoring reports are recorded alongside without
/// consuming the artifact. The first failure aborts the run; there is no
/// partial continuation and no rollback of artifacts already written.
pub fn run_pipeline_reported(
    config: &PipelineConfig,
    tools: Arc<dyn ToolRunner>,
    sink: Arc<dyn ReportSink>,
    reporter: Arc<dyn ProgressReporter>,
) -> Result<RunOutcome> {
    config.validate()?;
    let stages = build_stages(config, &tools)?;
    let ctx = RunContext {
        program: config.program.clone(),
        night: config.night.clone(),
        outdir: config.outdir.clone(),
        reference_metrics: config.reference_metrics.clone(),
        sink,
    };

    // The first stage is seeded by whatever the external data-acquisition
    // step already left under preproc/.
    let mut artifact = Artifact::discover(DataKind::ImageCollection, &ctx.outdir.join("preproc"))?;
    let mut reports = Vec::new();
    let mut status = Severity::Normal;

    for stage in &stages {
        reporter.begin_stage(stage.name());
        info!(stage = stage.name(), input = %artifact.kind, "running stage");
        if !stage.accepts(artifact.kind) {
            return Err(stage.incompatible(artifact.kind));
        }
        match stage {
            Stage::Processing(processing) => {
                let output = processing.execute(&artifact, &ctx)?;
                if output.kind != processing.output_kind() {
                    return Err(NovaError::Pipeline(format!(
                        "stage {} produced a {} artifact, declared {}",
                        processing.name(),
                        output.kind,
                        processing.output_kind()
                    )));
                }
                artifact = output;
            }
            Stage::Monitoring(monitoring) => {
                let report = monitoring.execute(&artifact, &ctx)?;
                status = status.max(report.status);
                reports.push(report);
            }
        }
        reporter.finish_stage(stage.name());
    }

    info!(%status, reports = reports.len(), "pipeline complete");
    Ok(RunOutcome {
        artifact,
        reports,
        status,
    })
}

/// Run the configured pipeline without progress reporting.
pub fn run_pipeline(
    config: &PipelineConfig,
    tools: Arc<dyn ToolRunner>,
    sink: Arc<dyn ReportSink>,
) -> Result<RunOutcome> {
    run_pipeline_reported(config, tools, sink, Arc::new(NoOpReporter))
}

fn build_stages(config: &PipelineConfig, tools: &Arc<dyn ToolRunner>) -> Result<Vec<Stage>> {
    config
        .stages
        .iter()
        .map(|name| build_stage(*name, config, tools))
        .collect()
}

fn build_stage(
    name: StageName,
    config: &PipelineConfig,
    tools: &Arc<dyn ToolRunner>,
) -> Result<Stage> {
    let table = |key: &str| NovaError::MissingParameter {
        stage: name.to_string(),
        key: key.to_string(),
    };
    Ok(match name {
        StageName::FindData => Stage::Processing(Box::new(FindData::new(
            config.discovery.clone().ok_or_else(|| table("discovery"))?,
            config.target,
        ))),
        StageName::Coaddition => Stage::Processing(Box::new(Coaddition::new(
            config.coaddition.clone().ok_or_else(|| table("coaddition"))?,
            Arc::clone(tools),
        ))),
        StageName::SourceExtraction => Stage::Processing(Box::new(SourceExtraction::new(
            config.extraction.clone().ok_or_else(|| table("extraction"))?,
            Arc::clone(tools),
        ))),
        StageName::MakeSubimages => Stage::Processing(Box::new(MakeSubimages::new(
            config.subimages.clone().ok_or_else(|| table("subimages"))?,
            config.target.ok_or_else(|| table("target"))?,
            Arc::clone(tools),
        ))),
        StageName::ImageDifferencing => Stage::Processing(Box::new(ImageDifferencing::new(
            config
                .differencing
                .clone()
                .ok_or_else(|| table("differencing"))?,
            Arc::clone(tools),
        ))),
        StageName::ChooseRefstars => Stage::Processing(Box::new(ChooseRefstars::new(
            config.refstars.clone().ok_or_else(|| table("refstars"))?,
            config.target.ok_or_else(|| table("target"))?,
            Arc::clone(tools),
        ))),
        StageName::Photometry => Stage::Processing(Box::new(Photometry::new(
            config.photometry.clone().ok_or_else(|| table("photometry"))?,
            Arc::clone(tools),
        ))),
        StageName::CountPixels => Stage::Monitoring(Box::new(CountPixels::new(
            config
                .monitoring
                .as_ref()
                .and_then(|m| m.count_pixels.clone()),
        ))),
    })
}
