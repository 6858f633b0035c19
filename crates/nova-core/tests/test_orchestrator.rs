mod common;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use nova_core::artifact::DataKind;
use nova_core::error::NovaError;
use nova_core::pipeline::config::{
    CoadditionConfig, CountPixelsParams, ExtractionConfig, MonitoringConfig, PipelineConfig,
    StageName, SubimageConfig, TargetConfig,
};
use nova_core::pipeline::run_pipeline;
use nova_core::qa::classify::{ReferenceMode, Severity};
use nova_core::qa::report::JsonReportSink;
use tempfile::tempdir;

use common::{path, write_gray_png, RecordingRunner};

fn base_config(outdir: &Path, stages: Vec<StageName>) -> PipelineConfig {
    PipelineConfig {
        program: "supernova".to_string(),
        night: Some("200601".to_string()),
        outdir: outdir.to_path_buf(),
        stages,
        target: None,
        reference_metrics: None,
        discovery: None,
        coaddition: Some(CoadditionConfig {
            tool: "coadd_all".to_string(),
            tool_args: vec![],
            coadd_suffix: "000-000_c".to_string(),
        }),
        extraction: Some(ExtractionConfig {
            tool: "sex".to_string(),
            params_file: None,
            filter_file: None,
            aperture: 7,
            satur_level: 50000.0,
        }),
        subimages: None,
        differencing: None,
        refstars: None,
        photometry: None,
        monitoring: Some(MonitoringConfig {
            count_pixels: Some(CountPixelsParams {
                count_ref: None,
                count_warn_range: [0.6, 0.9],
                count_normal_range: [0.4, 0.6],
                reference_mode: ReferenceMode::Difference,
            }),
        }),
    }
}

fn seed_preproc(outdir: &Path) {
    for name in ["200601_sksA_3b_01_c.png", "200610_sksA_3b_01_c.png"] {
        write_gray_png(&path(outdir, &["preproc", "image", name]), 16, 16, 128);
    }
    for name in ["200601_sksA_3b_01_cobj.png", "200610_sksA_3b_01_cobj.png"] {
        write_gray_png(&path(outdir, &["preproc", "prod", name]), 8, 8, 100);
    }
}

/// Fake tool effects: coaddition drops a flat coadd into its working
/// directory, extraction fabricates a catalog file.
fn fabricating_runner(outdir: &Path, coadd_level: u8) -> RecordingRunner {
    let preproc_coadd = path(outdir, &["preproc", "200608_sksA_000-000_c.png"]);
    let catalog: PathBuf = path(outdir, &["coadd", "prod", "200608_sksA_000-000_sobj.fit"]);
    RecordingRunner::new(move |stage, _, _| {
        match stage {
            "coaddition" => write_gray_png(&preproc_coadd, 16, 16, coadd_level),
            "source-extraction" => fs::write(&catalog, "stub catalog")?,
            _ => {}
        }
        Ok(())
    })
}

#[test]
fn test_end_to_end_run_produces_one_normal_report() {
    let dir = tempdir().unwrap();
    seed_preproc(dir.path());
    let config = base_config(
        dir.path(),
        vec![
            StageName::Coaddition,
            StageName::SourceExtraction,
            StageName::CountPixels,
        ],
    );
    let runner = Arc::new(fabricating_runner(dir.path(), 128));
    let sink = Arc::new(JsonReportSink::new(dir.path().join("qa")));

    let outcome = run_pipeline(&config, runner.clone(), sink).unwrap();

    assert_eq!(outcome.reports.len(), 1);
    assert_eq!(outcome.status, Severity::Normal);
    assert_eq!(outcome.artifact.kind, DataKind::CoaddedSet);
    assert_eq!(outcome.artifact.images.len(), 1);
    // One coaddition run, one extractor run per coadd; monitoring spawns
    // no tool.
    assert_eq!(runner.call_count(), 2);
    assert!(path(dir.path(), &["qa", "count-pixels.json"]).is_file());
    assert!(path(dir.path(), &["coadd", "image", "200608_sksA_000-000_c.png"]).is_file());
}

#[test]
fn test_worst_of_severity_is_surfaced() {
    let dir = tempdir().unwrap();
    seed_preproc(dir.path());
    let config = base_config(
        dir.path(),
        vec![StageName::Coaddition, StageName::CountPixels],
    );
    // level 180 -> mean ~0.706, inside the warn band.
    let runner = Arc::new(fabricating_runner(dir.path(), 180));
    let sink = Arc::new(JsonReportSink::new(dir.path().join("qa")));

    let outcome = run_pipeline(&config, runner, sink).unwrap();
    assert_eq!(outcome.status, Severity::Warning);
}

#[test]
fn test_tool_failure_aborts_the_run() {
    let dir = tempdir().unwrap();
    seed_preproc(dir.path());
    let config = base_config(
        dir.path(),
        vec![StageName::Coaddition, StageName::CountPixels],
    );
    let runner = Arc::new(RecordingRunner::new(|stage, tool, _| {
        Err(NovaError::ToolFailure {
            stage: stage.to_string(),
            tool: tool.executable.clone(),
            status: "exit status: 1".to_string(),
        })
    }));
    let sink = Arc::new(JsonReportSink::new(dir.path().join("qa")));

    let err = run_pipeline(&config, runner.clone(), sink).unwrap_err();
    assert!(matches!(err, NovaError::ToolFailure { .. }), "got {err:?}");
    assert_eq!(runner.call_count(), 1);
    assert!(
        !path(dir.path(), &["qa", "count-pixels.json"]).exists(),
        "monitoring must not run after an aborted stage"
    );
}

#[test]
fn test_kind_mismatch_aborts_before_the_stage_runs() {
    let dir = tempdir().unwrap();
    seed_preproc(dir.path());
    let mut config = base_config(dir.path(), vec![StageName::MakeSubimages]);
    config.subimages = Some(SubimageConfig {
        tool: "make_subimage".to_string(),
        pixel_radius: 100,
    });
    config.target = Some(TargetConfig { ra: 41.5, dec: 36.9 });
    let runner = Arc::new(RecordingRunner::noop());
    let sink = Arc::new(JsonReportSink::new(dir.path().join("qa")));

    let err = run_pipeline(&config, runner.clone(), sink).unwrap_err();
    match err {
        NovaError::IncompatibleInput { expected, actual, .. } => {
            assert_eq!(expected, DataKind::CoaddedSet);
            assert_eq!(actual, DataKind::ImageCollection);
        }
        other => panic!("expected IncompatibleInput, got {other:?}"),
    }
    assert_eq!(runner.call_count(), 0);
}

#[test]
fn test_validation_failure_precedes_execution() {
    let dir = tempdir().unwrap();
    seed_preproc(dir.path());
    let mut config = base_config(dir.path(), vec![StageName::Coaddition]);
    config.coaddition = None;
    let runner = Arc::new(RecordingRunner::noop());
    let sink = Arc::new(JsonReportSink::new(dir.path().join("qa")));

    let err = run_pipeline(&config, runner.clone(), sink).unwrap_err();
    assert!(matches!(err, NovaError::MissingParameter { .. }), "got {err:?}");
    assert_eq!(runner.call_count(), 0);
}
