mod common;

use std::collections::BTreeMap;
use std::fs;
use std::sync::Arc;

use approx::assert_abs_diff_eq;
use nova_core::artifact::{Artifact, DataKind};
use nova_core::error::NovaError;
use nova_core::pipeline::config::{
    CoadditionConfig, CountPixelsParams, PhotometryConfig, RefstarsConfig, TargetConfig,
};
use nova_core::qa::classify::{ReferenceMode, Severity};
use nova_core::qa::count_pixels::CountPixels;
use nova_core::stage::{MonitoringStage, ProcessingStage};
use nova_core::stages::{ChooseRefstars, Coaddition, Photometry};
use tempfile::tempdir;

use common::{level_mean, path, run_context, write_gray_png, RecordingRunner};

fn count_params() -> CountPixelsParams {
    CountPixelsParams {
        count_ref: None,
        count_warn_range: [0.6, 0.9],
        count_normal_range: [0.4, 0.6],
        reference_mode: ReferenceMode::Difference,
    }
}

fn coadded_artifact(outdir: &std::path::Path, levels: &[u8]) -> Artifact {
    let mut artifact = Artifact::empty(DataKind::CoaddedSet);
    for (i, &level) in levels.iter().enumerate() {
        let image = path(outdir, &["coadd", "image", &format!("20060{i}_c.png")]);
        write_gray_png(&image, 16, 16, level);
        artifact.images.push(image);
    }
    artifact
}

// ---------------------------------------------------------------------------
// CountPixels
// ---------------------------------------------------------------------------

#[test]
fn test_count_pixels_without_params_is_fatal_and_writes_no_report() {
    let dir = tempdir().unwrap();
    let ctx = run_context(dir.path());
    let stage = CountPixels::new(None);
    let artifact = coadded_artifact(dir.path(), &[128]);

    let err = stage.execute(&artifact, &ctx).unwrap_err();
    match err {
        NovaError::MissingParameter { stage, key } => {
            assert_eq!(stage, "count-pixels");
            assert_eq!(key, "monitoring.count_pixels");
        }
        other => panic!("expected MissingParameter, got {other:?}"),
    }
    assert!(
        !path(dir.path(), &["qa", "count-pixels.json"]).exists(),
        "no report may be written when the parameter block is missing"
    );
}

#[test]
fn test_count_pixels_classifies_normal_and_persists_report() {
    let dir = tempdir().unwrap();
    let ctx = run_context(dir.path());
    let stage = CountPixels::new(Some(count_params()));
    let artifact = coadded_artifact(dir.path(), &[128, 128]);

    let report = stage.execute(&artifact, &ctx).unwrap();
    assert_eq!(report.status, Severity::Normal);
    assert_eq!(report.program, "supernova");
    assert_eq!(report.stage, "count-pixels");

    let count: f64 = report.metrics["COUNT"].parse().unwrap();
    assert_abs_diff_eq!(count, level_mean(128), epsilon = 1e-6);
    assert!(report.metrics.contains_key("COUNT_PER_IMAGE"));

    assert!(path(dir.path(), &["qa", "count-pixels.json"]).is_file());
    assert!(path(dir.path(), &["qa", "count-pixels.png"]).is_file());
}

#[test]
fn test_count_pixels_bright_images_warn() {
    let dir = tempdir().unwrap();
    let ctx = run_context(dir.path());
    let stage = CountPixels::new(Some(count_params()));
    // level 180 -> mean ~0.706, inside the warn band.
    let artifact = coadded_artifact(dir.path(), &[180, 180]);

    let report = stage.execute(&artifact, &ctx).unwrap();
    assert_eq!(report.status, Severity::Warning);
}

#[test]
fn test_count_pixels_prefers_reference_metrics_from_prior_run() {
    let dir = tempdir().unwrap();
    let mut ctx = run_context(dir.path());
    let params = CountPixelsParams {
        count_ref: Some(0.5),
        count_warn_range: [0.05, 0.2],
        count_normal_range: [-0.05, 0.05],
        reference_mode: ReferenceMode::Difference,
    };
    let stage = CountPixels::new(Some(params));
    let artifact = coadded_artifact(dir.path(), &[128]);

    // Against the configured reference (0.5) the difference is ~0.002 and
    // would classify Normal; the prior run's value must win instead.
    let mut reference = BTreeMap::new();
    reference.insert("COUNT".to_string(), 0.4);
    ctx.reference_metrics = Some(reference);

    let report = stage.execute(&artifact, &ctx).unwrap();
    assert_eq!(report.status, Severity::Warning);
}

#[test]
fn test_count_pixels_rejects_wrong_kind() {
    let dir = tempdir().unwrap();
    let ctx = run_context(dir.path());
    let stage = CountPixels::new(Some(count_params()));
    let artifact = Artifact::empty(DataKind::SubimageSet);

    let err = stage.execute(&artifact, &ctx).unwrap_err();
    assert!(matches!(err, NovaError::IncompatibleInput { .. }), "got {err:?}");
}

// ---------------------------------------------------------------------------
// Processing stage input gate
// ---------------------------------------------------------------------------

#[test]
fn test_wrong_kind_input_is_rejected_before_any_side_effect() {
    let dir = tempdir().unwrap();
    let ctx = run_context(dir.path());
    let runner = Arc::new(RecordingRunner::noop());
    let stage = Coaddition::new(
        CoadditionConfig {
            tool: "coadd_all".to_string(),
            tool_args: vec![],
            coadd_suffix: "000-000_c".to_string(),
        },
        runner.clone(),
    );

    let artifact = Artifact::empty(DataKind::SubimageSet);
    let err = stage.execute(&artifact, &ctx).unwrap_err();
    match err {
        NovaError::IncompatibleInput { expected, actual, .. } => {
            assert_eq!(expected, DataKind::ImageCollection);
            assert_eq!(actual, DataKind::SubimageSet);
        }
        other => panic!("expected IncompatibleInput, got {other:?}"),
    }
    assert_eq!(runner.call_count(), 0, "no tool may run on bad input");
    assert!(!dir.path().join("coadd").exists());
}

// ---------------------------------------------------------------------------
// ChooseRefstars
// ---------------------------------------------------------------------------

#[test]
fn test_refstars_passes_the_selected_template_to_the_tool() {
    let dir = tempdir().unwrap();
    let ctx = run_context(dir.path());
    let runner = Arc::new(RecordingRunner::noop());
    let stage = ChooseRefstars::new(
        RefstarsConfig {
            tool: "rphot".to_string(),
            tool_args: vec![],
        },
        TargetConfig { ra: 41.5, dec: 36.9 },
        runner.clone(),
    );

    let mut artifact = Artifact::empty(DataKind::SubimageSet);
    for name in ["200615_sksA_c.png", "200601_sksA_c.png", "200601_sksA_sub.png"] {
        let image = path(dir.path(), &["sub", "image", name]);
        write_gray_png(&image, 8, 8, 100);
        artifact.images.push(image);
    }

    let output = stage.execute(&artifact, &ctx).unwrap();
    assert_eq!(output.kind, DataKind::SubimageSet);

    let calls = runner.calls();
    assert_eq!(calls.len(), 1);
    let args = &calls[0].1;
    // Difference images are not template candidates; the earliest cutout is.
    assert!(
        args.contains(&"imlist=image/200601_sksA_c.png".to_string()),
        "got args {args:?}"
    );
    assert!(args.iter().any(|a| a.starts_with("targetra=41.5")));
}

// ---------------------------------------------------------------------------
// Photometry
// ---------------------------------------------------------------------------

const LC_CONTENT: &str = "# mjd mag mag_err\n51234.5 18.2 0.10\n51240.5 18.5 0.12\n";

fn photometry_input(outdir: &std::path::Path, names: &[&str]) -> Artifact {
    let mut artifact = Artifact::empty(DataKind::SubimageSet);
    for name in names {
        let image = path(outdir, &["sub", "image", name]);
        write_gray_png(&image, 8, 8, 90);
        artifact.images.push(image);
    }
    artifact
}

#[test]
fn test_photometry_builds_the_light_curve() {
    let dir = tempdir().unwrap();
    let ctx = run_context(dir.path());
    let lc_path = path(dir.path(), &["sub", "lc.dat"]);

    let lc = lc_path.clone();
    let runner = Arc::new(RecordingRunner::new(move |_, _, _| {
        fs::write(&lc, LC_CONTENT)?;
        Ok(())
    }));
    let stage = Photometry::new(
        PhotometryConfig {
            tool: "run_phot".to_string(),
            lightcurve_file: "lc.dat".to_string(),
        },
        runner.clone(),
    );

    let artifact = photometry_input(
        dir.path(),
        &["200601_sksA_sub.png", "200610_sksA_sub.png"],
    );
    let output = stage.execute(&artifact, &ctx).unwrap();

    assert_eq!(output.kind, DataKind::LightCurve);
    assert_eq!(output.images.len(), 2);
    // One probe per night plus the combined run.
    assert_eq!(runner.call_count(), 3);

    let curve = path(dir.path(), &["lightcurve.json"]);
    assert!(curve.is_file());
    let points: Vec<serde_json::Value> =
        serde_json::from_str(&fs::read_to_string(&curve).unwrap()).unwrap();
    assert_eq!(points.len(), 2);
    assert!(path(dir.path(), &["qa", "lightcurve.png"]).is_file());
    assert!(!path(dir.path(), &["sub", "nophot"]).exists());
}

#[test]
fn test_photometry_quarantines_nights_without_measurements() {
    let dir = tempdir().unwrap();
    let ctx = run_context(dir.path());
    let lc_path = path(dir.path(), &["sub", "lc.dat"]);

    // The tool produces nothing for the first night.
    let lc = lc_path.clone();
    let runner = Arc::new(RecordingRunner::new(move |_, tool, _| {
        if !tool.args.iter().any(|a| a.contains("200601")) {
            fs::write(&lc, LC_CONTENT)?;
        }
        Ok(())
    }));
    let stage = Photometry::new(
        PhotometryConfig {
            tool: "run_phot".to_string(),
            lightcurve_file: "lc.dat".to_string(),
        },
        runner,
    );

    let artifact = photometry_input(
        dir.path(),
        &["200601_sksA_sub.png", "200610_sksA_sub.png"],
    );
    let output = stage.execute(&artifact, &ctx).unwrap();

    assert_eq!(output.images.len(), 1);
    assert!(path(dir.path(), &["sub", "nophot", "200601_sksA_sub.png"]).is_file());
    assert!(!path(dir.path(), &["sub", "image", "200601_sksA_sub.png"]).exists());
}
