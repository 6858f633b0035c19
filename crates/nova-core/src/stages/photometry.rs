use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use crate::artifact::{file_name, Artifact, DataKind};
use crate::context::RunContext;
use crate::error::{NovaError, Result};
use crate::io::lightcurve::{read_light_curve, write_light_curve};
use crate::pipeline::config::PhotometryConfig;
use crate::qa::plots;
use crate::stage::{Algorithm, ProcessingStage};
use crate::tools::{Tool, ToolRunner};

/// Runs PSF photometry over the difference images night by night,
/// quarantines nights the tool cannot measure, and assembles the target's
/// light curve.
pub struct Photometry {
    config: PhotometryConfig,
    tools: Arc<dyn ToolRunner>,
}

impl Photometry {
    pub fn new(config: PhotometryConfig, tools: Arc<dyn ToolRunner>) -> Self {
        Self { config, tools }
    }
}

impl Algorithm for Photometry {
    fn name(&self) -> &'static str {
        "photometry"
    }

    fn input_kind(&self) -> DataKind {
        DataKind::SubimageSet
    }

    fn output_kind(&self) -> DataKind {
        DataKind::LightCurve
    }
}

impl ProcessingStage for Photometry {
    fn execute(&self, input: &Artifact, ctx: &RunContext) -> Result<Artifact> {
        if !self.accepts(input.kind) {
            return Err(self.incompatible(input.kind));
        }
        let sub_dir = ctx.outdir.join("sub");
        let lc_file = sub_dir.join(&self.config.lightcurve_file);

        let differences: Vec<PathBuf> = input
            .images
            .iter()
            .filter(|p| file_name(p).contains("sub"))
            .cloned()
            .collect();
        if differences.is_empty() {
            return Err(NovaError::Pipeline(
                "photometry: no difference images to measure".to_string(),
            ));
        }

        // Probe each night separately; a night that yields no light-curve
        // file is quarantined so it cannot poison the combined run.
        let nights: BTreeSet<String> = differences
            .iter()
            .map(|p| file_name(p).chars().take(6).collect())
            .collect();
        let nophot_dir = sub_dir.join("nophot");
        fs::create_dir_all(&nophot_dir)?;
        let mut surviving: Vec<PathBuf> = Vec::new();

        for night in &nights {
            let tool = Tool::new(&self.config.tool).arg(format!("image/{night}*sub*"));
            self.tools.run(self.name(), &tool, &sub_dir)?;

            let night_images: Vec<&PathBuf> = differences
                .iter()
                .filter(|p| file_name(p).starts_with(night.as_str()))
                .collect();
            if lc_file.is_file() {
                fs::remove_file(&lc_file)?;
                surviving.extend(night_images.into_iter().cloned());
            } else {
                warn!(night = %night, "no photometry for night, quarantining");
                for image in night_images {
                    fs::rename(image, nophot_dir.join(file_name(image)))?;
                }
            }
        }
        if fs::read_dir(&nophot_dir)?.next().is_none() {
            fs::remove_dir(&nophot_dir)?;
        }
        if surviving.is_empty() {
            return Err(NovaError::MissingOutput {
                stage: self.name().to_string(),
                path: lc_file,
            });
        }

        // Combined run over every night that passed the probe.
        let tool = Tool::new(&self.config.tool).arg("image/*sub*");
        self.tools.run(self.name(), &tool, &sub_dir)?;
        if !lc_file.is_file() {
            return Err(NovaError::MissingOutput {
                stage: self.name().to_string(),
                path: lc_file,
            });
        }
        info!(nights = nights.len(), images = surviving.len(), "ran photometry");

        let points = read_light_curve(&lc_file)?;
        let curve_path = ctx.outdir.join("lightcurve.json");
        write_light_curve(&points, &curve_path)?;
        plots::plot_light_curve(&points, &ctx.outdir.join("qa").join("lightcurve.png"))?;

        Ok(Artifact {
            kind: DataKind::LightCurve,
            images: surviving,
            prods: vec![curve_path],
        })
    }
}
