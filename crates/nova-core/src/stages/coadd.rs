use std::fs;
use std::sync::Arc;

use tracing::info;

use crate::artifact::{file_name, file_stem, list_files_sorted, Artifact, DataKind};
use crate::context::RunContext;
use crate::error::{NovaError, Result};
use crate::pipeline::config::CoadditionConfig;
use crate::stage::{Algorithm, ProcessingStage};
use crate::tools::{Tool, ToolRunner};

/// Coadds the preprocessed images night by night via the configured
/// external tool, then collects the nightly coadds into `coadd/image`.
pub struct Coaddition {
    config: CoadditionConfig,
    tools: Arc<dyn ToolRunner>,
}

impl Coaddition {
    pub fn new(config: CoadditionConfig, tools: Arc<dyn ToolRunner>) -> Self {
        Self { config, tools }
    }
}

impl Algorithm for Coaddition {
    fn name(&self) -> &'static str {
        "coaddition"
    }

    fn input_kind(&self) -> DataKind {
        DataKind::ImageCollection
    }

    fn output_kind(&self) -> DataKind {
        DataKind::CoaddedSet
    }
}

impl ProcessingStage for Coaddition {
    fn execute(&self, input: &Artifact, ctx: &RunContext) -> Result<Artifact> {
        if !self.accepts(input.kind) {
            return Err(self.incompatible(input.kind));
        }
        if input.images.is_empty() {
            return Err(NovaError::Pipeline(
                "coaddition: no preprocessed images to coadd".to_string(),
            ));
        }

        let preproc_dir = ctx.outdir.join("preproc");
        let tool = Tool::new(&self.config.tool)
            .args(self.config.tool_args.clone())
            .arg(preproc_dir.join("image").display().to_string());
        self.tools.run(self.name(), &tool, &preproc_dir)?;

        // The tool drops its coadds into the working directory; move them
        // into the conventional layout.
        let coadd_dir = ctx.outdir.join("coadd");
        fs::create_dir_all(coadd_dir.join("image"))?;
        fs::create_dir_all(coadd_dir.join("prod"))?;

        let mut moved = 0usize;
        for path in list_files_sorted(&preproc_dir)? {
            if file_stem(&path).ends_with(&self.config.coadd_suffix) {
                fs::rename(&path, coadd_dir.join("image").join(file_name(&path)))?;
                moved += 1;
            }
        }
        if moved == 0 {
            return Err(NovaError::MissingOutput {
                stage: self.name().to_string(),
                path: coadd_dir.join("image"),
            });
        }
        info!(coadds = moved, "collected nightly coadds");

        Artifact::discover(DataKind::CoaddedSet, &coadd_dir)
    }
}
