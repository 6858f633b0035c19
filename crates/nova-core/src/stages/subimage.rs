use std::fs;
use std::sync::Arc;

use tracing::info;

use crate::artifact::{file_name, file_stem, list_files_sorted, Artifact, DataKind};
use crate::context::RunContext;
use crate::error::{NovaError, Result};
use crate::pipeline::config::{SubimageConfig, TargetConfig};
use crate::stage::{Algorithm, ProcessingStage};
use crate::tools::{Tool, ToolRunner};

/// Cuts target-centered subimages out of each coadd and sorts the tool's
/// outputs into `sub/{image,prod}`.
pub struct MakeSubimages {
    config: SubimageConfig,
    target: TargetConfig,
    tools: Arc<dyn ToolRunner>,
}

impl MakeSubimages {
    pub fn new(config: SubimageConfig, target: TargetConfig, tools: Arc<dyn ToolRunner>) -> Self {
        Self {
            config,
            target,
            tools,
        }
    }
}

impl Algorithm for MakeSubimages {
    fn name(&self) -> &'static str {
        "make-subimages"
    }

    fn input_kind(&self) -> DataKind {
        DataKind::CoaddedSet
    }

    fn output_kind(&self) -> DataKind {
        DataKind::SubimageSet
    }
}

impl ProcessingStage for MakeSubimages {
    fn execute(&self, input: &Artifact, ctx: &RunContext) -> Result<Artifact> {
        if !self.accepts(input.kind) {
            return Err(self.incompatible(input.kind));
        }
        if input.images.is_empty() {
            return Err(NovaError::Pipeline(
                "make-subimages: no coadds to cut".to_string(),
            ));
        }

        let coadd_dir = ctx.outdir.join("coadd");
        let tool = Tool::new(&self.config.tool)
            .args(input.images.iter().map(|p| p.display().to_string()))
            .arg(format!("racent={}", self.target.ra))
            .arg(format!("deccent={}", self.target.dec))
            .arg(format!("pixrad={}", self.config.pixel_radius));
        self.tools.run(self.name(), &tool, &coadd_dir)?;

        let sub_dir = ctx.outdir.join("sub");
        fs::create_dir_all(sub_dir.join("image"))?;
        fs::create_dir_all(sub_dir.join("prod"))?;

        // The tool writes cutouts next to its inputs; image cutouts keep
        // the `_c` stem suffix, their object lists the `_cobj` suffix.
        let mut moved = 0usize;
        for path in list_files_sorted(&coadd_dir)? {
            let stem = file_stem(&path);
            let subdir = if stem.ends_with("_cobj") {
                "prod"
            } else if stem.ends_with("_c") {
                "image"
            } else {
                continue;
            };
            fs::rename(&path, sub_dir.join(subdir).join(file_name(&path)))?;
            moved += 1;
        }
        if moved == 0 {
            return Err(NovaError::MissingOutput {
                stage: self.name().to_string(),
                path: sub_dir.join("image"),
            });
        }
        info!(subimages = moved, "cut target subimages");

        Artifact::discover(DataKind::SubimageSet, &sub_dir)
    }
}
