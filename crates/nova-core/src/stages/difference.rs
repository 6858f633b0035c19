use std::sync::Arc;

use tracing::info;

use crate::artifact::{file_name, Artifact, DataKind};
use crate::context::RunContext;
use crate::error::{NovaError, Result};
use crate::pipeline::config::DifferencingConfig;
use crate::stage::{Algorithm, ProcessingStage};
use crate::tools::{Tool, ToolRunner};

/// Differences every subimage against the template, leaving `*sub*`
/// difference images beside the inputs in `sub/image`.
pub struct ImageDifferencing {
    config: DifferencingConfig,
    tools: Arc<dyn ToolRunner>,
}

impl ImageDifferencing {
    pub fn new(config: DifferencingConfig, tools: Arc<dyn ToolRunner>) -> Self {
        Self { config, tools }
    }
}

impl Algorithm for ImageDifferencing {
    fn name(&self) -> &'static str {
        "image-differencing"
    }

    fn input_kind(&self) -> DataKind {
        DataKind::SubimageSet
    }

    fn output_kind(&self) -> DataKind {
        DataKind::SubimageSet
    }
}

impl ProcessingStage for ImageDifferencing {
    fn execute(&self, input: &Artifact, ctx: &RunContext) -> Result<Artifact> {
        if !self.accepts(input.kind) {
            return Err(self.incompatible(input.kind));
        }
        let sub_dir = ctx.outdir.join("sub");
        let tool = Tool::new(&self.config.tool)
            .args(self.config.tool_args.clone())
            .arg("-i")
            .arg(sub_dir.join("image").display().to_string());
        self.tools.run(self.name(), &tool, &sub_dir)?;

        let artifact = Artifact::discover(DataKind::SubimageSet, &sub_dir)?;
        let differences = artifact
            .images
            .iter()
            .filter(|p| file_name(p).contains("sub"))
            .count();
        if differences == 0 {
            return Err(NovaError::MissingOutput {
                stage: self.name().to_string(),
                path: sub_dir.join("image"),
            });
        }
        info!(differences, "differenced subimages");
        Ok(artifact)
    }
}
