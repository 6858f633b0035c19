use std::sync::Arc;

use tracing::info;

use crate::artifact::{file_stem, Artifact, DataKind};
use crate::context::RunContext;
use crate::error::{NovaError, Result};
use crate::pipeline::config::ExtractionConfig;
use crate::stage::{Algorithm, ProcessingStage};
use crate::tools::{Tool, ToolRunner};

/// Runs the source extractor over each nightly coadd, producing a source
/// catalog and a sky check-image per coadd under `coadd/prod`.
pub struct SourceExtraction {
    config: ExtractionConfig,
    tools: Arc<dyn ToolRunner>,
}

impl SourceExtraction {
    pub fn new(config: ExtractionConfig, tools: Arc<dyn ToolRunner>) -> Self {
        Self { config, tools }
    }
}

impl Algorithm for SourceExtraction {
    fn name(&self) -> &'static str {
        "source-extraction"
    }

    fn input_kind(&self) -> DataKind {
        DataKind::CoaddedSet
    }

    fn output_kind(&self) -> DataKind {
        DataKind::CoaddedSet
    }
}

impl ProcessingStage for SourceExtraction {
    fn execute(&self, input: &Artifact, ctx: &RunContext) -> Result<Artifact> {
        if !self.accepts(input.kind) {
            return Err(self.incompatible(input.kind));
        }
        let coadd_dir = ctx.outdir.join("coadd");
        let prod_dir = coadd_dir.join("prod");

        for coadd in &input.images {
            let stem = file_stem(coadd);
            let root = stem.strip_suffix("_c").unwrap_or(&stem);
            let catalog = prod_dir.join(format!("{root}_sobj.fit"));
            let sky = prod_dir.join(format!("{root}_sky.fit"));

            let mut tool = Tool::new(&self.config.tool)
                .arg(coadd.display().to_string())
                .arg("-PHOT_APERTURES")
                .arg(self.config.aperture.to_string())
                .arg("-SATUR_LEVEL")
                .arg(self.config.satur_level.to_string())
                .arg("-CATALOG_NAME")
                .arg(catalog.display().to_string())
                .arg("-CHECKIMAGE_NAME")
                .arg(sky.display().to_string());
            if let Some(ref params) = self.config.params_file {
                tool = tool.arg("-c").arg(params.display().to_string());
            }
            if let Some(ref filter) = self.config.filter_file {
                tool = tool.arg("-FILTER_NAME").arg(filter.display().to_string());
            }
            self.tools.run(self.name(), &tool, &coadd_dir)?;
        }

        let artifact = Artifact::discover(DataKind::CoaddedSet, &coadd_dir)?;
        if artifact.prods.is_empty() {
            return Err(NovaError::MissingOutput {
                stage: self.name().to_string(),
                path: prod_dir,
            });
        }
        info!(catalogs = artifact.prods.len(), "extracted source catalogs");
        Ok(artifact)
    }
}
