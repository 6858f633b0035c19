use std::sync::Arc;

use tracing::info;

use crate::artifact::{file_name, file_stem, Artifact, DataKind};
use crate::context::RunContext;
use crate::error::{NovaError, Result};
use crate::pipeline::config::{RefstarsConfig, TargetConfig};
use crate::stage::{Algorithm, ProcessingStage};
use crate::tools::{Tool, ToolRunner};

/// Picks the template subimage and opens the aperture-photometry tool on
/// it so reference stars can be chosen around the target.
pub struct ChooseRefstars {
    config: RefstarsConfig,
    target: TargetConfig,
    tools: Arc<dyn ToolRunner>,
}

impl ChooseRefstars {
    pub fn new(config: RefstarsConfig, target: TargetConfig, tools: Arc<dyn ToolRunner>) -> Self {
        Self {
            config,
            target,
            tools,
        }
    }
}

impl Algorithm for ChooseRefstars {
    fn name(&self) -> &'static str {
        "choose-refstars"
    }

    fn input_kind(&self) -> DataKind {
        DataKind::SubimageSet
    }

    fn output_kind(&self) -> DataKind {
        DataKind::SubimageSet
    }
}

impl ProcessingStage for ChooseRefstars {
    fn execute(&self, input: &Artifact, ctx: &RunContext) -> Result<Artifact> {
        if !self.accepts(input.kind) {
            return Err(self.incompatible(input.kind));
        }
        // Template candidates are the original cutouts, not the
        // difference images that may already sit beside them.
        let mut candidates: Vec<String> = input
            .images
            .iter()
            .filter(|p| file_stem(p).ends_with("_c"))
            .map(|p| file_name(p))
            .collect();
        candidates.sort();

        let template = select_template(&candidates).ok_or_else(|| {
            NovaError::Pipeline("choose-refstars: no subimages to pick a template from".to_string())
        })?;
        info!(template = %template, "selected template subimage");

        let sub_dir = ctx.outdir.join("sub");
        let tool = Tool::new(&self.config.tool)
            .args(self.config.tool_args.clone())
            .arg(format!("imlist=image/{template}"))
            .arg(format!("refname=image/{template}"))
            .arg(format!("targetra={}", self.target.ra))
            .arg(format!("targetdec={}", self.target.dec));
        self.tools.run(self.name(), &tool, &sub_dir)?;

        Ok(input.clone())
    }
}

/// Pick the template subimage from sorted image names.
///
/// Names begin with a two-digit program year and MMDD. The earliest image
/// wins unless it was taken on the final day of the year immediately
/// preceding the next image's year (a template from the prior observing
/// season), in which case the latest image wins.
pub fn select_template(names: &[String]) -> Option<&String> {
    let first = names.first()?;
    if names.len() == 1 {
        return Some(first);
    }
    let year = |name: &str| name.get(0..2).and_then(|s| s.parse::<u32>().ok());
    fn monthday(name: &str) -> Option<&str> {
        name.get(2..6)
    }

    if monthday(first) == Some("1231") {
        if let (Some(first_year), Some(next_year)) = (year(first), year(&names[1])) {
            if first_year + 1 == next_year {
                return names.last();
            }
        }
    }
    Some(first)
}
