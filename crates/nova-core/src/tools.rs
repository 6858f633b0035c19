use std::path::Path;
use std::process::Command;

use tracing::info;

use crate::error::{NovaError, Result};

/// One external tool invocation: an executable plus its arguments, run
/// from a working directory the stage owns.
#[derive(Clone, Debug)]
pub struct Tool {
    pub executable: String,
    pub args: Vec<String>,
}

impl Tool {
    pub fn new(executable: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

/// Seam between stages and the external processes they delegate to.
/// Tests substitute a fake that fabricates the expected output files.
pub trait ToolRunner: Send + Sync {
    /// Run the tool to completion in `workdir`. Blocks until the process
    /// exits; a non-zero exit is a stage failure.
    fn run(&self, stage: &str, tool: &Tool, workdir: &Path) -> Result<()>;
}

/// Blocking runner backed by `std::process::Command`.
pub struct ProcessRunner;

impl ToolRunner for ProcessRunner {
    fn run(&self, stage: &str, tool: &Tool, workdir: &Path) -> Result<()> {
        info!(
            stage,
            tool = %tool.executable,
            workdir = %workdir.display(),
            "running external tool"
        );
        let status = Command::new(&tool.executable)
            .args(&tool.args)
            .current_dir(workdir)
            .status()?;
        if !status.success() {
            return Err(NovaError::ToolFailure {
                stage: stage.to_string(),
                tool: tool.executable.clone(),
                status: status.to_string(),
            });
        }
        Ok(())
    }
}
