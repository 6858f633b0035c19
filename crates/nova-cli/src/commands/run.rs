use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use nova_core::pipeline::config::PipelineConfig;
use nova_core::pipeline::{run_pipeline_reported, ProgressReporter};
use nova_core::qa::classify::Severity;
use nova_core::qa::report::JsonReportSink;
use nova_core::tools::ProcessRunner;

use crate::summary;

#[derive(Args)]
pub struct RunArgs {
    /// Pipeline config file (TOML)
    pub config: PathBuf,

    /// Validate the config and print the run summary without executing
    #[arg(long)]
    pub dry_run: bool,
}

struct BarReporter {
    bar: ProgressBar,
}

impl ProgressReporter for BarReporter {
    fn begin_stage(&self, name: &str) {
        self.bar.set_message(name.to_string());
    }

    fn finish_stage(&self, _name: &str) {
        self.bar.inc(1);
    }
}

pub fn run(args: &RunArgs) -> Result<()> {
    let contents = std::fs::read_to_string(&args.config)
        .with_context(|| format!("Failed to read config {}", args.config.display()))?;
    let config: PipelineConfig = toml::from_str(&contents).context("Invalid pipeline config")?;
    config.validate()?;

    summary::print_run_summary(&config);

    if args.dry_run {
        println!("Configuration OK ({} stages)", config.stages.len());
        return Ok(());
    }

    let bar = ProgressBar::new(config.stages.len() as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{msg:20} [{bar:40}] {pos}/{len}")?
            .progress_chars("=> "),
    );

    let sink = Arc::new(JsonReportSink::new(config.outdir.join("qa")));
    let outcome = run_pipeline_reported(
        &config,
        Arc::new(ProcessRunner),
        sink,
        Arc::new(BarReporter { bar: bar.clone() }),
    )?;
    bar.finish_with_message("Done");

    println!();
    for report in &outcome.reports {
        println!("  {:<20} {}", report.stage, report.status);
    }
    println!("\nRun status: {}", outcome.status);

    if outcome.status == Severity::Alert {
        bail!("run completed with ALERT status");
    }
    Ok(())
}
