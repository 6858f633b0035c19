use anyhow::{bail, Result};
use clap::{Args, ValueEnum};
use nova_core::qa::classify::{classify, BandSet, ReferenceMode, Severity, ToleranceBand};

#[derive(Clone, ValueEnum)]
pub enum ModeArg {
    Difference,
    Ratio,
}

#[derive(Args)]
pub struct ClassifyArgs {
    /// Metric values (comma-separated; collections reduce via median)
    #[arg(long, value_delimiter = ',', required = true)]
    pub values: Vec<f64>,

    /// Reference value; omit to classify absolutely
    #[arg(long)]
    pub reference: Option<f64>,

    /// Reference-relative operator
    #[arg(long, value_enum, default_value = "difference")]
    pub mode: ModeArg,

    /// Warning band as lo,hi (checked first)
    #[arg(long, value_delimiter = ',', num_args = 2)]
    pub warn: Option<Vec<f64>>,

    /// Normal band as lo,hi
    #[arg(long, value_delimiter = ',', num_args = 2)]
    pub normal: Option<Vec<f64>>,
}

pub fn run(args: &ClassifyArgs) -> Result<()> {
    if args.warn.is_none() && args.normal.is_none() {
        bail!("provide at least one of --warn / --normal");
    }

    let mode = match args.mode {
        ModeArg::Difference => ReferenceMode::Difference,
        ModeArg::Ratio => ReferenceMode::Ratio,
    };

    let mut bands = Vec::new();
    if let Some(ref warn) = args.warn {
        bands.push(ToleranceBand::new(warn[0], warn[1], Severity::Warning));
    }
    if let Some(ref normal) = args.normal {
        bands.push(ToleranceBand::new(normal[0], normal[1], Severity::Normal));
    }

    let status = classify(&args.values, args.reference, mode, &BandSet::new(bands));
    println!("{status}");
    Ok(())
}
