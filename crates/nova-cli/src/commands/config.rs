use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use nova_core::pipeline::config::{
    CoadditionConfig, CountPixelsParams, DifferencingConfig, DiscoveryConfig, ExtractionConfig,
    MonitoringConfig, PhotometryConfig, PipelineConfig, RefstarsConfig, StageName, SubimageConfig,
    TargetConfig,
};
use nova_core::qa::classify::ReferenceMode;

#[derive(Args)]
pub struct ConfigArgs {
    /// Write config to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Print or save a full default PipelineConfig as TOML.
pub fn run(args: &ConfigArgs) -> Result<()> {
    let config = PipelineConfig {
        program: "supernova".to_string(),
        night: Some("200601".to_string()),
        outdir: PathBuf::from("run"),
        stages: vec![
            StageName::FindData,
            StageName::Coaddition,
            StageName::SourceExtraction,
            StageName::CountPixels,
            StageName::MakeSubimages,
            StageName::ImageDifferencing,
            StageName::ChooseRefstars,
            StageName::Photometry,
        ],
        target: Some(TargetConfig { ra: 41.5, dec: 36.9 }),
        reference_metrics: None,
        discovery: Some(DiscoveryConfig {
            datadir: PathBuf::from("/data/preproc"),
            telescope: Some("3b".to_string()),
            field: None,
            days_before: 30,
            days_after: 60,
        }),
        coaddition: Some(CoadditionConfig {
            tool: "coadd_all".to_string(),
            tool_args: vec![],
            coadd_suffix: "000-000_c".to_string(),
        }),
        extraction: Some(ExtractionConfig {
            tool: "sex".to_string(),
            params_file: None,
            filter_file: None,
            aperture: 7,
            satur_level: 50000.0,
        }),
        subimages: Some(SubimageConfig {
            tool: "make_subimage".to_string(),
            pixel_radius: 100,
        }),
        differencing: Some(DifferencingConfig {
            tool: "difference_all".to_string(),
            tool_args: vec![],
        }),
        refstars: Some(RefstarsConfig {
            tool: "rphot".to_string(),
            tool_args: vec![],
        }),
        photometry: Some(PhotometryConfig {
            tool: "run_phot".to_string(),
            lightcurve_file: "lightcurve_subtract_target_psf.dat".to_string(),
        }),
        monitoring: Some(MonitoringConfig {
            count_pixels: Some(CountPixelsParams {
                count_ref: Some(0.5),
                count_warn_range: [-0.3, -0.1],
                count_normal_range: [-0.1, 0.1],
                reference_mode: ReferenceMode::Difference,
            }),
        }),
    };
    let toml_str = toml::to_string_pretty(&config)?;

    if let Some(ref path) = args.output {
        std::fs::write(path, &toml_str)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        println!("Default config saved to {}", path.display());
    } else {
        print!("{}", toml_str);
    }

    Ok(())
}
