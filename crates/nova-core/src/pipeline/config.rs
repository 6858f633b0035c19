use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::context::ReferenceMetrics;
use crate::error::{NovaError, Result};
use crate::qa::classify::ReferenceMode;

/// Names of the stages a run may sequence, in configuration spelling.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageName {
    FindData,
    Coaddition,
    SourceExtraction,
    MakeSubimages,
    ImageDifferencing,
    ChooseRefstars,
    Photometry,
    CountPixels,
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::FindData => "find-data",
            Self::Coaddition => "coaddition",
            Self::SourceExtraction => "source-extraction",
            Self::MakeSubimages => "make-subimages",
            Self::ImageDifferencing => "image-differencing",
            Self::ChooseRefstars => "choose-refstars",
            Self::Photometry => "photometry",
            Self::CountPixels => "count-pixels",
        };
        write!(f, "{name}")
    }
}

/// Full configuration of one pipeline run. Loaded once before execution,
/// validated eagerly, and immutable afterwards.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Observing program, e.g. "supernova".
    pub program: String,
    /// Target observation night, YYMMDD.
    pub night: Option<String>,
    /// Root output directory owned by this run.
    pub outdir: PathBuf,
    /// Stage execution order.
    pub stages: Vec<StageName>,
    /// Follow-up target coordinates (degrees).
    pub target: Option<TargetConfig>,
    /// Metric values from a prior run, preferred over static references.
    #[serde(default)]
    pub reference_metrics: Option<ReferenceMetrics>,

    pub discovery: Option<DiscoveryConfig>,
    pub coaddition: Option<CoadditionConfig>,
    pub extraction: Option<ExtractionConfig>,
    pub subimages: Option<SubimageConfig>,
    pub differencing: Option<DifferencingConfig>,
    pub refstars: Option<RefstarsConfig>,
    pub photometry: Option<PhotometryConfig>,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetConfig {
    pub ra: f64,
    pub dec: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DiscoveryConfig {
    /// Root of the preprocessed data archive, one subdirectory per night.
    pub datadir: PathBuf,
    pub telescope: Option<String>,
    /// Sky field to select; resolved from the target coordinates against
    /// the archive's `fields.json` index when absent.
    pub field: Option<String>,
    /// Nights before the target night to include.
    #[serde(default = "default_days_before")]
    pub days_before: i64,
    /// Nights after the target night to include.
    #[serde(default = "default_days_after")]
    pub days_after: i64,
}

fn default_days_before() -> i64 {
    30
}

fn default_days_after() -> i64 {
    60
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CoadditionConfig {
    /// Coaddition executable.
    pub tool: String,
    #[serde(default)]
    pub tool_args: Vec<String>,
    /// Stem suffix identifying nightly coadds among the tool's outputs.
    #[serde(default = "default_coadd_suffix")]
    pub coadd_suffix: String,
}

fn default_coadd_suffix() -> String {
    "000-000_c".to_string()
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtractionConfig {
    /// Source-extraction executable.
    pub tool: String,
    pub params_file: Option<PathBuf>,
    pub filter_file: Option<PathBuf>,
    #[serde(default = "default_aperture")]
    pub aperture: u32,
    /// Detector saturation level in counts.
    pub satur_level: f64,
}

fn default_aperture() -> u32 {
    7
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubimageConfig {
    /// Subimage extraction executable.
    pub tool: String,
    /// Half-size of the cutout around the target, in pixels.
    pub pixel_radius: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DifferencingConfig {
    /// Image differencing executable.
    pub tool: String,
    #[serde(default)]
    pub tool_args: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RefstarsConfig {
    /// Interactive aperture-photometry executable.
    pub tool: String,
    #[serde(default)]
    pub tool_args: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PhotometryConfig {
    /// Photometry executable.
    pub tool: String,
    /// Light-curve file the tool writes into the subimage directory.
    #[serde(default = "default_lightcurve_file")]
    pub lightcurve_file: String,
}

fn default_lightcurve_file() -> String {
    "lightcurve_subtract_target_psf.dat".to_string()
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MonitoringConfig {
    pub count_pixels: Option<CountPixelsParams>,
}

/// Thresholds for the count-pixels monitor. All bands are expressed in
/// the metric's reference-relative frame (see `reference_mode`); without
/// a reference they are absolute.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CountPixelsParams {
    /// Static reference count; a prior run's COUNT metric wins over this.
    pub count_ref: Option<f64>,
    pub count_warn_range: [f64; 2],
    pub count_normal_range: [f64; 2],
    #[serde(default)]
    pub reference_mode: ReferenceMode,
}

impl CountPixelsParams {
    /// Stringified parameter snapshot for the report.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        let mut params = BTreeMap::new();
        if let Some(count_ref) = self.count_ref {
            params.insert("COUNT_REF".to_string(), format!("{count_ref}"));
        }
        params.insert(
            "COUNT_WARN_RANGE".to_string(),
            format!("{:?}", self.count_warn_range),
        );
        params.insert(
            "COUNT_NORMAL_RANGE".to_string(),
            format!("{:?}", self.count_normal_range),
        );
        params.insert(
            "REFERENCE_MODE".to_string(),
            format!("{:?}", self.reference_mode),
        );
        params
    }
}

impl PipelineConfig {
    /// Validate the configuration before any stage executes: every named
    /// stage must have its parameter table, discovery inputs must be
    /// sufficient, and every range must be a lo <= hi interval.
    pub fn validate(&self) -> Result<()> {
        for stage in &self.stages {
            match stage {
                StageName::FindData => {
                    let discovery = required(self.discovery.as_ref(), *stage, "discovery")?;
                    if self.night.is_none() {
                        return Err(missing(*stage, "night"));
                    }
                    if discovery.field.is_none() && self.target.is_none() {
                        return Err(missing(*stage, "discovery.field (or [target])"));
                    }
                }
                StageName::Coaddition => {
                    required(self.coaddition.as_ref(), *stage, "coaddition")?;
                }
                StageName::SourceExtraction => {
                    required(self.extraction.as_ref(), *stage, "extraction")?;
                }
                StageName::MakeSubimages => {
                    required(self.subimages.as_ref(), *stage, "subimages")?;
                    required(self.target.as_ref(), *stage, "target")?;
                }
                StageName::ImageDifferencing => {
                    required(self.differencing.as_ref(), *stage, "differencing")?;
                }
                StageName::ChooseRefstars => {
                    required(self.refstars.as_ref(), *stage, "refstars")?;
                    required(self.target.as_ref(), *stage, "target")?;
                }
                StageName::Photometry => {
                    required(self.photometry.as_ref(), *stage, "photometry")?;
                }
                StageName::CountPixels => {
                    let params = required(
                        self.monitoring.as_ref().and_then(|m| m.count_pixels.as_ref()),
                        *stage,
                        "monitoring.count_pixels",
                    )?;
                    check_range("count_warn_range", params.count_warn_range)?;
                    check_range("count_normal_range", params.count_normal_range)?;
                }
            }
        }
        Ok(())
    }
}

fn required<T>(value: Option<T>, stage: StageName, key: &str) -> Result<T> {
    value.ok_or_else(|| missing(stage, key))
}

fn missing(stage: StageName, key: &str) -> NovaError {
    NovaError::MissingParameter {
        stage: stage.to_string(),
        key: key.to_string(),
    }
}

fn check_range(name: &str, range: [f64; 2]) -> Result<()> {
    if range[0] > range[1] {
        return Err(NovaError::Config(format!(
            "{name}: lower bound {} exceeds upper bound {}",
            range[0], range[1]
        )));
    }
    Ok(())
}
