use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDate};
use serde::Deserialize;
use tracing::{debug, info};

use crate::artifact::{file_name, file_stem, list_files_sorted, Artifact, DataKind};
use crate::context::RunContext;
use crate::error::{NovaError, Result};
use crate::pipeline::config::{DiscoveryConfig, TargetConfig};
use crate::stage::{Algorithm, ProcessingStage};

/// Finds the preprocessed images for the follow-up window and copies them
/// (with their product files) into `preproc/{image,prod}` under the run
/// output directory. Images without a matching product file are dropped.
pub struct FindData {
    config: DiscoveryConfig,
    target: Option<TargetConfig>,
}

impl FindData {
    pub fn new(config: DiscoveryConfig, target: Option<TargetConfig>) -> Self {
        Self { config, target }
    }

    fn missing(&self, key: &str) -> NovaError {
        NovaError::MissingParameter {
            stage: self.name().to_string(),
            key: key.to_string(),
        }
    }

    fn resolve_field(&self) -> Result<String> {
        if let Some(ref field) = self.config.field {
            return Ok(field.clone());
        }
        let target = self.target.as_ref().ok_or_else(|| self.missing("field"))?;
        find_field(&self.config.datadir, target)
    }
}

impl Algorithm for FindData {
    fn name(&self) -> &'static str {
        "find-data"
    }

    fn input_kind(&self) -> DataKind {
        DataKind::ImageCollection
    }

    fn output_kind(&self) -> DataKind {
        DataKind::ImageCollection
    }
}

impl ProcessingStage for FindData {
    fn execute(&self, input: &Artifact, ctx: &RunContext) -> Result<Artifact> {
        if !self.accepts(input.kind) {
            return Err(self.incompatible(input.kind));
        }
        let night = ctx.night.as_deref().ok_or_else(|| self.missing("night"))?;
        let field = self.resolve_field()?;

        let date = night_date(night)?;
        let start = date - Duration::days(self.config.days_before);
        let end = date + Duration::days(self.config.days_after);

        let image_dir = ctx.outdir.join("preproc").join("image");
        let prod_dir = ctx.outdir.join("preproc").join("prod");
        fs::create_dir_all(&image_dir)?;
        fs::create_dir_all(&prod_dir)?;

        let mut copied = 0usize;
        for night_dir in night_dirs_in_window(&self.config.datadir, start, end)? {
            let images = list_files_sorted(&night_dir.join("image"))?;
            let prods = list_files_sorted(&night_dir.join("prod"))?;
            for image in images {
                let name = file_name(&image);
                if !name.contains(field.as_str()) {
                    continue;
                }
                if let Some(ref telescope) = self.config.telescope {
                    if !name.contains(telescope.as_str()) {
                        continue;
                    }
                }
                // Only images with a corresponding product file survive.
                let Some(prod) = matching_prod(&image, &prods) else {
                    debug!(image = %name, "dropping image without product file");
                    continue;
                };
                fs::copy(&image, image_dir.join(name))?;
                fs::copy(&prod, prod_dir.join(file_name(&prod)))?;
                copied += 1;
            }
        }

        if copied == 0 {
            return Err(NovaError::Pipeline(format!(
                "find-data: no images for field {field} in nights {}..{}",
                start.format("%y%m%d"),
                end.format("%y%m%d")
            )));
        }
        info!(field = %field, images = copied, "collected preprocessed data");

        Artifact::discover(DataKind::ImageCollection, &ctx.outdir.join("preproc"))
    }
}

/// Parse an observation night identifier (YYMMDD).
pub fn night_date(night: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(night, "%y%m%d")
        .map_err(|_| NovaError::Config(format!("invalid night '{night}', expected YYMMDD")))
}

fn night_dirs_in_window(datadir: &Path, start: NaiveDate, end: NaiveDate) -> Result<Vec<PathBuf>> {
    if !datadir.is_dir() {
        return Err(NovaError::Config(format!(
            "data directory {} does not exist",
            datadir.display()
        )));
    }
    let mut dirs: Vec<PathBuf> = fs::read_dir(datadir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .filter(|path| {
            night_date(&file_name(path))
                .map(|date| date >= start && date <= end)
                .unwrap_or(false)
        })
        .collect();
    dirs.sort();
    Ok(dirs)
}

/// An image `<base>_c.<ext>` pairs with the product `<base>_cobj.<ext>`.
fn matching_prod(image: &Path, prods: &[PathBuf]) -> Option<PathBuf> {
    let stem = file_stem(image);
    let base = stem.strip_suffix("_c")?;
    let wanted = format!("{base}_cobj");
    prods.iter().find(|p| file_stem(p) == wanted).cloned()
}

#[derive(Debug, Deserialize)]
struct FieldEntry {
    name: String,
    ra: f64,
    dec: f64,
    radius_deg: f64,
}

/// Resolve the sky field covering the target coordinates from the
/// archive's `fields.json` index.
fn find_field(datadir: &Path, target: &TargetConfig) -> Result<String> {
    let index = datadir.join("fields.json");
    if !index.is_file() {
        return Err(NovaError::Config(format!(
            "no field configured and no fields.json index under {}",
            datadir.display()
        )));
    }
    let entries: Vec<FieldEntry> = serde_json::from_str(&fs::read_to_string(&index)?)?;
    entries
        .into_iter()
        .map(|entry| (separation_deg(&entry, target), entry))
        .filter(|(separation, entry)| *separation <= entry.radius_deg)
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, entry)| entry.name)
        .ok_or_else(|| {
            NovaError::Config(format!(
                "no field covers RA={} DEC={}",
                target.ra, target.dec
            ))
        })
}

/// Flat-sky angular separation, good enough for field-sized radii.
fn separation_deg(entry: &FieldEntry, target: &TargetConfig) -> f64 {
    let dra = (entry.ra - target.ra) * target.dec.to_radians().cos();
    let ddec = entry.dec - target.dec;
    dra.hypot(ddec)
}
