use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{NovaError, Result};

/// One photometric measurement of the target.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LightCurvePoint {
    pub mjd: f64,
    pub mag: f64,
    pub mag_err: f64,
}

/// Parse the photometry tool's light-curve file: whitespace-delimited
/// MJD, magnitude, magnitude error columns. Comment lines start with '#'.
pub fn read_light_curve(path: &Path) -> Result<Vec<LightCurvePoint>> {
    let contents = fs::read_to_string(path)?;
    let mut points = Vec::new();
    for (lineno, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 3 {
            return Err(NovaError::Pipeline(format!(
                "{}:{}: expected MJD, mag, mag_err columns",
                path.display(),
                lineno + 1
            )));
        }
        let parse = |field: &str| {
            field.parse::<f64>().map_err(|_| {
                NovaError::Pipeline(format!(
                    "{}:{}: invalid number '{}'",
                    path.display(),
                    lineno + 1,
                    field
                ))
            })
        };
        points.push(LightCurvePoint {
            mjd: parse(fields[0])?,
            mag: parse(fields[1])?,
            mag_err: parse(fields[2])?,
        });
    }
    Ok(points)
}

/// Write the light curve as a JSON document.
pub fn write_light_curve(points: &[LightCurvePoint], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(points)?)?;
    Ok(())
}
