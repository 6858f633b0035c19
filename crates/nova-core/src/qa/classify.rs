use std::fmt;

use serde::{Deserialize, Serialize};

/// Classification outcome, ordered least to most severe.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Normal,
    Warning,
    Alert,
}

impl Severity {
    /// Most severe outcome the system defines; the fail-closed fallback.
    pub const MAX: Severity = Severity::Alert;

    pub fn label(&self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Warning => "WARNING",
            Self::Alert => "ALERT",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// How a metric is expressed relative to its reference value before band
/// comparison. Each metric declares its own operator in configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceMode {
    #[default]
    Difference,
    Ratio,
}

/// One acceptance tier: the interval [lo, hi) mapped to a severity.
#[derive(Clone, Copy, Debug)]
pub struct ToleranceBand {
    pub lo: f64,
    pub hi: f64,
    pub severity: Severity,
}

impl ToleranceBand {
    pub fn new(lo: f64, hi: f64, severity: Severity) -> Self {
        Self { lo, hi, severity }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.lo && value < self.hi
    }
}

/// Ordered acceptance tiers. Declared order is evaluation order: the first
/// band whose interval contains the effective value determines the result.
#[derive(Clone, Debug, Default)]
pub struct BandSet {
    bands: Vec<ToleranceBand>,
}

impl BandSet {
    pub fn new(bands: Vec<ToleranceBand>) -> Self {
        Self { bands }
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    pub fn bands(&self) -> &[ToleranceBand] {
        &self.bands
    }
}

/// Median of a value collection, robust to per-image outliers. Empty input
/// yields NaN, which no band contains.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    }
}

/// Map a computed metric to a severity.
///
/// A multi-value metric is reduced to its median first. With a reference,
/// the value is expressed relative to it per `mode`; otherwise it is
/// compared absolutely. Bands are evaluated in declared order and the
/// first containing band wins; a value outside every band classifies as
/// the most severe outcome rather than erroring.
pub fn classify(
    values: &[f64],
    reference: Option<f64>,
    mode: ReferenceMode,
    bands: &BandSet,
) -> Severity {
    let value = median(values);
    let effective = match reference {
        Some(reference) => match mode {
            ReferenceMode::Difference => value - reference,
            ReferenceMode::Ratio => value / reference,
        },
        None => value,
    };
    for band in bands.bands() {
        if band.contains(effective) {
            return band.severity;
        }
    }
    Severity::MAX
}
