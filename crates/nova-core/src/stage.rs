use crate::artifact::{Artifact, DataKind};
use crate::context::RunContext;
use crate::error::{NovaError, Result};
use crate::qa::report::Report;

/// Capability contract shared by every pipeline stage: one declared input
/// kind, one declared output kind, and a uniform pre-execution gate.
pub trait Algorithm: Send + Sync {
    fn name(&self) -> &'static str;

    fn input_kind(&self) -> DataKind;

    fn output_kind(&self) -> DataKind;

    /// True iff `kind` matches the declared input kind. Callers must
    /// check this before `execute`.
    fn accepts(&self, kind: DataKind) -> bool {
        kind == self.input_kind()
    }

    /// Incompatible-input error for this stage, reporting both the
    /// expected and the actual kind.
    fn incompatible(&self, actual: DataKind) -> NovaError {
        NovaError::IncompatibleInput {
            stage: self.name().to_string(),
            expected: self.input_kind(),
            actual,
        }
    }
}

/// Stage that transforms one artifact into another, either in-memory or by
/// delegating to an external tool and discovering what it produced. On
/// success the returned artifact's kind equals the declared output kind.
pub trait ProcessingStage: Algorithm {
    fn execute(&self, input: &Artifact, ctx: &RunContext) -> Result<Artifact>;
}

/// Stage that computes one or more metrics from its input, classifies them
/// against tolerance bands, and persists a structured report. Runs
/// alongside the pipeline: it never consumes the main artifact.
pub trait MonitoringStage: Algorithm {
    fn execute(&self, input: &Artifact, ctx: &RunContext) -> Result<Report>;
}

/// Tagged stage variant the orchestrator sequences.
pub enum Stage {
    Processing(Box<dyn ProcessingStage>),
    Monitoring(Box<dyn MonitoringStage>),
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Processing(stage) => stage.name(),
            Self::Monitoring(stage) => stage.name(),
        }
    }

    pub fn input_kind(&self) -> DataKind {
        match self {
            Self::Processing(stage) => stage.input_kind(),
            Self::Monitoring(stage) => stage.input_kind(),
        }
    }

    pub fn accepts(&self, kind: DataKind) -> bool {
        match self {
            Self::Processing(stage) => stage.accepts(kind),
            Self::Monitoring(stage) => stage.accepts(kind),
        }
    }

    pub fn incompatible(&self, actual: DataKind) -> NovaError {
        match self {
            Self::Processing(stage) => stage.incompatible(actual),
            Self::Monitoring(stage) => stage.incompatible(actual),
        }
    }
}
