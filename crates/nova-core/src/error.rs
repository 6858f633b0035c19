use std::path::PathBuf;

use thiserror::Error;

use crate::artifact::DataKind;

#[derive(Error, Debug)]
pub enum NovaError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("stage {stage}: missing required parameter '{key}'")]
    MissingParameter { stage: String, key: String },

    #[error("stage {stage}: was expecting {expected}, got {actual}")]
    IncompatibleInput {
        stage: String,
        expected: DataKind,
        actual: DataKind,
    },

    #[error("stage {stage}: {tool} failed ({status})")]
    ToolFailure {
        stage: String,
        tool: String,
        status: String,
    },

    #[error("stage {stage}: expected output missing under {path}")]
    MissingOutput { stage: String, path: PathBuf },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("pipeline error: {0}")]
    Pipeline(String),
}

pub type Result<T> = std::result::Result<T, NovaError>;
