//! Pipeline-specific error types.

use crate::error::ErrorCode;
use crate::pipeline::description::ParameterType;
use std::path::PathBuf;
use thiserror::Error;

/// Errors found while reading or building a pipeline description.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Failed to parse pipeline description: {0}")]
    Parse(String),

    #[error("Unsupported pipeline description format: {0:?}")]
    UnsupportedFormat(PathBuf),

    #[error("Unknown parameter type '{0}'")]
    UnknownParameterType(String),

    #[error("Instance name '{0}' is declared twice")]
    DuplicateInstance(String),

    #[error("Instance '{instance}' names default source '{target}', which is not declared before it")]
    UnresolvedDefaultSource { instance: String, target: String },

    #[error("Parameter '{parameter}' of '{instance}' links to '{target}', which is not declared before it")]
    UnresolvedLink {
        instance: String,
        parameter: String,
        target: String,
    },

    #[error("Parameter '{parameter}' of '{instance}' has malformed link '{value}' (expected \"<instance>/<output>\")")]
    MalformedLink {
        instance: String,
        parameter: String,
        value: String,
    },

    #[error("Parameter '{parameter}' of '{instance}' is not a valid {kind}: '{value}'")]
    InvalidLiteral {
        instance: String,
        parameter: String,
        kind: ParameterType,
        value: String,
    },
}

impl PipelineError {
    pub fn code(&self) -> ErrorCode {
        match self {
            PipelineError::UnresolvedDefaultSource { .. } | PipelineError::UnresolvedLink { .. } => {
                ErrorCode::UnresolvedLinkReference
            }
            _ => ErrorCode::InvalidPipeline,
        }
    }
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
