//! Error handling for the ViennaMesh runtime
//!
//! This module defines the crate-wide error type, a Result alias and the
//! stable integer codes that the Context reports through its last-error slot.

use crate::pipeline::error::PipelineError;
use std::path::PathBuf;
use thiserror::Error;

/// Stable integer codes for every error kind.
///
/// These are what the Context records alongside the message, so external
/// callers can branch on the kind without matching on the enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ErrorCode {
    DuplicateType = 1,
    DuplicateConversion = 2,
    DuplicateAlgorithm = 3,
    UnknownType = 4,
    UnknownAlgorithm = 5,
    NoConversionPath = 6,
    ConversionFailed = 7,
    RequiredInputMissing = 8,
    UnresolvedLinkReference = 9,
    AlgorithmRunFailure = 10,
    AlgorithmConstruction = 11,
    PluginLoadFailure = 12,
    PluginInUse = 13,
    OutOfBounds = 14,
    PayloadTypeMismatch = 15,
    InvalidPipeline = 16,
    Config = 17,
    Io = 18,
}

impl ErrorCode {
    #[inline]
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}({})", self, self.as_i32())
    }
}

/// Main error type for runtime operations
#[derive(Error, Debug)]
pub enum ViennaMeshError {
    /// A data type with this name already exists in the context
    #[error("Data type '{0}' is already registered")]
    DuplicateType(String),

    /// The ordered (from, to) pair already has a conversion
    #[error("Conversion '{from}' -> '{to}' is already registered")]
    DuplicateConversion { from: String, to: String },

    /// An algorithm with this name already exists in the context
    #[error("Algorithm '{0}' is already registered")]
    DuplicateAlgorithm(String),

    #[error("Unknown data type '{0}'")]
    UnknownType(String),

    #[error("Unknown algorithm '{0}'")]
    UnknownAlgorithm(String),

    /// No direct conversion is registered between the two types
    #[error("No conversion path from '{from}' to '{to}'")]
    NoConversionPath { from: String, to: String },

    /// A registered conversion rejected its input
    #[error("Conversion '{from}' -> '{to}' failed: {message}")]
    ConversionFailed {
        from: String,
        to: String,
        message: String,
    },

    #[error("Required input '{port}' of '{instance}' is not set")]
    RequiredInputMissing { instance: String, port: String },

    /// The make or init step of an algorithm failed
    #[error("Algorithm '{algorithm}' could not be constructed: {message}")]
    AlgorithmConstruction { algorithm: String, message: String },

    /// A function table handed to the registry is incomplete
    #[error("Algorithm '{algorithm}' is missing required function '{function}'")]
    MissingFunction {
        algorithm: String,
        function: &'static str,
    },

    /// An algorithm instance's run step failed
    #[error("Instance '{instance}' ({algorithm}) failed: {source}")]
    AlgorithmRun {
        instance: String,
        algorithm: String,
        #[source]
        source: Box<ViennaMeshError>,
    },

    /// Failure raised from inside an algorithm implementation
    #[error("Algorithm error: {0}")]
    Algorithm(String),

    #[error("Failed to load plugin {path:?}: {reason}")]
    PluginLoad { path: PathBuf, reason: String },

    #[error("Unknown plugin '{0}'")]
    UnknownPlugin(String),

    #[error("Plugin '{name}' is still referenced by {holders} live handle(s)")]
    PluginInUse { name: String, holders: usize },

    #[error("Position {position} is out of bounds for data of length {len}")]
    OutOfBounds { position: usize, len: usize },

    #[error("Payload of '{type_name}' data is not a {expected}")]
    PayloadTypeMismatch {
        type_name: String,
        expected: &'static str,
    },

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<ViennaMeshError>,
    },
}

impl ViennaMeshError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        ViennaMeshError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Shorthand for failures raised by algorithm implementations.
    pub fn algorithm(message: impl Into<String>) -> Self {
        ViennaMeshError::Algorithm(message.into())
    }

    /// The stable code for this error. Context wrappers report the code of
    /// the error they wrap.
    pub fn code(&self) -> ErrorCode {
        match self {
            ViennaMeshError::DuplicateType(_) => ErrorCode::DuplicateType,
            ViennaMeshError::DuplicateConversion { .. } => ErrorCode::DuplicateConversion,
            ViennaMeshError::DuplicateAlgorithm(_) => ErrorCode::DuplicateAlgorithm,
            ViennaMeshError::UnknownType(_) => ErrorCode::UnknownType,
            ViennaMeshError::UnknownAlgorithm(_) => ErrorCode::UnknownAlgorithm,
            ViennaMeshError::NoConversionPath { .. } => ErrorCode::NoConversionPath,
            ViennaMeshError::ConversionFailed { .. } => ErrorCode::ConversionFailed,
            ViennaMeshError::RequiredInputMissing { .. } => ErrorCode::RequiredInputMissing,
            ViennaMeshError::AlgorithmConstruction { .. } => ErrorCode::AlgorithmConstruction,
            ViennaMeshError::MissingFunction { .. } => ErrorCode::PluginLoadFailure,
            ViennaMeshError::AlgorithmRun { .. } | ViennaMeshError::Algorithm(_) => {
                ErrorCode::AlgorithmRunFailure
            }
            ViennaMeshError::PluginLoad { .. } | ViennaMeshError::UnknownPlugin(_) => {
                ErrorCode::PluginLoadFailure
            }
            ViennaMeshError::PluginInUse { .. } => ErrorCode::PluginInUse,
            ViennaMeshError::OutOfBounds { .. } => ErrorCode::OutOfBounds,
            ViennaMeshError::PayloadTypeMismatch { .. } => ErrorCode::PayloadTypeMismatch,
            ViennaMeshError::Pipeline(e) => e.code(),
            ViennaMeshError::Config(_) => ErrorCode::Config,
            ViennaMeshError::Io(_) => ErrorCode::Io,
            ViennaMeshError::WithContext { source, .. } => source.code(),
        }
    }

    /// Strip any context wrappers and return the underlying error.
    pub fn root(&self) -> &ViennaMeshError {
        match self {
            ViennaMeshError::WithContext { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Result type alias for runtime operations
pub type Result<T> = std::result::Result<T, ViennaMeshError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}
