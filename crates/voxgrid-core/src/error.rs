//! Error types for voxgrid-rs.

use thiserror::Error;

use crate::engine::EngineVersion;

/// The main error type for voxgrid-rs operations.
///
/// Every operation validates its inputs before building any output, so an
/// error always leaves the caller's grid and arrays untouched.
#[derive(Error, Debug)]
pub enum VoxgridError {
    /// Bad shape, bad enum value, or dimension/array-count mismatch.
    #[error("{0}")]
    InvalidArgument(String),

    /// A value has a type that cannot be used for the operation.
    #[error("{0}")]
    TypeMismatch(String),

    /// The external engine is below the capability level a feature needs.
    #[error("{feature} require engine version {required} or newer (found {found}).")]
    UnsupportedVersion {
        feature: String,
        required: EngineVersion,
        found: EngineVersion,
    },

    /// No data arrays are present but the operation needs at least one.
    #[error("{0}")]
    MissingData(String),

    /// A named array does not exist on the image.
    #[error("array '{0}' not found")]
    ArrayNotFound(String),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl VoxgridError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub(crate) fn type_mismatch(msg: impl Into<String>) -> Self {
        Self::TypeMismatch(msg.into())
    }
}

/// A specialized Result type for voxgrid-rs operations.
pub type Result<T> = std::result::Result<T, VoxgridError>;
