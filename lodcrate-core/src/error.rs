//! Error types for lodcrate

use thiserror::Error;

/// Main error type for lodcrate operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Input arrays violate the raw mesh length invariants.
    #[error("Invalid mesh data: {0}")]
    InvalidMeshData(String),

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    #[error("Algorithm error: {0}")]
    Algorithm(String),
}

/// Result type alias for lodcrate operations
pub type Result<T> = std::result::Result<T, Error>;
