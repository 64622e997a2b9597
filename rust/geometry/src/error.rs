use thiserror::Error;

/// Result type for geometry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building the obstruction geometry
#[derive(Error, Debug)]
pub enum Error {
    #[error("Tessellation failed: {0}")]
    TessellationError(String),

    #[error("Invalid domain boundary: {0}")]
    InvalidDomain(String),

    #[error("Empty mesh: {0}")]
    EmptyMesh(String),
}
