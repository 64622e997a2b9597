use thiserror::Error;

/// Result type for propagation operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while evaluating a cell
#[derive(Error, Debug)]
pub enum Error {
    #[error("Computation cancelled")]
    Cancelled,

    #[error("Invalid propagation input: {0}")]
    InvalidInput(String),

    #[error("Geometry error: {0}")]
    GeometryError(#[from] noisefield_geometry::Error),
}
