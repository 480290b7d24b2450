//! Error types for the cloud backend interfaces.

use thiserror::Error;

/// Result type alias for backend operations.
pub type CloudResult<T> = Result<T, CloudError>;

/// Errors that can occur talking to a cloud backend.
///
/// Callers in the decision path treat any of these as "value absent":
/// the affected node drops out of the snapshot and the decision proceeds
/// on what remains.
#[derive(Debug, Error)]
pub enum CloudError {
    #[error("backend call failed: {0}")]
    Backend(String),

    #[error("backend call timed out: {0}")]
    Timeout(String),

    #[error("instance metadata unavailable: {0}")]
    MetadataUnavailable(String),
}
