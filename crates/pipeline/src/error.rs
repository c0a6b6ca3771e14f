//! Pipeline error types

use thiserror::Error;

/// Pipeline errors
///
/// Logging itself is best-effort and never returns errors to producers;
/// only pipeline construction can fail.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A private pipeline was constructed outside a tokio runtime
    #[error("no tokio runtime available: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;
