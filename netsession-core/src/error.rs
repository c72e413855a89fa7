//! Error types for netsession core operations.

use thiserror::Error;

/// Core error type for netsession operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The background poll thread could not be created.
    #[error("failed to spawn poll thread '{thread_name}': {source}")]
    Spawn {
        /// Requested thread name.
        thread_name: String,
        /// Underlying OS error.
        source: std::io::Error,
    },
}

/// Result type alias for netsession core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
