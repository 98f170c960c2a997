//! Engine-level errors

use siteline_core::{ConfigError, SitelineError};
use thiserror::Error;

/// Errors raised while bootstrapping or operating the engine process.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Siteline(#[from] SitelineError),

    #[error("Telemetry initialization failed: {0}")]
    Telemetry(String),

    #[error("I/O failure at {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("Usage: {0}")]
    Usage(String),

    #[error("Failed to render output: {0}")]
    Output(String),
}

impl From<ConfigError> for EngineError {
    fn from(err: ConfigError) -> Self {
        Self::Siteline(err.into())
    }
}

impl EngineError {
    pub(crate) fn io(path: impl std::fmt::Display, err: std::io::Error) -> Self {
        Self::Io {
            path: path.to_string(),
            reason: err.to_string(),
        }
    }
}

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
