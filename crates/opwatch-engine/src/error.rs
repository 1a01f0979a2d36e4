//! Engine error types.

use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur inside the compliance engine.
///
/// Only session-start failures propagate to callers; per-chunk failures are
/// contained at the chunk boundary by the dispatch worker.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Reference procedure not found: {0}")]
    ProcedureNotFound(String),

    #[error("Reference procedure has no steps: {0}")]
    EmptyProcedure(String),

    #[error("Oracle error: {0}")]
    Oracle(#[from] opwatch_oracle::OracleError),

    #[error("Media error: {0}")]
    Media(#[from] opwatch_media::MediaError),

    #[error("Store error: {0}")]
    Store(#[from] opwatch_store::StoreError),
}
