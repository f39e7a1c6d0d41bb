//! Error types for the indexing subsystem

use thiserror::Error;

/// Result type alias for indexer operations
pub type IndexerResult<T> = std::result::Result<T, IndexerError>;

/// Errors surfaced by the indexer's public API.
///
/// Index corruption and per-event failures are deliberately *not* variants
/// here: corruption triggers a background rebuild and per-event failures are
/// logged and skipped, neither is returned to the caller.
#[derive(Debug, Error)]
pub enum IndexerError {
    /// The underlying index engine rejected open/create at `initialize`.
    #[error("database error: {0}")]
    Database(String),

    /// The query parser rejected the compiled query string.
    #[error("query parse failure: {0}")]
    QueryParse(String),

    /// I/O error manipulating the on-disk index directory.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error (index metadata, checkpoint files).
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal/unexpected error.
    #[error("internal indexer error: {0}")]
    Internal(String),
}

impl IndexerError {
    /// Returns the error type string (for structured logging/diagnostics).
    #[must_use]
    pub const fn error_type(&self) -> &'static str {
        match self {
            Self::Database(_) => "DATABASE_ERROR",
            Self::QueryParse(_) => "QUERY_PARSE_FAILURE",
            Self::Io(_) => "IO_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns whether the error is transient and can plausibly be retried
    /// after a rebuild (as opposed to a malformed query, which will never
    /// succeed on retry without the caller changing the query text).
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Io(_))
    }
}
