//! Unified error types for the vendavoa offline worker.

use tokio_rusqlite::rusqlite;

/// Unified error types for the worker crates.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The network request could not be issued at all (no connectivity,
    /// DNS failure, connection refused). A reachable server returning an
    /// error status is NOT this variant.
    #[error("NETWORK_UNREACHABLE: {0}")]
    NetworkUnreachable(String),

    /// No cache entry found for the given key.
    #[error("CACHE_MISS: {0}")]
    CacheMiss(String),

    /// Request scheme is outside http/https and is excluded from
    /// interception entirely.
    #[error("UNSUPPORTED_SCHEME: {0}")]
    UnsupportedScheme(String),

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Invalid input parameters (e.g., empty URL).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Pre-population of the cache during install did not complete; the
    /// new worker generation must not become installed.
    #[error("INSTALL_FAILED: {0}")]
    InstallFailed(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::CacheMiss("GET /cars/42".to_string());
        assert!(err.to_string().contains("CACHE_MISS"));
        assert!(err.to_string().contains("/cars/42"));
    }

    #[test]
    fn test_network_unreachable_display() {
        let err = Error::NetworkUnreachable("connection refused".to_string());
        assert!(err.to_string().starts_with("NETWORK_UNREACHABLE"));
    }
}
