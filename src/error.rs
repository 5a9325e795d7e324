use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CacheError>;

/// Failures surfaced by the cache. No variant is retried internally; every
/// failure propagates to the immediate caller.
#[derive(Debug, Error)]
pub enum CacheError {
    /// An argument could not be canonicalized to a deterministic string.
    /// Raised while building [`crate::CallArgs`], before any side effect.
    #[error("{position} has no deterministic string form: {reason}")]
    Unhashable { position: String, reason: String },

    /// The storage backend failed. Cleanup failures surface through this
    /// variant as well; a failed cleanup may orphan payload tables, which
    /// are unreachable afterwards but never corrupting.
    #[error("storage backend failure")]
    Storage(#[from] StorageError),

    /// The wrapped computation itself failed. The original error is the
    /// source; nothing is written to the cache.
    #[error("wrapped computation failed")]
    Computation(#[source] anyhow::Error),
}

/// Low-level backend failure, wrapped by [`CacheError::Storage`].
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite query failed")]
    Sqlite(#[from] rusqlite::Error),

    #[error("{operation} failed for {}", path.display())]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("payload {reference} could not be encoded")]
    PayloadEncode {
        reference: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("payload {reference} is not decodable")]
    PayloadDecode {
        reference: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("payload {reference} is missing from the store")]
    PayloadMissing { reference: String },

    #[error("failed to determine a home directory for the default storage root")]
    NoHomeDir,
}

impl StorageError {
    pub fn io(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }
}
