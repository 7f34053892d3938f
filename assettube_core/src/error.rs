//! Error types for assettube_core.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using assettube_core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while scanning, loading, or reconfiguring a registry.
///
/// Lookup misses are not errors; they surface as `None` or an empty string.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error occurred during file operations.
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// A walked path cannot be expressed as a logical path.
    #[error("Invalid path {path}: {reason}")]
    InvalidPath { path: PathBuf, reason: String },

    /// Manifest file is not valid JSON or does not match the manifest shape.
    #[error("Malformed manifest at {path}: {source}")]
    ManifestParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Unsupported algorithm.
    #[error("Unsupported algorithm: {algorithm}")]
    UnsupportedAlgorithm { algorithm: String },

    /// Registry was bootstrapped from a manifest and has no roots to replay.
    #[error("Registry is backed by manifest {path} and cannot be reconfigured")]
    ManifestBacked { path: PathBuf },
}

impl Error {
    /// Create an InvalidPath error.
    pub fn invalid_path(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a ManifestParse error.
    pub fn manifest_parse(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Error::ManifestParse {
            path: path.into(),
            source,
        }
    }

    /// Create an UnsupportedAlgorithm error.
    pub fn unsupported_algorithm(algorithm: impl Into<String>) -> Self {
        Error::UnsupportedAlgorithm {
            algorithm: algorithm.into(),
        }
    }

    /// Create a ManifestBacked error.
    pub fn manifest_backed(path: impl Into<PathBuf>) -> Self {
        Error::ManifestBacked { path: path.into() }
    }
}

// Additional From implementations for external error types

impl From<tempfile::PersistError> for Error {
    fn from(err: tempfile::PersistError) -> Self {
        Error::Io { source: err.error }
    }
}

impl From<ignore::Error> for Error {
    fn from(err: ignore::Error) -> Self {
        // ignore::Error can wrap an io::Error or be a path error
        match err.io_error() {
            Some(io_err) => Error::Io {
                source: std::io::Error::new(io_err.kind(), io_err.to_string()),
            },
            None => Error::Io {
                source: std::io::Error::other(err.to_string()),
            },
        }
    }
}
