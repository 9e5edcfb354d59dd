//! Error types for relman.

use thiserror::Error;

/// Coarse classification every caller (HTTP layer, tests) dispatches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Validation,
    Conflict,
    Forbidden,
    Internal,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("version {version} not found for system {system}; available versions: [{}]", .available.join(", "))]
    VersionNotFound {
        system: String,
        version: String,
        available: Vec<String>,
    },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Validation(_) | Error::VersionNotFound { .. } => ErrorKind::Validation,
            Error::Conflict(_) => ErrorKind::Conflict,
            Error::Forbidden(_) => ErrorKind::Forbidden,
            Error::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Versions a caller may choose from, when the error is a version mismatch.
    pub fn available_versions(&self) -> Option<&[String]> {
        match self {
            Error::VersionNotFound { available, .. } => Some(available),
            _ => None,
        }
    }

    pub fn not_found(what: &str, id: impl std::fmt::Display) -> Self {
        Error::NotFound(format!("{what} {id}"))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
