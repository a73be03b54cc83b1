use std::fmt;

use thiserror::Error;

/// Programmatic classification of every failure a provgraph operation can report.
///
/// Each error type in the workspace maps onto exactly one kind via its
/// `kind()` method, so callers can branch without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    StorageUnavailable,
    DuplicateId,
    DanglingReference,
    ReferentialIntegrityViolation,
    NotFound,
    MalformedPayload,
    InvalidEntity,
    UnknownAction,
    InvalidArguments,
    Io,
    Storage,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StorageUnavailable => "storage_unavailable",
            Self::DuplicateId => "duplicate_id",
            Self::DanglingReference => "dangling_reference",
            Self::ReferentialIntegrityViolation => "referential_integrity_violation",
            Self::NotFound => "not_found",
            Self::MalformedPayload => "malformed_payload",
            Self::InvalidEntity => "invalid_entity",
            Self::UnknownAction => "unknown_action",
            Self::InvalidArguments => "invalid_arguments",
            Self::Io => "io",
            Self::Storage => "storage",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from reading or writing a serialized `GraphContext`.
#[derive(Error, Debug)]
pub enum ContextError {
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ContextError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedPayload(_) => ErrorKind::MalformedPayload,
            Self::Io(_) => ErrorKind::Io,
        }
    }
}

impl From<serde_json::Error> for ContextError {
    fn from(e: serde_json::Error) -> Self {
        Self::MalformedPayload(e.to_string())
    }
}
