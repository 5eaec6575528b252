//! Error types for document parsing.
//!
//! Every failure a format parser can report is a [`ParseError`]. Callers that
//! only care about the coarse category (for logging or wire responses) use
//! [`ParseError::kind`].

use crate::types::DocumentFormat;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while turning a document into text and metadata.
#[derive(Error, Debug)]
pub enum ParseError {
    /// The request carried an empty path.
    #[error("file path must not be empty")]
    EmptyPath,

    /// Nothing exists at the given path.
    #[error("file not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// The path exists but is a directory or another non-regular entry.
    #[error("not a regular file: {}", path.display())]
    NotAFile { path: PathBuf },

    /// The byte stream cannot be opened as the declared container format.
    #[error("malformed {format} document: {reason}")]
    MalformedDocument {
        format: DocumentFormat,
        reason: String,
    },

    /// Reading the file failed after it was found.
    #[error("I/O error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The caller's deadline passed before extraction finished.
    #[error("{format} extraction exceeded its deadline")]
    DeadlineExceeded { format: DocumentFormat },

    /// Anything the parsers did not anticipate, including caught panics.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Coarse error category exposed to operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    MalformedDocument,
    UnexpectedInternalError,
}

impl ParseError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyPath | Self::NotFound { .. } | Self::NotAFile { .. } => ErrorKind::NotFound,
            Self::MalformedDocument { .. } => ErrorKind::MalformedDocument,
            Self::Io { .. } | Self::DeadlineExceeded { .. } | Self::Internal(_) => {
                ErrorKind::UnexpectedInternalError
            }
        }
    }

    pub(crate) fn malformed(format: DocumentFormat, reason: impl Into<String>) -> Self {
        Self::MalformedDocument {
            format,
            reason: reason.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ParseError>;
