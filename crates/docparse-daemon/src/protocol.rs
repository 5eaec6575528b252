//! Wire protocol for the parsing service
//!
//! One JSON-encoded [`Request`] per line, answered by one JSON-encoded
//! [`Response`] per line. Metadata crosses the wire as a flat string map.

use docparse_core::DocumentFormat;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Request from client to server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Request {
    /// Parse a PDF at a path readable by the server
    ParsePdf { file_path: String },
    /// Parse a DOCX at a path readable by the server
    ParseDocx { file_path: String },
    /// Liveness check
    HealthCheck {
        #[serde(default)]
        service: String,
    },
}

impl Request {
    /// Format a parse request targets; `None` for health checks
    pub fn format(&self) -> Option<DocumentFormat> {
        match self {
            Self::ParsePdf { .. } => Some(DocumentFormat::Pdf),
            Self::ParseDocx { .. } => Some(DocumentFormat::Docx),
            Self::HealthCheck { .. } => None,
        }
    }
}

/// Response from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Response {
    Document(ParseDocumentResponse),
    Health(HealthCheckResponse),
    /// The request line could not be understood
    Error(String),
}

/// Outcome of one parse.
///
/// `success == false` always comes with empty `content` and `metadata` and a
/// non-empty `error_message`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ParseDocumentResponse {
    pub success: bool,
    pub content: String,
    pub metadata: BTreeMap<String, String>,
    #[serde(default)]
    pub error_message: String,
}

impl ParseDocumentResponse {
    pub fn success(content: String, metadata: BTreeMap<String, String>) -> Self {
        Self {
            success: true,
            content,
            metadata,
            error_message: String::new(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        let mut message = message.into();
        if message.is_empty() {
            message.push_str("unknown error");
        }
        Self {
            success: false,
            content: String::new(),
            metadata: BTreeMap::new(),
            error_message: message,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheckResponse {
    pub healthy: bool,
    pub message: String,
    pub version: String,
}
