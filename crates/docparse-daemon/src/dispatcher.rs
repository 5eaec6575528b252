//! Request dispatch and fault isolation
//!
//! Every parse request moves through Received, Validating, Parsing and
//! Responding, each traced. Validation failures never reach a parser. Parser
//! errors and panics become failure responses; nothing escapes to the
//! server.

use crate::protocol::ParseDocumentResponse;
use docparse_core::{
    check_file, parser_for, DocumentFormat, LabelSet, ParseContext, ParseError,
};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Directory entries listed when a path is not found
const MAX_DIAGNOSTIC_ENTRIES: usize = 20;

#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    labels: LabelSet,
    parse_timeout: Option<Duration>,
}

impl Dispatcher {
    pub fn new(labels: LabelSet, parse_timeout: Option<Duration>) -> Self {
        Self {
            labels,
            parse_timeout,
        }
    }

    /// Parse `file_path` as `format` and shape the result for the wire.
    ///
    /// Blocks for the full parse; run it on a blocking worker.
    pub fn dispatch(&self, format: DocumentFormat, file_path: &str) -> ParseDocumentResponse {
        let started = Instant::now();
        info!(%format, file_path, "Received parse request");

        debug!(%format, file_path, "Validating");
        let path = Path::new(file_path);
        if let Err(e) = check_file(path) {
            if matches!(e, ParseError::NotFound { .. }) {
                log_not_found_diagnostics(path);
            }
            warn!(%format, file_path, kind = ?e.kind(), "Rejected: {e}");
            return self.respond(format, ParseDocumentResponse::failure(e.to_string()), started);
        }

        debug!(%format, file_path, "Parsing");
        let ctx = ParseContext {
            labels: self.labels,
            deadline: self.parse_timeout.map(|t| started + t),
        };
        let parser = parser_for(format);
        let result = catch_unwind(AssertUnwindSafe(|| parser.parse(path, &ctx)))
            .unwrap_or_else(|panic| Err(ParseError::Internal(panic_message(&*panic))));

        let response = match result {
            Ok(doc) => ParseDocumentResponse::success(doc.content, doc.metadata.to_wire()),
            Err(e) => {
                error!(%format, file_path, kind = ?e.kind(), "Parse failed: {e}");
                ParseDocumentResponse::failure(format!("{format} parse failed: {e}"))
            }
        };
        self.respond(format, response, started)
    }

    fn respond(
        &self,
        format: DocumentFormat,
        response: ParseDocumentResponse,
        started: Instant,
    ) -> ParseDocumentResponse {
        info!(
            %format,
            success = response.success,
            content_length = response.content.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Responding"
        );
        response
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("parser panicked: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("parser panicked: {s}")
    } else {
        "parser panicked".to_string()
    }
}

/// Operator hints for a missing file. Logged only, never part of a response.
fn log_not_found_diagnostics(path: &Path) {
    let cwd = std::env::current_dir()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|e| format!("<unavailable: {e}>"));
    let dir = path.parent().filter(|d| !d.as_os_str().is_empty());
    let dir_exists = dir.is_some_and(Path::is_dir);
    let parent_exists = dir.and_then(Path::parent).is_some_and(Path::is_dir);
    warn!(
        path = %path.display(),
        cwd = %cwd,
        dir_exists,
        parent_exists,
        "File not found"
    );

    let Some(dir) = dir.filter(|_| dir_exists) else {
        return;
    };
    match std::fs::read_dir(dir) {
        Ok(entries) => {
            let names: Vec<String> = entries
                .filter_map(std::result::Result::ok)
                .take(MAX_DIAGNOSTIC_ENTRIES)
                .map(|entry| entry.file_name().to_string_lossy().into_owned())
                .collect();
            warn!(dir = %dir.display(), "Directory contains: {names:?}");
        }
        Err(e) => warn!(dir = %dir.display(), "Cannot list directory: {e}"),
    }
}
