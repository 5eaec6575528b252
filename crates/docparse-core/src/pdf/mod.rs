//! PDF parser
//!
//! Two independent passes over the same file: the text pass walks pages
//! through a [`PageSource`], the structural pass reloads the file to read the
//! Info dictionary and count images and tables. Each pass owns its file
//! handle and drops it before the next begins.
//!
//! `image_count` and `table_count` are best-effort and may be zero for
//! documents that do contain images or tables.

mod pages;
mod structure;
pub mod tables;
mod text;

pub use pages::{LopdfPages, PageSource};
pub use structure::{
    collect_structure, decode_text_string, guard_structure, parse_pdf_date, structure_of,
};
pub use text::{extract_pages, PageFailure, PageText};

use crate::error::{ParseError, Result};
use crate::parser::{check_file, FormatParser};
use crate::types::{DocumentFormat, MetadataRecord, MetadataValue, ParseContext, ParsedDocument};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{info, warn};

pub const PARSER_NAME: &str = "lopdf";

#[derive(Debug, Default, Clone, Copy)]
pub struct PdfParser;

impl FormatParser for PdfParser {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Pdf
    }

    fn parse(&self, path: &Path, ctx: &ParseContext) -> Result<ParsedDocument> {
        let file_size = check_file(path)?;

        let file = File::open(path).map_err(|e| ParseError::io(path, e))?;
        let source = LopdfPages::load(BufReader::new(file))?;
        let doc = parse_passes(source, || collect_structure(path), file_size, ctx)?;
        info!(
            path = %path.display(),
            content_length = doc.content.len(),
            "Parsed PDF"
        );
        Ok(doc)
    }
}

/// Run the text pass over `pages`, then the structural pass.
///
/// The page source is dropped before `structure` runs. A structural pass
/// that panics contributes nothing; only the text pass can fail the parse.
pub fn parse_passes<S, F>(
    pages: S,
    structure: F,
    file_size: u64,
    ctx: &ParseContext,
) -> Result<ParsedDocument>
where
    S: PageSource,
    F: FnOnce() -> MetadataRecord,
{
    let text = extract_pages(&pages, ctx)?;
    drop(pages);

    let structure = guard_structure(structure);
    Ok(assemble(text, structure, file_size))
}

/// Combine both passes into the final document.
///
/// `file_size`, `page_count`, `content_length` and `parser` are always
/// present; failure markers are added when pages were skipped.
pub fn assemble(pages: PageText, structure: MetadataRecord, file_size: u64) -> ParsedDocument {
    let content = pages.content();
    let mut metadata = structure;

    metadata.insert("file_size", MetadataValue::Count(file_size));
    metadata.insert("page_count", MetadataValue::count(pages.page_count));
    metadata.insert("content_length", MetadataValue::count(content.len()));
    metadata.insert("parser", MetadataValue::text(PARSER_NAME));

    if !pages.failures.is_empty() {
        metadata.insert("failed_page_count", MetadataValue::count(pages.failures.len()));
    }
    if pages.all_pages_failed() {
        warn!(pages = pages.page_count, "Every page failed text extraction");
        metadata.insert("extraction_warning", MetadataValue::text("all_pages_failed"));
    }

    ParsedDocument { content, metadata }
}
