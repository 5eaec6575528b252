//! DOCX (Office Open XML word processing) parser

mod extract;
mod metadata;
pub mod model;
mod reader;

pub use extract::{extract_blocks, join_blocks, render_table};
pub use metadata::collect_metadata;
pub use reader::read_docx;

use crate::error::{ParseError, Result};
use crate::parser::{check_file, FormatParser};
use crate::types::{DocumentFormat, MetadataValue, ParseContext, ParsedDocument};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, info};

pub const PARSER_NAME: &str = "quick-xml";

#[derive(Debug, Default, Clone, Copy)]
pub struct DocxParser;

impl FormatParser for DocxParser {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Docx
    }

    fn parse(&self, path: &Path, ctx: &ParseContext) -> Result<ParsedDocument> {
        let file_size = check_file(path)?;
        let file = File::open(path).map_err(|e| ParseError::io(path, e))?;
        let doc = read_docx(BufReader::new(file))?;

        let blocks = extract_blocks(&doc, ctx)?;
        debug!(blocks = blocks.len(), "Extracted DOCX text blocks");
        let content = join_blocks(&blocks);

        let mut metadata = collect_metadata(&doc);
        metadata.insert("file_size", MetadataValue::Count(file_size));
        metadata.insert("content_length", MetadataValue::count(content.len()));
        metadata.insert("parser", MetadataValue::text(PARSER_NAME));

        info!(
            path = %path.display(),
            content_length = content.len(),
            "Parsed DOCX"
        );
        Ok(ParsedDocument { content, metadata })
    }
}
