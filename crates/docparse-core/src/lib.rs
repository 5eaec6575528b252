//! docparse-core: PDF and DOCX text and metadata extraction
//!
//! Each format parser produces a plain-text rendering of a document plus a
//! flat metadata record. Metadata values keep their native types until the
//! caller converts them with [`MetadataRecord::to_wire`].
//!
//! ```no_run
//! use docparse_core::{parser_for, DocumentFormat, ParseContext};
//! use std::path::Path;
//!
//! let parser = parser_for(DocumentFormat::Docx);
//! let doc = parser.parse(Path::new("/data/report.docx"), &ParseContext::default())?;
//! println!("{}", doc.content);
//! # Ok::<(), docparse_core::ParseError>(())
//! ```

pub mod docx;
pub mod error;
pub mod parser;
pub mod pdf;
pub mod types;

pub use docx::DocxParser;
pub use error::{ErrorKind, ParseError, Result};
pub use parser::{check_file, parser_for, FormatParser};
pub use pdf::PdfParser;
pub use types::{
    BlockSink, DocumentFormat, LabelLocale, LabelSet, MetadataRecord, MetadataValue,
    ParseContext, ParsedDocument, Provenance, TextBlock,
};
