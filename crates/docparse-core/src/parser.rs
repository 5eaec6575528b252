//! The format parser seam.

use crate::docx::DocxParser;
use crate::error::{ParseError, Result};
use crate::pdf::PdfParser;
use crate::types::{DocumentFormat, ParseContext, ParsedDocument};
use std::path::Path;

/// Turns one container format into content and metadata.
///
/// Implementations own no state across calls; every `parse` opens its own
/// file handles and drops them before returning.
pub trait FormatParser: Send + Sync {
    fn format(&self) -> DocumentFormat;

    fn parse(&self, path: &Path, ctx: &ParseContext) -> Result<ParsedDocument>;
}

static PDF_PARSER: PdfParser = PdfParser;
static DOCX_PARSER: DocxParser = DocxParser;

/// Get the parser for a format
pub fn parser_for(format: DocumentFormat) -> &'static dyn FormatParser {
    match format {
        DocumentFormat::Pdf => &PDF_PARSER,
        DocumentFormat::Docx => &DOCX_PARSER,
    }
}

/// Check that `path` names an existing regular file and return its size.
pub fn check_file(path: &Path) -> Result<u64> {
    if path.as_os_str().is_empty() {
        return Err(ParseError::EmptyPath);
    }
    let meta = match std::fs::metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ParseError::NotFound {
                path: path.to_path_buf(),
            })
        }
        Err(e) => return Err(ParseError::io(path, e)),
    };
    if !meta.is_file() {
        return Err(ParseError::NotAFile {
            path: path.to_path_buf(),
        });
    }
    Ok(meta.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_parser_for() {
        assert_eq!(parser_for(DocumentFormat::Pdf).format(), DocumentFormat::Pdf);
        assert_eq!(parser_for(DocumentFormat::Docx).format(), DocumentFormat::Docx);
    }

    #[test]
    fn test_check_file_empty_path() {
        assert!(matches!(check_file(Path::new("")), Err(ParseError::EmptyPath)));
    }

    #[test]
    fn test_check_file_missing() {
        let path = PathBuf::from("/definitely/not/here.docx");
        assert!(matches!(check_file(&path), Err(ParseError::NotFound { .. })));
    }

    #[test]
    fn test_check_file_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            check_file(dir.path()),
            Err(ParseError::NotAFile { .. })
        ));
    }

    #[test]
    fn test_check_file_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.bin");
        std::fs::write(&path, b"12345").unwrap();
        assert_eq!(check_file(&path).unwrap(), 5);
    }
}
