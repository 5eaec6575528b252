//! Page-level text access.

use crate::error::{ParseError, Result};
use crate::types::DocumentFormat;
use lopdf::Document;
use std::io::Read;

/// Per-page raw text, as the text pass sees a document.
pub trait PageSource {
    /// 1-based page numbers in document order
    fn page_numbers(&self) -> Vec<u32>;

    /// Raw text bytes of one page. May not be valid UTF-8.
    fn page_text(&self, page: u32) -> std::result::Result<Vec<u8>, String>;
}

/// Pages of a document loaded with lopdf
pub struct LopdfPages {
    doc: Document,
}

impl LopdfPages {
    pub fn load<R: Read>(source: R) -> Result<Self> {
        let doc = Document::load_from(source)
            .map_err(|e| ParseError::malformed(DocumentFormat::Pdf, e.to_string()))?;
        Ok(Self { doc })
    }
}

impl PageSource for LopdfPages {
    fn page_numbers(&self) -> Vec<u32> {
        self.doc.get_pages().into_keys().collect()
    }

    fn page_text(&self, page: u32) -> std::result::Result<Vec<u8>, String> {
        self.doc
            .extract_text(&[page])
            .map(String::into_bytes)
            .map_err(|e| e.to_string())
    }
}
