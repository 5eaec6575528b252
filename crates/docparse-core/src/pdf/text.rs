//! PDF text pass.
//!
//! Pages are extracted in order. A page that fails is skipped and recorded;
//! the rest of the document still contributes text.

use super::pages::PageSource;
use crate::error::{ParseError, Result};
use crate::types::{BlockSink, DocumentFormat, ParseContext, Provenance, TextBlock};
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageFailure {
    pub page: u32,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct PageText {
    pub blocks: Vec<TextBlock>,
    pub page_count: usize,
    pub failures: Vec<PageFailure>,
}

impl PageText {
    /// Every page text followed by a newline, empty pages included
    pub fn content(&self) -> String {
        let mut content = String::new();
        for block in &self.blocks {
            content.push_str(&block.text);
            content.push('\n');
        }
        content
    }

    pub fn all_pages_failed(&self) -> bool {
        self.page_count > 0 && self.failures.len() == self.page_count
    }
}

pub fn extract_pages<S: PageSource + ?Sized>(source: &S, ctx: &ParseContext) -> Result<PageText> {
    let pages = source.page_numbers();
    let mut sink = BlockSink::default();
    let mut failures = Vec::new();

    for &page in &pages {
        if ctx.deadline_passed() {
            return Err(ParseError::DeadlineExceeded {
                format: DocumentFormat::Pdf,
            });
        }

        let raw = catch_unwind(AssertUnwindSafe(|| source.page_text(page)))
            .unwrap_or_else(|_| Err("panic during page extraction".to_string()));
        match raw {
            Ok(bytes) => {
                let text = match String::from_utf8(bytes) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(page, "Page text is not valid UTF-8, replacing bad sequences");
                        String::from_utf8_lossy(e.as_bytes()).into_owned()
                    }
                };
                debug!(page, len = text.len(), "Extracted page");
                sink.push(Provenance::Page, text);
            }
            Err(reason) => {
                warn!(page, "Skipping page: {reason}");
                failures.push(PageFailure { page, reason });
            }
        }
    }

    Ok(PageText {
        blocks: sink.into_blocks(),
        page_count: pages.len(),
        failures,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakePages(Vec<std::result::Result<Vec<u8>, String>>);

    impl PageSource for FakePages {
        fn page_numbers(&self) -> Vec<u32> {
            (1..=self.0.len() as u32).collect()
        }

        fn page_text(&self, page: u32) -> std::result::Result<Vec<u8>, String> {
            self.0[(page - 1) as usize].clone()
        }
    }

    #[test]
    fn test_empty_pages_still_add_newline() {
        let pages = FakePages(vec![Ok(b"one".to_vec()), Ok(Vec::new()), Ok(b"three".to_vec())]);
        let text = extract_pages(&pages, &ParseContext::default()).unwrap();
        assert_eq!(text.content(), "one\n\nthree\n");
        assert_eq!(text.page_count, 3);
        assert!(text.failures.is_empty());
    }

    #[test]
    fn test_failed_page_is_skipped() {
        let pages = FakePages(vec![
            Ok(b"one".to_vec()),
            Err("bad stream".to_string()),
            Ok(b"three".to_vec()),
        ]);
        let text = extract_pages(&pages, &ParseContext::default()).unwrap();
        assert_eq!(text.content(), "one\nthree\n");
        assert_eq!(
            text.failures,
            vec![PageFailure {
                page: 2,
                reason: "bad stream".to_string()
            }]
        );
        assert!(!text.all_pages_failed());
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let pages = FakePages(vec![Ok(vec![b'o', b'k', 0xFF, b'!'])]);
        let text = extract_pages(&pages, &ParseContext::default()).unwrap();
        assert_eq!(text.content(), "ok\u{FFFD}!\n");
    }

    #[test]
    fn test_all_pages_failed() {
        let pages = FakePages(vec![Err("x".to_string()), Err("y".to_string())]);
        let text = extract_pages(&pages, &ParseContext::default()).unwrap();
        assert!(text.all_pages_failed());
        assert_eq!(text.content(), "");
    }

    #[test]
    fn test_no_pages_is_not_a_failure() {
        let text = extract_pages(&FakePages(Vec::new()), &ParseContext::default()).unwrap();
        assert!(!text.all_pages_failed());
    }
}
