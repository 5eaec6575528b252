//! Shared data model for the format parsers
//!
//! Text is produced as ordered [`TextBlock`]s and metadata as typed
//! [`MetadataValue`]s. Nothing is stringified until [`MetadataRecord::to_wire`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;

/// Container formats the service understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Docx,
}

impl DocumentFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pdf => "PDF",
            Self::Docx => "DOCX",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structural origin of a text block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    Paragraph,
    /// A whole table, one line per row
    Table,
    Header,
    Footer,
    Page,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextBlock {
    pub provenance: Provenance,
    pub text: String,
    pub sequence_index: usize,
}

/// Ordered sink for text blocks that assigns sequence indices
#[derive(Debug, Default)]
pub struct BlockSink {
    blocks: Vec<TextBlock>,
}

impl BlockSink {
    pub fn push(&mut self, provenance: Provenance, text: impl Into<String>) {
        let sequence_index = self.blocks.len();
        self.blocks.push(TextBlock {
            provenance,
            text: text.into(),
            sequence_index,
        });
    }

    pub fn into_blocks(self) -> Vec<TextBlock> {
        self.blocks
    }
}

/// A metadata value in its native type
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    Text(String),
    Count(u64),
    Timestamp(DateTime<Utc>),
}

impl MetadataValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn count(value: usize) -> Self {
        Self::Count(value as u64)
    }

    /// Render for the wire contract
    pub fn to_wire_string(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Count(n) => n.to_string(),
            Self::Timestamp(ts) => ts.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

/// Flat, ordered metadata for one parse
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataRecord {
    entries: BTreeMap<String, MetadataValue>,
}

impl MetadataRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: MetadataValue) {
        self.entries.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        self.entries.get(key)
    }

    /// Stringify every value. This is the only place values become strings.
    pub fn to_wire(&self) -> BTreeMap<String, String> {
        self.entries
            .iter()
            .map(|(k, v)| (k.clone(), v.to_wire_string()))
            .collect()
    }
}

/// Result of a successful parse
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDocument {
    pub content: String,
    pub metadata: MetadataRecord,
}

/// Language of the block labels prefixed to tables, headers and footers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelLocale {
    #[default]
    Zh,
    En,
}

/// Block labels for one locale
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelSet {
    table: &'static str,
    header: &'static str,
    footer: &'static str,
}

impl LabelSet {
    pub const fn for_locale(locale: LabelLocale) -> Self {
        match locale {
            LabelLocale::Zh => Self {
                table: "表格",
                header: "页眉",
                footer: "页脚",
            },
            LabelLocale::En => Self {
                table: "Table",
                header: "Header",
                footer: "Footer",
            },
        }
    }

    /// `[表格 n]`, 1-based
    pub fn table(&self, index: usize) -> String {
        format!("[{} {}]", self.table, index)
    }

    pub fn header(&self, index: usize) -> String {
        format!("[{} {}]", self.header, index)
    }

    pub fn footer(&self, index: usize) -> String {
        format!("[{} {}]", self.footer, index)
    }
}

impl Default for LabelSet {
    fn default() -> Self {
        Self::for_locale(LabelLocale::default())
    }
}

/// Per-request options threaded through extraction
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseContext {
    pub labels: LabelSet,
    /// Extraction stops with `DeadlineExceeded` once this instant passes
    pub deadline: Option<Instant>,
}

impl ParseContext {
    pub fn with_labels(mut self, labels: LabelSet) -> Self {
        self.labels = labels;
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn deadline_passed(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}
