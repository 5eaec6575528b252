//! Request-local object model of a DOCX package.

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Run {
    pub text: String,
    /// Run sits inside a `w:hyperlink` with a non-empty `r:id` or `w:anchor`
    pub hyperlink: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Paragraph {
    pub runs: Vec<Run>,
}

impl Paragraph {
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }

    pub fn is_blank(&self) -> bool {
        self.runs.iter().all(|r| r.text.trim().is_empty())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VMerge {
    #[default]
    None,
    Restart,
    Continue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableCell {
    pub paragraphs: Vec<Paragraph>,
    pub grid_span: usize,
    pub v_merge: VMerge,
}

impl Default for TableCell {
    fn default() -> Self {
        Self {
            paragraphs: Vec::new(),
            grid_span: 1,
            v_merge: VMerge::None,
        }
    }
}

impl TableCell {
    /// Direct paragraphs joined by newline, trimmed
    pub fn text(&self) -> String {
        self.paragraphs
            .iter()
            .map(Paragraph::text)
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableRow {
    pub cells: Vec<TableCell>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub rows: Vec<TableRow>,
}

impl Table {
    /// Cell texts per row with merges expanded.
    ///
    /// A cell spanning `n` grid columns appears `n` times. A vertically
    /// continued cell takes the text of the cell above it in the same grid
    /// column.
    pub fn grid(&self) -> Vec<Vec<String>> {
        let mut grid: Vec<Vec<String>> = Vec::with_capacity(self.rows.len());
        for row in &self.rows {
            let mut line = Vec::new();
            for cell in &row.cells {
                let col = line.len();
                let text = match cell.v_merge {
                    VMerge::Continue => grid
                        .last()
                        .and_then(|above| above.get(col))
                        .cloned()
                        .unwrap_or_default(),
                    VMerge::None | VMerge::Restart => cell.text(),
                };
                for _ in 0..cell.grid_span.max(1) {
                    line.push(text.clone());
                }
            }
            grid.push(line);
        }
        grid
    }

    pub fn paragraphs(&self) -> impl Iterator<Item = &Paragraph> {
        self.rows
            .iter()
            .flat_map(|r| r.cells.iter())
            .flat_map(|c| c.paragraphs.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyItem {
    Paragraph(Paragraph),
    Table(Table),
}

/// Default header and footer paragraphs of one section, after inheritance
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Section {
    pub header: Vec<Paragraph>,
    pub footer: Vec<Paragraph>,
}

/// `docProps/core.xml`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoreProperties {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub keywords: Option<String>,
    pub comments: Option<String>,
    pub language: Option<String>,
    pub category: Option<String>,
    pub last_modified_by: Option<String>,
    pub version: Option<String>,
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
    pub revision: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
}

impl Relationship {
    pub fn is_image(&self) -> bool {
        self.rel_type.ends_with("/image")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocxDocument {
    pub body: Vec<BodyItem>,
    pub sections: Vec<Section>,
    pub core: CoreProperties,
    pub relationships: Vec<Relationship>,
}

impl DocxDocument {
    pub fn paragraphs(&self) -> impl Iterator<Item = &Paragraph> {
        self.body.iter().filter_map(|item| match item {
            BodyItem::Paragraph(p) => Some(p),
            BodyItem::Table(_) => None,
        })
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.body.iter().filter_map(|item| match item {
            BodyItem::Table(t) => Some(t),
            BodyItem::Paragraph(_) => None,
        })
    }
}
