//! Reads a DOCX package into a [`DocxDocument`].
//!
//! The package is opened once; `word/document.xml`, the document
//! relationships, the default header/footer parts and `docProps/core.xml` are
//! each parsed with quick-xml. Only the body is required. Every other part
//! degrades to empty when missing or unreadable.

use super::model::{
    BodyItem, CoreProperties, DocxDocument, Paragraph, Relationship, Run, Section, Table,
    TableCell, TableRow, VMerge,
};
use crate::error::{ParseError, Result};
use crate::types::DocumentFormat;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::io::{Read, Seek};
use tracing::{debug, warn};
use zip::result::ZipError;
use zip::ZipArchive;

const DOCUMENT_PART: &str = "word/document.xml";
const RELS_PART: &str = "word/_rels/document.xml.rels";
const CORE_PART: &str = "docProps/core.xml";

fn malformed(reason: impl Into<String>) -> ParseError {
    ParseError::malformed(DocumentFormat::Docx, reason)
}

/// Read a whole package.
pub fn read_docx<R: Read + Seek>(source: R) -> Result<DocxDocument> {
    let mut archive =
        ZipArchive::new(source).map_err(|e| malformed(format!("not a zip package: {e}")))?;

    let xml = read_part(&mut archive, DOCUMENT_PART)?
        .ok_or_else(|| malformed(format!("missing {DOCUMENT_PART}")))?;
    let walker = walk_part(&xml).map_err(|e| malformed(format!("{DOCUMENT_PART}: {e}")))?;
    debug!(
        body_items = walker.body.len(),
        sections = walker.sections.len(),
        "Parsed document body"
    );

    let relationships = match read_part(&mut archive, RELS_PART) {
        Ok(Some(xml)) => parse_relationships(&xml),
        Ok(None) => Vec::new(),
        Err(e) => {
            warn!("Ignoring unreadable relationships part: {e}");
            Vec::new()
        }
    };

    let sections = resolve_sections(&mut archive, &relationships, walker.sections);

    let core = match read_part(&mut archive, CORE_PART) {
        Ok(Some(xml)) => parse_core_properties(&xml),
        Ok(None) => {
            debug!("No {CORE_PART}; using empty core properties");
            CoreProperties::default()
        }
        Err(e) => {
            warn!("Ignoring unreadable core properties: {e}");
            CoreProperties::default()
        }
    };

    Ok(DocxDocument {
        body: walker.body,
        sections,
        core,
        relationships,
    })
}

/// Read a part as text. `Ok(None)` when the package has no such part.
fn read_part<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<Option<String>> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(malformed(format!("{name}: {e}"))),
    };
    let mut content = String::new();
    file.read_to_string(&mut content)
        .map_err(|e| malformed(format!("{name}: {e}")))?;
    if let Some(stripped) = content.strip_prefix('\u{feff}') {
        content = stripped.to_string();
    }
    Ok(Some(content))
}

/// Extract an attribute value by qualified name
#[inline]
fn get_attr(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .find(|a| a.as_ref().ok().map(|x| x.key.as_ref()) == Some(key))
        .and_then(std::result::Result::ok)
        .map(|attr| String::from_utf8_lossy(&attr.value).to_string())
}

#[derive(Debug, Default)]
struct SectionRefs {
    header: Option<String>,
    footer: Option<String>,
}

#[derive(Debug, Default)]
struct TableBuilder {
    table: Table,
    row: Option<TableRow>,
    cell: Option<TableCell>,
}

/// Event-driven walk over a `w:document`, `w:hdr` or `w:ftr` part.
#[derive(Debug, Default)]
struct PartWalker {
    body: Vec<BodyItem>,
    sections: Vec<SectionRefs>,
    tables: Vec<TableBuilder>,
    paragraph: Option<Paragraph>,
    hyperlinks: Vec<bool>,
    section: Option<SectionRefs>,
    in_run: bool,
    in_text: bool,
    textbox_depth: usize,
    /// Inside `w:sectPrChange`, which records superseded section properties
    section_change_depth: usize,
}

fn walk_part(xml: &str) -> std::result::Result<PartWalker, quick_xml::Error> {
    let mut walker = PartWalker::default();
    let mut reader = Reader::from_str(xml);
    // xml:space="preserve" runs carry meaningful whitespace
    reader.trim_text(false);

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => walker.handle_start(&e),
            Event::Empty(e) => walker.handle_empty(&e),
            Event::End(e) => walker.handle_end(e.name().as_ref()),
            Event::Text(e) => {
                if walker.wants_text() {
                    let text = e.unescape()?;
                    walker.push_text(&text);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(walker)
}

impl PartWalker {
    fn wants_text(&self) -> bool {
        self.in_text && !self.skipping()
    }

    /// Text boxes and tracked section-property changes contribute nothing
    fn skipping(&self) -> bool {
        self.textbox_depth > 0 || self.section_change_depth > 0
    }

    fn handle_start(&mut self, e: &BytesStart<'_>) {
        let name = e.name();
        if name.as_ref() == b"w:txbxContent" {
            self.textbox_depth += 1;
            return;
        }
        if name.as_ref() == b"w:sectPrChange" {
            self.section_change_depth += 1;
            return;
        }
        if self.skipping() {
            return;
        }
        match name.as_ref() {
            b"w:p" => self.paragraph = Some(Paragraph::default()),
            b"w:r" => self.start_run(),
            b"w:t" => self.in_text = true,
            b"w:hyperlink" => self.hyperlinks.push(is_populated_link(e)),
            b"w:tbl" => self.tables.push(TableBuilder::default()),
            b"w:tr" => {
                if let Some(t) = self.tables.last_mut() {
                    t.row = Some(TableRow::default());
                }
            }
            b"w:tc" => {
                if let Some(t) = self.tables.last_mut() {
                    t.cell = Some(TableCell::default());
                }
            }
            b"w:sectPr" => self.section = Some(SectionRefs::default()),
            _ => self.handle_leaf(e),
        }
    }

    fn handle_empty(&mut self, e: &BytesStart<'_>) {
        if self.skipping() {
            return;
        }
        match e.name().as_ref() {
            b"w:p" => {
                self.paragraph = Some(Paragraph::default());
                self.end_paragraph();
            }
            b"w:r" => {
                self.start_run();
                self.in_run = false;
            }
            b"w:tc" => {
                if let Some(t) = self.tables.last_mut() {
                    if let Some(row) = t.row.as_mut() {
                        row.cells.push(TableCell::default());
                    }
                }
            }
            b"w:sectPr" => self.sections.push(SectionRefs::default()),
            _ => self.handle_leaf(e),
        }
    }

    /// Elements whose meaning is carried by the tag and its attributes.
    fn handle_leaf(&mut self, e: &BytesStart<'_>) {
        match e.name().as_ref() {
            b"w:tab" | b"w:ptab" if self.in_run => self.push_text("\t"),
            b"w:br" if self.in_run => {
                // page and column breaks carry no text
                let kind = get_attr(e, b"w:type");
                if kind.as_deref().map_or(true, |k| k == "textWrapping") {
                    self.push_text("\n");
                }
            }
            b"w:cr" if self.in_run => self.push_text("\n"),
            b"w:noBreakHyphen" if self.in_run => self.push_text("-"),
            b"w:gridSpan" => {
                let span = get_attr(e, b"w:val").and_then(|v| v.parse::<usize>().ok());
                if let (Some(cell), Some(span)) = (self.current_cell(), span) {
                    cell.grid_span = span.max(1);
                }
            }
            b"w:vMerge" => {
                let restart = get_attr(e, b"w:val").as_deref() == Some("restart");
                if let Some(cell) = self.current_cell() {
                    cell.v_merge = if restart {
                        VMerge::Restart
                    } else {
                        VMerge::Continue
                    };
                }
            }
            b"w:headerReference" | b"w:footerReference" => {
                let is_default = get_attr(e, b"w:type").map_or(true, |t| t == "default");
                let id = get_attr(e, b"r:id").filter(|id| !id.is_empty());
                if let (true, Some(id), Some(section)) = (is_default, id, self.section.as_mut()) {
                    if e.name().as_ref() == b"w:headerReference" {
                        section.header = Some(id);
                    } else {
                        section.footer = Some(id);
                    }
                }
            }
            _ => {}
        }
    }

    fn handle_end(&mut self, name: &[u8]) {
        if name == b"w:txbxContent" {
            self.textbox_depth = self.textbox_depth.saturating_sub(1);
            return;
        }
        if name == b"w:sectPrChange" {
            self.section_change_depth = self.section_change_depth.saturating_sub(1);
            return;
        }
        if self.skipping() {
            return;
        }
        match name {
            b"w:p" => self.end_paragraph(),
            b"w:r" => self.in_run = false,
            b"w:t" => self.in_text = false,
            b"w:hyperlink" => {
                self.hyperlinks.pop();
            }
            b"w:tc" => {
                if let Some(t) = self.tables.last_mut() {
                    if let (Some(row), Some(cell)) = (t.row.as_mut(), t.cell.take()) {
                        row.cells.push(cell);
                    }
                }
            }
            b"w:tr" => {
                if let Some(t) = self.tables.last_mut() {
                    if let Some(row) = t.row.take() {
                        t.table.rows.push(row);
                    }
                }
            }
            b"w:tbl" => {
                // nested tables are dropped; only top-level tables reach the body
                if let Some(done) = self.tables.pop() {
                    if self.tables.is_empty() {
                        self.body.push(BodyItem::Table(done.table));
                    }
                }
            }
            b"w:sectPr" => {
                if let Some(section) = self.section.take() {
                    self.sections.push(section);
                }
            }
            _ => {}
        }
    }

    fn current_cell(&mut self) -> Option<&mut TableCell> {
        self.tables.last_mut().and_then(|t| t.cell.as_mut())
    }

    fn start_run(&mut self) {
        self.in_run = true;
        let hyperlink = self.hyperlinks.last().copied().unwrap_or(false);
        if let Some(p) = self.paragraph.as_mut() {
            p.runs.push(Run {
                text: String::new(),
                hyperlink,
            });
        }
    }

    fn push_text(&mut self, text: &str) {
        if let Some(run) = self.paragraph.as_mut().and_then(|p| p.runs.last_mut()) {
            run.text.push_str(text);
        }
    }

    fn end_paragraph(&mut self) {
        let Some(paragraph) = self.paragraph.take() else {
            return;
        };
        match self.tables.last_mut() {
            Some(t) => {
                if let Some(cell) = t.cell.as_mut() {
                    cell.paragraphs.push(paragraph);
                }
            }
            None => self.body.push(BodyItem::Paragraph(paragraph)),
        }
    }
}

fn is_populated_link(e: &BytesStart<'_>) -> bool {
    [b"r:id".as_slice(), b"w:anchor".as_slice()]
        .iter()
        .any(|key| get_attr(e, key).is_some_and(|v| !v.is_empty()))
}

/// Parse `word/_rels/document.xml.rels`
fn parse_relationships(xml: &str) -> Vec<Relationship> {
    let mut relationships = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(e) | Event::Start(e)) if e.name().as_ref() == b"Relationship" => {
                if let (Some(id), Some(target)) = (get_attr(&e, b"Id"), get_attr(&e, b"Target")) {
                    relationships.push(Relationship {
                        id,
                        rel_type: get_attr(&e, b"Type").unwrap_or_default(),
                        target,
                    });
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                warn!("Error parsing relationships, keeping {} entries: {e}", relationships.len());
                break;
            }
            _ => {}
        }
        buf.clear();
    }
    relationships
}

/// Resolve each section's default header and footer, inheriting from the
/// previous section when a section has no reference of its own.
fn resolve_sections<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    relationships: &[Relationship],
    refs: Vec<SectionRefs>,
) -> Vec<Section> {
    let mut sections = Vec::with_capacity(refs.len());
    let mut header = Vec::new();
    let mut footer = Vec::new();
    for section in refs {
        if let Some(id) = section.header {
            header = load_part_paragraphs(archive, relationships, &id);
        }
        if let Some(id) = section.footer {
            footer = load_part_paragraphs(archive, relationships, &id);
        }
        sections.push(Section {
            header: header.clone(),
            footer: footer.clone(),
        });
    }
    sections
}

/// Top-level paragraphs of the header or footer part behind `rel_id`.
fn load_part_paragraphs<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    relationships: &[Relationship],
    rel_id: &str,
) -> Vec<Paragraph> {
    let Some(rel) = relationships.iter().find(|r| r.id == rel_id) else {
        warn!("Section references unknown relationship {rel_id}");
        return Vec::new();
    };
    let name = part_name(&rel.target);
    let xml = match read_part(archive, &name) {
        Ok(Some(xml)) => xml,
        Ok(None) => {
            warn!("Missing header/footer part {name}");
            return Vec::new();
        }
        Err(e) => {
            warn!("Unreadable header/footer part: {e}");
            return Vec::new();
        }
    };
    match walk_part(&xml) {
        Ok(walker) => walker
            .body
            .into_iter()
            .filter_map(|item| match item {
                BodyItem::Paragraph(p) => Some(p),
                BodyItem::Table(_) => None,
            })
            .collect(),
        Err(e) => {
            warn!("Malformed header/footer part {name}: {e}");
            Vec::new()
        }
    }
}

/// Relationship targets are relative to `word/` unless absolute
fn part_name(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("word/{target}"),
    }
}

/// Parse `docProps/core.xml`. Unknown or empty elements are ignored.
fn parse_core_properties(xml: &str) -> CoreProperties {
    let mut props = CoreProperties::default();
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut current: Option<Vec<u8>> = None;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => current = Some(e.local_name().as_ref().to_vec()),
            Ok(Event::Text(e)) => {
                if let (Some(name), Ok(text)) = (current.as_deref(), e.unescape()) {
                    set_core_property(&mut props, name, text.trim());
                }
            }
            Ok(Event::End(_)) => current = None,
            Ok(Event::Eof) => break,
            Err(e) => {
                warn!("Error parsing core properties: {e}");
                break;
            }
            _ => {}
        }
        buf.clear();
    }
    props
}

fn set_core_property(props: &mut CoreProperties, local_name: &[u8], text: &str) {
    if text.is_empty() {
        return;
    }
    let value = Some(text.to_string());
    match local_name {
        b"title" => props.title = value,
        b"creator" => props.author = value,
        b"subject" => props.subject = value,
        b"keywords" => props.keywords = value,
        b"description" => props.comments = value,
        b"language" => props.language = value,
        b"category" => props.category = value,
        b"lastModifiedBy" => props.last_modified_by = value,
        b"version" => props.version = value,
        b"created" => props.created = parse_w3cdtf(text),
        b"modified" => props.modified = parse_w3cdtf(text),
        b"revision" => props.revision = text.parse::<u64>().ok().filter(|n| *n > 0),
        _ => {}
    }
}

/// Parse a W3CDTF timestamp
///
/// Office writes `2024-01-15T10:30:00Z`; zone-less and date-only forms are
/// taken as UTC.
pub(crate) fn parse_w3cdtf(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|n| n.and_utc())
}
