//! PDF structural pass: document information, images and tables.
//!
//! Runs on its own load of the file, separate from the text pass. Nothing
//! here can fail a parse; problems degrade to missing or zero entries.

use super::tables::{cells_from_operations, TableDetector};
use crate::types::{MetadataRecord, MetadataValue};
use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::fs::File;
use std::io::BufReader;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use tracing::{debug, warn};

/// Info dictionary entries and their metadata keys
const INFO_KEYS: [(&[u8], &str); 7] = [
    (b"Title", "title"),
    (b"Author", "author"),
    (b"Subject", "subject"),
    (b"Creator", "creator"),
    (b"Producer", "producer"),
    (b"CreationDate", "creation_date"),
    (b"ModDate", "modification_date"),
];

/// Guards against reference cycles in malformed files
const MAX_DEREF: usize = 16;

/// Open `path` again and collect structural metadata.
///
/// Returns an empty record when the file cannot be loaded.
pub fn collect_structure(path: &Path) -> MetadataRecord {
    let doc = match File::open(path)
        .map_err(|e| e.to_string())
        .and_then(|f| Document::load_from(BufReader::new(f)).map_err(|e| e.to_string()))
    {
        Ok(doc) => doc,
        Err(e) => {
            warn!(path = %path.display(), "Structural pass could not load PDF: {e}");
            return MetadataRecord::new();
        }
    };
    guard_structure(|| structure_of(&doc))
}

/// Run a structural pass, yielding an empty record if it panics.
///
/// Content streams that panicked the text pass are decoded again here.
pub fn guard_structure<F: FnOnce() -> MetadataRecord>(pass: F) -> MetadataRecord {
    match catch_unwind(AssertUnwindSafe(pass)) {
        Ok(record) => record,
        Err(_) => {
            warn!("Structural pass panicked; omitting structural metadata");
            MetadataRecord::new()
        }
    }
}

pub fn structure_of(doc: &Document) -> MetadataRecord {
    let mut record = MetadataRecord::new();

    match info_dictionary(doc) {
        Some(info) => {
            for (name, key) in INFO_KEYS {
                let value = info
                    .get(name)
                    .ok()
                    .and_then(|obj| resolve(doc, obj))
                    .and_then(|obj| match obj {
                        Object::String(bytes, _) => Some(decode_text_string(bytes)),
                        _ => None,
                    });
                record.insert(key, info_value(key, value));
            }
        }
        None => debug!("PDF has no Info dictionary"),
    }

    let detector = TableDetector::default();
    let mut image_count = 0;
    let mut table_count = 0;
    for (page, page_id) in doc.get_pages() {
        image_count += page_image_count(doc, page_id);
        match doc.get_and_decode_page_content(page_id) {
            Ok(content) => {
                let cells = cells_from_operations(&content.operations);
                table_count += detector.count_tables(&cells);
            }
            Err(e) => debug!(page, "Cannot decode page content for table detection: {e}"),
        }
    }
    record.insert("image_count", MetadataValue::count(image_count));
    record.insert("table_count", MetadataValue::count(table_count));

    record
}

/// Dates become timestamps when they parse; other entries stay text
fn info_value(key: &str, value: Option<String>) -> MetadataValue {
    let value = value.unwrap_or_default();
    if key.ends_with("_date") {
        if let Some(ts) = parse_pdf_date(&value) {
            return MetadataValue::Timestamp(ts);
        }
    }
    MetadataValue::Text(value)
}

fn resolve<'a>(doc: &'a Document, mut obj: &'a Object) -> Option<&'a Object> {
    for _ in 0..MAX_DEREF {
        match obj {
            Object::Reference(id) => obj = doc.get_object(*id).ok()?,
            other => return Some(other),
        }
    }
    None
}

fn resolve_dict<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Dictionary> {
    match resolve(doc, obj)? {
        Object::Dictionary(dict) => Some(dict),
        Object::Stream(stream) => Some(&stream.dict),
        _ => None,
    }
}

fn info_dictionary(doc: &Document) -> Option<&Dictionary> {
    let info = doc.trailer.get(b"Info").ok()?;
    resolve_dict(doc, info)
}

/// Image XObjects in the page's resources, inherited through `Parent`
fn page_image_count(doc: &Document, page_id: ObjectId) -> usize {
    let Some(resources) = page_resources(doc, page_id) else {
        return 0;
    };
    let Some(xobjects) = resources
        .get(b"XObject")
        .ok()
        .and_then(|obj| resolve_dict(doc, obj))
    else {
        return 0;
    };
    xobjects
        .iter()
        .filter_map(|(_, obj)| match resolve(doc, obj) {
            Some(Object::Stream(stream)) => Some(stream),
            _ => None,
        })
        .filter(|stream| {
            matches!(stream.dict.get(b"Subtype"), Ok(Object::Name(name)) if name.as_slice() == b"Image")
        })
        .count()
}

fn page_resources(doc: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    let mut node = doc.get_object(page_id).ok().and_then(|obj| resolve_dict(doc, obj))?;
    for _ in 0..MAX_DEREF {
        if let Some(resources) = node.get(b"Resources").ok().and_then(|obj| resolve_dict(doc, obj)) {
            return Some(resources);
        }
        node = node.get(b"Parent").ok().and_then(|obj| resolve_dict(doc, obj))?;
    }
    None
}

/// Decode a PDF text string: UTF-16BE with BOM, then UTF-8, then Latin-1
pub fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| char::from(b)).collect(),
    }
}

/// Parse a PDF date string such as `D:20240115103000+08'00'`.
///
/// Missing trailing fields default to their minimum; a missing zone is UTC.
/// A field cut short, such as a one-digit month, fails the whole date.
pub fn parse_pdf_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    let s = s.strip_prefix("D:").unwrap_or(s);
    let digits = s.bytes().take_while(u8::is_ascii_digit).count();
    if digits < 4 {
        return None;
    }
    let (stamp, zone) = s.split_at(digits);
    // an absent field takes its default, a truncated one rejects the date
    let field = |start: usize, len: usize, default: u32| -> Option<u32> {
        if start >= stamp.len() {
            return Some(default);
        }
        stamp.get(start..start + len)?.parse().ok()
    };
    let year: i32 = stamp.get(0..4)?.parse().ok()?;
    let month = field(4, 2, 1)?;
    let day = field(6, 2, 1)?;
    let hour = field(8, 2, 0)?;
    let minute = field(10, 2, 0)?;
    let second = field(12, 2, 0)?;
    let naive = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, second)?;

    let offset = parse_zone(zone)?;
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

/// `Z`, empty, or `+HH'mm'` / `-HH'mm` / `+HH`
fn parse_zone(zone: &str) -> Option<FixedOffset> {
    let mut chars = zone.chars();
    let sign = match chars.next() {
        None | Some('Z') => return FixedOffset::east_opt(0),
        Some('+') => 1,
        Some('-') => -1,
        Some(_) => return None,
    };
    let rest: Vec<&str> = chars
        .as_str()
        .split('\'')
        .filter(|p| !p.is_empty())
        .collect();
    let hours: i32 = rest.first()?.parse().ok()?;
    let minutes: i32 = rest.get(1).map_or(Ok(0), |m| m.parse::<i32>()).ok()?;
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}
