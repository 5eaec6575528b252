//! DOCX metadata.
//!
//! Counts reflect raw structure: blank paragraphs count toward
//! `paragraph_count` even though they contribute no text. Core properties are
//! always present, as `""` when the package does not set them.

use super::model::{DocxDocument, Paragraph};
use crate::types::{MetadataRecord, MetadataValue};

pub fn collect_metadata(doc: &DocxDocument) -> MetadataRecord {
    let mut record = MetadataRecord::new();

    record.insert("paragraph_count", MetadataValue::count(doc.paragraphs().count()));
    record.insert("table_count", MetadataValue::count(doc.tables().count()));
    record.insert("section_count", MetadataValue::count(doc.sections.len()));
    record.insert(
        "image_count",
        MetadataValue::count(doc.relationships.iter().filter(|r| r.is_image()).count()),
    );
    record.insert("hyperlink_count", MetadataValue::count(hyperlink_count(doc)));

    let core = &doc.core;
    let text = |value: &Option<String>| MetadataValue::text(value.clone().unwrap_or_default());
    record.insert("title", text(&core.title));
    record.insert("author", text(&core.author));
    record.insert("subject", text(&core.subject));
    record.insert("keywords", text(&core.keywords));
    record.insert("comments", text(&core.comments));
    record.insert("language", text(&core.language));
    record.insert("category", text(&core.category));
    record.insert("last_modified_by", text(&core.last_modified_by));
    record.insert("version", text(&core.version));
    record.insert(
        "created",
        core.created
            .map_or_else(|| MetadataValue::text(""), MetadataValue::Timestamp),
    );
    record.insert(
        "modified",
        core.modified
            .map_or_else(|| MetadataValue::text(""), MetadataValue::Timestamp),
    );
    record.insert(
        "revision",
        core.revision
            .map_or_else(|| MetadataValue::text(""), MetadataValue::Count),
    );

    record
}

/// Runs inside a populated hyperlink, over body and table-cell paragraphs
fn hyperlink_count(doc: &DocxDocument) -> usize {
    let count = |p: &Paragraph| p.runs.iter().filter(|r| r.hyperlink).count();
    let body: usize = doc.paragraphs().map(count).sum();
    let cells: usize = doc.tables().flat_map(|t| t.paragraphs()).map(count).sum();
    body + cells
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::model::{
        BodyItem, CoreProperties, Relationship, Run, Section, Table, TableCell, TableRow,
    };
    use chrono::{TimeZone, Utc};

    fn link_para(links: usize, plain: usize) -> Paragraph {
        let mut runs = Vec::new();
        for _ in 0..links {
            runs.push(Run {
                text: "l".to_string(),
                hyperlink: true,
            });
        }
        for _ in 0..plain {
            runs.push(Run::default());
        }
        Paragraph { runs }
    }

    #[test]
    fn test_counts() {
        let doc = DocxDocument {
            body: vec![
                BodyItem::Paragraph(link_para(2, 1)),
                BodyItem::Paragraph(Paragraph::default()),
                BodyItem::Table(Table {
                    rows: vec![TableRow {
                        cells: vec![TableCell {
                            paragraphs: vec![link_para(1, 0)],
                            ..TableCell::default()
                        }],
                    }],
                }),
            ],
            sections: vec![Section::default(), Section::default()],
            relationships: vec![
                Relationship {
                    id: "rId1".into(),
                    rel_type: "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image".into(),
                    target: "media/a.png".into(),
                },
                Relationship {
                    id: "rId2".into(),
                    rel_type: "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles".into(),
                    target: "styles.xml".into(),
                },
            ],
            ..DocxDocument::default()
        };

        let wire = collect_metadata(&doc).to_wire();
        assert_eq!(wire["paragraph_count"], "2");
        assert_eq!(wire["table_count"], "1");
        assert_eq!(wire["section_count"], "2");
        assert_eq!(wire["image_count"], "1");
        assert_eq!(wire["hyperlink_count"], "3");
    }

    #[test]
    fn test_core_properties_default_to_empty() {
        let wire = collect_metadata(&DocxDocument::default()).to_wire();
        for key in [
            "title",
            "author",
            "subject",
            "keywords",
            "comments",
            "language",
            "category",
            "last_modified_by",
            "version",
            "created",
            "modified",
            "revision",
        ] {
            assert_eq!(wire.get(key).map(String::as_str), Some(""), "{key}");
        }
    }

    #[test]
    fn test_core_properties_keep_native_types() {
        let doc = DocxDocument {
            core: CoreProperties {
                title: Some("Plan".into()),
                created: Some(Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap()),
                revision: Some(7),
                ..CoreProperties::default()
            },
            ..DocxDocument::default()
        };
        let record = collect_metadata(&doc);
        assert!(matches!(record.get("created"), Some(MetadataValue::Timestamp(_))));
        assert_eq!(record.get("revision"), Some(&MetadataValue::Count(7)));

        let wire = record.to_wire();
        assert_eq!(wire["title"], "Plan");
        assert_eq!(wire["created"], "2024-01-15 10:30:00");
        assert_eq!(wire["revision"], "7");
    }
}
