//! Fixture builders shared by the integration tests
#![allow(dead_code)]

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const W_NS: &str = r#"xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships""#;
pub const REL_IMAGE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";
pub const REL_HEADER: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/header";
pub const REL_FOOTER: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/footer";
pub const REL_HYPERLINK: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink";

pub fn paragraph(text: &str) -> String {
    if text.is_empty() {
        return "<w:p/>".to_string();
    }
    format!(r#"<w:p><w:r><w:t xml:space="preserve">{text}</w:t></w:r></w:p>"#)
}

pub fn table(rows: &[&[&str]]) -> String {
    let mut xml = String::from("<w:tbl>");
    for row in rows {
        xml.push_str("<w:tr>");
        for cell in *row {
            xml.push_str("<w:tc>");
            xml.push_str(&paragraph(cell));
            xml.push_str("</w:tc>");
        }
        xml.push_str("</w:tr>");
    }
    xml.push_str("</w:tbl>");
    xml
}

pub fn section(header: Option<&str>, footer: Option<&str>) -> String {
    let mut xml = String::from("<w:sectPr>");
    if let Some(id) = header {
        xml.push_str(&format!(r#"<w:headerReference w:type="default" r:id="{id}"/>"#));
    }
    if let Some(id) = footer {
        xml.push_str(&format!(r#"<w:footerReference w:type="default" r:id="{id}"/>"#));
    }
    xml.push_str("</w:sectPr>");
    xml
}

/// A paragraph that closes a section
pub fn section_break(header: Option<&str>, footer: Option<&str>) -> String {
    format!("<w:p><w:pPr>{}</w:pPr></w:p>", section(header, footer))
}

pub fn header_part(paragraphs: &[&str]) -> String {
    let body: String = paragraphs.iter().map(|p| paragraph(p)).collect();
    format!("<w:hdr {W_NS}>{body}</w:hdr>")
}

pub fn footer_part(paragraphs: &[&str]) -> String {
    let body: String = paragraphs.iter().map(|p| paragraph(p)).collect();
    format!("<w:ftr {W_NS}>{body}</w:ftr>")
}

pub fn core_xml(props: &[(&str, &str)]) -> String {
    let body: String = props
        .iter()
        .map(|(tag, value)| format!("<{tag}>{value}</{tag}>"))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">{body}</cp:coreProperties>"#
    )
}

/// Assembles a DOCX package from raw part XML
#[derive(Debug, Default)]
pub struct DocxBuilder {
    body: String,
    rels: Vec<(String, String, String)>,
    parts: Vec<(String, String)>,
}

impl DocxBuilder {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            ..Self::default()
        }
    }

    pub fn relationship(mut self, id: &str, rel_type: &str, target: &str) -> Self {
        self.rels
            .push((id.to_string(), rel_type.to_string(), target.to_string()));
        self
    }

    pub fn part(mut self, name: &str, xml: impl Into<String>) -> Self {
        self.parts.push((name.to_string(), xml.into()));
        self
    }

    pub fn write(&self, path: &Path) {
        let mut zip = ZipWriter::new(File::create(path).unwrap());
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

        zip.start_file("[Content_Types].xml", options).unwrap();
        zip.write_all(br#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"/>"#)
            .unwrap();

        zip.start_file("word/document.xml", options).unwrap();
        let document = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document {W_NS}><w:body>{}</w:body></w:document>"#,
            self.body
        );
        zip.write_all(document.as_bytes()).unwrap();

        if !self.rels.is_empty() {
            let entries: String = self
                .rels
                .iter()
                .map(|(id, ty, target)| {
                    format!(r#"<Relationship Id="{id}" Type="{ty}" Target="{target}"/>"#)
                })
                .collect();
            zip.start_file("word/_rels/document.xml.rels", options)
                .unwrap();
            zip.write_all(
                format!(r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{entries}</Relationships>"#)
                    .as_bytes(),
            )
            .unwrap();
        }

        for (name, xml) in &self.parts {
            zip.start_file(name.as_str(), options).unwrap();
            zip.write_all(xml.as_bytes()).unwrap();
        }

        zip.finish().unwrap();
    }
}

/// One page of a generated PDF
#[derive(Debug, Clone, Default)]
pub struct PdfPage {
    /// Lines drawn one below the other
    pub lines: Vec<String>,
    /// Cells drawn at explicit (x, y) positions
    pub cells: Vec<(String, i32, i32)>,
}

impl PdfPage {
    pub fn text(text: &str) -> Self {
        Self {
            lines: vec![text.to_string()],
            cells: Vec::new(),
        }
    }

    /// A `rows` x `cols` grid of cells, 100pt apart horizontally
    pub fn grid(rows: usize, cols: usize) -> Self {
        let mut cells = Vec::new();
        for r in 0..rows {
            for c in 0..cols {
                cells.push((
                    format!("R{r}C{c}"),
                    72 + 100 * c as i32,
                    700 - 20 * r as i32,
                ));
            }
        }
        Self {
            lines: Vec::new(),
            cells,
        }
    }

    fn operations(&self) -> Vec<Operation> {
        let mut ops = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("TL", vec![14.into()]),
            Operation::new("Td", vec![72.into(), 760.into()]),
        ];
        for line in &self.lines {
            ops.push(Operation::new("Tj", vec![Object::string_literal(line.as_str())]));
            ops.push(Operation::new("T*", vec![]));
        }
        for (text, x, y) in &self.cells {
            ops.push(Operation::new(
                "Tm",
                vec![
                    1.into(),
                    0.into(),
                    0.into(),
                    1.into(),
                    (*x).into(),
                    (*y).into(),
                ],
            ));
            ops.push(Operation::new("Tj", vec![Object::string_literal(text.as_str())]));
        }
        ops.push(Operation::new("ET", vec![]));
        ops
    }
}

/// Options for [`write_pdf`]
#[derive(Debug, Clone, Default)]
pub struct PdfFixture {
    pub pages: Vec<PdfPage>,
    /// Info dictionary entries; `None` writes no Info dictionary
    pub info: Option<Vec<(&'static str, &'static str)>>,
    /// Add one image XObject to the shared page resources
    pub with_image: bool,
}

pub fn write_pdf(path: &Path, fixture: &PdfFixture) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });

    let mut resources = dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    };
    if fixture.with_image {
        let image_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => 1,
                "Height" => 1,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            vec![0u8],
        ));
        resources.set(
            "XObject",
            dictionary! {
                "Im1" => image_id,
            },
        );
    }
    let resources_id = doc.add_object(resources);

    let mut kids: Vec<Object> = Vec::new();
    for page in &fixture.pages {
        let content = Content {
            operations: page.operations(),
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let page_count = kids.len() as i64;
    let media_box: Vec<Object> = vec![0.into(), 0.into(), 595.into(), 842.into()];
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => page_count,
        "Resources" => resources_id,
        "MediaBox" => media_box,
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    if let Some(entries) = &fixture.info {
        let mut info = lopdf::Dictionary::new();
        for (key, value) in entries {
            info.set(*key, Object::string_literal(*value));
        }
        let info_id = doc.add_object(info);
        doc.trailer.set("Info", info_id);
    }

    doc.save(path).unwrap();
}
