//! DOCX text blocks.
//!
//! Body paragraphs and tables come first, in document order. Header and
//! footer lines follow, section by section.

use super::model::{BodyItem, DocxDocument, Paragraph, Table};
use crate::error::{ParseError, Result};
use crate::types::{BlockSink, DocumentFormat, LabelSet, ParseContext, Provenance, TextBlock};
use tracing::debug;

pub fn extract_blocks(doc: &DocxDocument, ctx: &ParseContext) -> Result<Vec<TextBlock>> {
    let mut sink = BlockSink::default();
    let mut table_index = 0;

    for item in &doc.body {
        if ctx.deadline_passed() {
            return Err(ParseError::DeadlineExceeded {
                format: DocumentFormat::Docx,
            });
        }
        match item {
            BodyItem::Paragraph(p) => {
                if !p.is_blank() {
                    sink.push(Provenance::Paragraph, p.text());
                }
            }
            BodyItem::Table(table) => {
                // the index counts every table, rendered or not
                table_index += 1;
                let rows = render_table(table);
                if rows.is_empty() {
                    debug!(table_index, "Skipping table without rows");
                    continue;
                }
                sink.push(
                    Provenance::Table,
                    format!("{}\n{}", ctx.labels.table(table_index), rows),
                );
            }
        }
    }

    for section in &doc.sections {
        push_labeled(&mut sink, Provenance::Header, &section.header, &ctx.labels);
        push_labeled(&mut sink, Provenance::Footer, &section.footer, &ctx.labels);
    }

    Ok(sink.into_blocks())
}

/// Label numbers count every paragraph of the part, blank ones included.
fn push_labeled(
    sink: &mut BlockSink,
    provenance: Provenance,
    paragraphs: &[Paragraph],
    labels: &LabelSet,
) {
    for (i, p) in paragraphs.iter().enumerate() {
        if p.is_blank() {
            continue;
        }
        let label = match provenance {
            Provenance::Footer => labels.footer(i + 1),
            _ => labels.header(i + 1),
        };
        sink.push(provenance, format!("{label} {}", p.text()));
    }
}

/// One line per row, cells joined by ` | `
pub fn render_table(table: &Table) -> String {
    table
        .grid()
        .iter()
        .filter(|row| !row.is_empty())
        .map(|row| row.join(" | "))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn join_blocks(blocks: &[TextBlock]) -> String {
    blocks
        .iter()
        .map(|b| b.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}
