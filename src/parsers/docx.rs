//! DOCX parser: unzips the package, collects paragraph text from
//! `word/document.xml`, and optionally flattens tables to pipe-joined
//! lines. A DOCX is a ZIP of XML parts; we use the same `zip` dependency
//! the rest of the pack reaches for, plus a conservative tag-stripping
//! pass (no full XML/DOM dependency needed for flat paragraph text).

use super::{ParsedDocument, Parser, ParserConfig};
use crate::error::{PipelineError, Result};
use async_trait::async_trait;
use std::io::{Cursor, Read};

/// DOCX parser.
#[derive(Debug, Default)]
pub struct DocxParser {
    config: ParserConfig,
}

impl DocxParser {
    /// Create a parser with the given config.
    #[must_use]
    pub const fn new(config: ParserConfig) -> Self {
        Self { config }
    }

    /// Extract text runs from `word/document.xml`, joining `<w:t>` run
    /// contents and inserting paragraph breaks at `</w:p>`. Tables
    /// (`<w:tbl>`) are flattened to pipe-joined lines when requested,
    /// otherwise their cell text is still emitted inline as prose.
    fn extract_body_text(xml: &str, flatten_tables: bool) -> String {
        let mut out = String::new();
        let mut chars = xml.char_indices().peekable();
        let mut in_tag = false;
        let mut tag_buf = String::new();
        let mut in_table_row = false;
        let mut row_cells: Vec<String> = Vec::new();
        let mut cell_buf = String::new();

        while let Some((_, ch)) = chars.next() {
            if ch == '<' {
                in_tag = true;
                tag_buf.clear();
                continue;
            }
            if ch == '>' {
                in_tag = false;
                if tag_buf.starts_with("w:p ") || tag_buf == "w:p" {
                    // paragraph start: nothing to do
                } else if tag_buf == "/w:p" {
                    if in_table_row {
                        row_cells.push(std::mem::take(&mut cell_buf));
                    } else {
                        out.push('\n');
                    }
                } else if tag_buf.starts_with("w:tr") {
                    in_table_row = true;
                    row_cells.clear();
                } else if tag_buf == "/w:tr" {
                    if !row_cells.is_empty() {
                        row_cells.push(std::mem::take(&mut cell_buf));
                        if flatten_tables {
                            out.push_str(&row_cells.join(" | "));
                        } else {
                            out.push_str(&row_cells.join(" "));
                        }
                        out.push('\n');
                    }
                    in_table_row = false;
                }
                tag_buf.clear();
                continue;
            }
            if in_tag {
                tag_buf.push(ch);
                continue;
            }
            if in_table_row {
                cell_buf.push(ch);
            } else {
                out.push(ch);
            }
        }
        out
    }
}

#[async_trait]
impl Parser for DocxParser {
    async fn parse(&self, bytes: &[u8], _filename: &str) -> Result<ParsedDocument> {
        let reader = Cursor::new(bytes);
        let mut archive = zip::ZipArchive::new(reader)
            .map_err(|e| PipelineError::validation(format!("not a valid DOCX package: {e}")))?;

        let mut document_xml = String::new();
        {
            let mut entry = archive.by_name("word/document.xml").map_err(|_| {
                PipelineError::validation("DOCX missing word/document.xml".to_string())
            })?;
            entry
                .read_to_string(&mut document_xml)
                .map_err(|e| PipelineError::validation(format!("failed to read document.xml: {e}")))?;
        }

        let flatten_tables = self.config.flatten_tables.unwrap_or(false);
        let content = Self::extract_body_text(&document_xml, flatten_tables);

        let mut metadata = std::collections::HashMap::new();
        metadata.insert(
            "paragraph_count".to_string(),
            serde_json::Value::Number(content.lines().count().into()),
        );

        Ok(ParsedDocument {
            content,
            metadata,
            pages: None,
            tables: None,
            images: None,
        })
    }

    fn name(&self) -> &'static str {
        "docx"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_paragraphs_and_joins_table_cells() {
        let xml = r#"<w:p><w:r><w:t>Hello</w:t></w:r></w:p><w:tbl><w:tr><w:r><w:t>A1</w:t></w:r><w:r><w:t>A2</w:t></w:r></w:tr></w:tbl>"#;
        let text = DocxParser::extract_body_text(xml, true);
        assert!(text.contains("Hello"));
        assert!(text.contains("A1"));
        assert!(text.contains("A2"));
    }

    #[tokio::test]
    async fn rejects_non_zip_bytes() {
        let err = DocxParser::default().parse(b"not a docx", "a.docx").await;
        assert!(err.is_err());
    }
}
