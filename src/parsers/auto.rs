//! Auto parser: dispatches by (1) filename extension, then (2) content
//! magic bytes, with plain text as the last-resort fallback. Unknown
//! content falls back to text silently rather than raising — callers
//! that want strict typing should select a concrete parser instead of
//! `auto`.

use super::{CsvParser, DocxParser, HtmlParser, MarkdownParser, ParsedDocument, Parser, TextParser};
use crate::error::Result;
use async_trait::async_trait;

/// Dispatches to a concrete parser by extension, then magic bytes.
#[derive(Debug, Default)]
pub struct AutoParser;

impl AutoParser {
    /// Create a new auto parser.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn by_extension(filename: &str) -> Option<&'static str> {
        let lower = filename.to_ascii_lowercase();
        if lower.ends_with(".md") || lower.ends_with(".markdown") {
            Some("markdown")
        } else if lower.ends_with(".htm") || lower.ends_with(".html") {
            Some("html")
        } else if lower.ends_with(".csv") || lower.ends_with(".tsv") {
            Some("csv")
        } else if lower.ends_with(".pdf") {
            Some("pdf")
        } else if lower.ends_with(".docx") {
            Some("docx")
        } else if lower.ends_with(".txt") {
            Some("text")
        } else {
            None
        }
    }

    fn by_magic_bytes(bytes: &[u8]) -> &'static str {
        if bytes.starts_with(b"%PDF") {
            return "pdf";
        }
        if bytes.starts_with(&[0x50, 0x4b, 0x03, 0x04]) {
            // A ZIP container; DOCX packages carry `word/` at the root.
            if Self::zip_contains_word_dir(bytes) {
                return "docx";
            }
        }
        let prefix = String::from_utf8_lossy(&bytes[..bytes.len().min(512)]);
        let trimmed = prefix.trim_start();
        if trimmed.to_ascii_lowercase().starts_with("<!doctype html")
            || trimmed.to_ascii_lowercase().starts_with("<html")
        {
            return "html";
        }
        if trimmed.starts_with('#') {
            return "markdown";
        }
        "text"
    }

    fn zip_contains_word_dir(bytes: &[u8]) -> bool {
        // Cheap heuristic without a full zip parse: the local file header
        // entries carry the file name right after the header; `word/` is
        // a short, constant byte sequence that appears near the start of
        // a genuine DOCX package.
        let needle = b"word/";
        bytes
            .windows(needle.len())
            .take(4096)
            .any(|w| w == needle)
    }
}

#[async_trait]
impl Parser for AutoParser {
    async fn parse(&self, bytes: &[u8], filename: &str) -> Result<ParsedDocument> {
        let kind = Self::by_extension(filename)
            .map(ToString::to_string)
            .unwrap_or_else(|| Self::by_magic_bytes(bytes).to_string());

        match kind.as_str() {
            "markdown" => MarkdownParser::default().parse(bytes, filename).await,
            "html" => HtmlParser::default().parse(bytes, filename).await,
            "csv" => CsvParser::default().parse(bytes, filename).await,
            "pdf" => super::PdfParser::default().parse(bytes, filename).await,
            "docx" => DocxParser::default().parse(bytes, filename).await,
            _ => TextParser.parse(bytes, filename).await,
        }
    }

    fn name(&self) -> &'static str {
        "auto"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dispatches_by_extension() {
        let parsed = AutoParser::new().parse(b"# Title", "readme.md").await.unwrap();
        assert_eq!(parsed.content, "# Title\n");
    }

    #[tokio::test]
    async fn dispatches_by_magic_bytes_when_extension_unknown() {
        let parsed = AutoParser::new()
            .parse(b"<!DOCTYPE html><p>hi</p>", "upload.bin")
            .await
            .unwrap();
        assert!(parsed.content.contains("hi"));
    }

    #[tokio::test]
    async fn falls_back_to_text() {
        let parsed = AutoParser::new()
            .parse(b"just some plain bytes", "upload.bin")
            .await
            .unwrap();
        assert_eq!(parsed.content, "just some plain bytes");
    }
}
