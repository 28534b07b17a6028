//! Parsers: convert bytes + filename into normalized text and sidecars.
//!
//! Implementations never fabricate content; a parser that cannot make
//! sense of its input returns `PipelineError::Validation` rather than
//! guessing. See [`auto`] for the dispatch-by-extension-then-magic-bytes
//! meta-parser.

mod auto;
mod csv;
mod docx;
mod html;
mod markdown;
mod pdf;
mod text;

pub use auto::AutoParser;
pub use csv::CsvParser;
pub use docx::DocxParser;
pub use html::HtmlParser;
pub use markdown::MarkdownParser;
pub use pdf::PdfParser;
pub use text::TextParser;

use crate::error::Result;
use crate::registry::{Category, ConfigSchema, Factory};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// A single extracted table, as a grid of string cells.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsedTable {
    /// Row-major cells.
    pub rows: Vec<Vec<String>>,
}

/// A page of extracted text (from a paginated source such as PDF).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedPage {
    /// 0-based page index.
    pub index: usize,
    /// Text extracted from this page.
    pub text: String,
}

/// Reference to an image found while parsing (no pixel data is kept).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedImageRef {
    /// Page or section index the image appeared in, if known.
    pub page: Option<usize>,
    /// Best-effort description (alt text, caption, or filename).
    pub description: Option<String>,
}

/// Output of a parser: normalized text plus structured sidecars.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsedDocument {
    /// Normalized plain text content.
    pub content: String,
    /// Parser-contributed metadata (e.g. detected delimiter, title).
    pub metadata: HashMap<String, Value>,
    /// Per-page text, when the source is paginated.
    pub pages: Option<Vec<ParsedPage>>,
    /// Extracted tables, when requested and present.
    pub tables: Option<Vec<ParsedTable>>,
    /// Image references, when requested and present.
    pub images: Option<Vec<ParsedImageRef>>,
}

impl ParsedDocument {
    /// Wrap plain text with no sidecars.
    #[must_use]
    pub fn from_text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }
}

/// Parser component contract: bytes + filename -> `ParsedDocument`.
#[async_trait]
pub trait Parser: Send + Sync {
    /// Parse `bytes` (whose original filename was `filename`) into a
    /// `ParsedDocument`.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Validation` if the bytes cannot be
    /// interpreted as this parser's format.
    async fn parse(&self, bytes: &[u8], filename: &str) -> Result<ParsedDocument>;

    /// Registered component name.
    fn name(&self) -> &'static str;
}

/// Shared configuration parsers accept (all fields optional, parser-specific).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParserConfig {
    /// HTML: strip `<script>`/`<style>` content. Default true.
    #[serde(default)]
    pub strip_scripts: Option<bool>,
    /// Markdown: strip formatting markers, leaving plain prose.
    #[serde(default)]
    pub strip_formatting: Option<bool>,
    /// CSV/TSV: explicit delimiter override.
    #[serde(default)]
    pub delimiter: Option<char>,
    /// DOCX: flatten tables into pipe-joined lines.
    #[serde(default)]
    pub flatten_tables: Option<bool>,
    /// PDF: extract table cells in addition to page text.
    #[serde(default)]
    pub extract_tables: Option<bool>,
    /// PDF: record image references in addition to text.
    #[serde(default)]
    pub extract_images: Option<bool>,
}

/// Build the default parser factory with all required implementations
/// registered under their canonical names.
#[must_use]
pub fn default_factory() -> Factory<Arc<dyn Parser>> {
    let mut factory = Factory::new(Category::Parsers);

    factory.register("text", "Plain text passthrough parser", ConfigSchema::default(), |_cfg| {
        Ok(Arc::new(TextParser) as Arc<dyn Parser>)
    });
    factory.register(
        "markdown",
        "Markdown parser with optional formatting strip",
        ConfigSchema::default(),
        |cfg| {
            let config: ParserConfig = serde_json::from_value(cfg.clone())
                .map_err(|e| crate::error::PipelineError::validation(e.to_string()))?;
            Ok(Arc::new(MarkdownParser::new(config)) as Arc<dyn Parser>)
        },
    );
    factory.register(
        "html",
        "HTML parser stripping script/style by default",
        ConfigSchema::default(),
        |cfg| {
            let config: ParserConfig = serde_json::from_value(cfg.clone())
                .map_err(|e| crate::error::PipelineError::validation(e.to_string()))?;
            Ok(Arc::new(HtmlParser::new(config)) as Arc<dyn Parser>)
        },
    );
    factory.register(
        "csv",
        "CSV/TSV parser with delimiter auto-detection",
        ConfigSchema::default(),
        |cfg| {
            let config: ParserConfig = serde_json::from_value(cfg.clone())
                .map_err(|e| crate::error::PipelineError::validation(e.to_string()))?;
            Ok(Arc::new(CsvParser::new(config)) as Arc<dyn Parser>)
        },
    );
    factory.register(
        "pdf",
        "PDF parser extracting per-page text",
        ConfigSchema::default(),
        |cfg| {
            let config: ParserConfig = serde_json::from_value(cfg.clone())
                .map_err(|e| crate::error::PipelineError::validation(e.to_string()))?;
            Ok(Arc::new(PdfParser::new(config)) as Arc<dyn Parser>)
        },
    );
    factory.register(
        "docx",
        "DOCX parser collecting paragraphs and optional flattened tables",
        ConfigSchema::default(),
        |cfg| {
            let config: ParserConfig = serde_json::from_value(cfg.clone())
                .map_err(|e| crate::error::PipelineError::validation(e.to_string()))?;
            Ok(Arc::new(DocxParser::new(config)) as Arc<dyn Parser>)
        },
    );
    factory.register(
        "auto",
        "Dispatches by extension then magic bytes, falling back to text",
        ConfigSchema::default(),
        |_cfg| Ok(Arc::new(AutoParser::new()) as Arc<dyn Parser>),
    );

    factory
}
