//! Markdown parser with an optional formatting-strip pass.

use super::{Parser, ParsedDocument, ParserConfig};
use crate::error::Result;
use async_trait::async_trait;

/// Markdown parser.
#[derive(Debug, Default)]
pub struct MarkdownParser {
    config: ParserConfig,
}

impl MarkdownParser {
    /// Create a parser with the given config.
    #[must_use]
    pub const fn new(config: ParserConfig) -> Self {
        Self { config }
    }

    /// Strip the most common Markdown markers, leaving readable prose.
    /// Line-oriented and intentionally conservative: it never removes
    /// text, only punctuation used purely for formatting.
    fn strip_formatting(text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        for line in text.lines() {
            let trimmed = line.trim_start();
            let stripped_heading = trimmed.trim_start_matches('#').trim_start();
            let stripped_bullet = stripped_heading
                .strip_prefix("- ")
                .or_else(|| stripped_heading.strip_prefix("* "))
                .unwrap_or(stripped_heading);
            let no_bold = stripped_bullet.replace("**", "").replace("__", "");
            let no_emphasis = no_bold.replace('*', "").replace('_', "");
            let no_inline_code = no_emphasis.replace('`', "");
            out.push_str(&no_inline_code);
            out.push('\n');
        }
        out
    }
}

#[async_trait]
impl Parser for MarkdownParser {
    async fn parse(&self, bytes: &[u8], _filename: &str) -> Result<ParsedDocument> {
        let raw = String::from_utf8_lossy(bytes).into_owned();
        let content = if self.config.strip_formatting.unwrap_or(false) {
            Self::strip_formatting(&raw)
        } else {
            raw
        };
        Ok(ParsedDocument::from_text(content))
    }

    fn name(&self) -> &'static str {
        "markdown"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn passthrough_by_default() {
        let parsed = MarkdownParser::default()
            .parse(b"# Title\n\n**bold** text", "a.md")
            .await
            .unwrap();
        assert!(parsed.content.contains("**bold**"));
    }

    #[tokio::test]
    async fn strips_formatting_when_requested() {
        let parser = MarkdownParser::new(ParserConfig {
            strip_formatting: Some(true),
            ..Default::default()
        });
        let parsed = parser
            .parse(b"# Title\n\n**bold** text", "a.md")
            .await
            .unwrap();
        assert!(!parsed.content.contains('#'));
        assert!(!parsed.content.contains("**"));
        assert!(parsed.content.contains("bold"));
    }
}
