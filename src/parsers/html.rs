//! HTML parser: strips `<script>`/`<style>` content by default and
//! preserves paragraph breaks. Deliberately dependency-light — a
//! hand-rolled tag stripper rather than a full DOM, matching the scope
//! the pipeline engine needs (text extraction, not rendering).

use super::{Parser, ParsedDocument, ParserConfig};
use crate::error::Result;
use async_trait::async_trait;

/// HTML parser.
#[derive(Debug, Default)]
pub struct HtmlParser {
    config: ParserConfig,
}

impl HtmlParser {
    /// Create a parser with the given config.
    #[must_use]
    pub const fn new(config: ParserConfig) -> Self {
        Self { config }
    }

    fn strip(html: &str, strip_scripts: bool) -> String {
        let mut out = String::with_capacity(html.len());
        let lower = html.to_ascii_lowercase();
        let mut in_tag = false;
        let mut skip_until: Option<&str> = None;
        let mut i = 0usize;

        while i < html.len() {
            if let Some(end_tag) = skip_until {
                if let Some(pos) = lower[i..].find(end_tag) {
                    i += pos + end_tag.len();
                    skip_until = None;
                } else {
                    break;
                }
                continue;
            }

            let ch = html[i..].chars().next().unwrap_or('\0');

            if ch == '<' {
                if strip_scripts && lower[i..].starts_with("<script") {
                    skip_until = Some("</script>");
                    i += 1;
                    continue;
                }
                if strip_scripts && lower[i..].starts_with("<style") {
                    skip_until = Some("</style>");
                    i += 1;
                    continue;
                }
                let is_block_close = lower[i..].starts_with("</p")
                    || lower[i..].starts_with("<br")
                    || lower[i..].starts_with("<div")
                    || lower[i..].starts_with("</div")
                    || lower[i..].starts_with("<p>")
                    || lower[i..].starts_with("<p ");
                if is_block_close {
                    out.push('\n');
                }
                in_tag = true;
                i += ch.len_utf8();
                continue;
            }
            if ch == '>' {
                in_tag = false;
                i += ch.len_utf8();
                continue;
            }
            if !in_tag {
                out.push(ch);
            }
            i += ch.len_utf8();
        }

        let decoded = out
            .replace("&amp;", "&")
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&quot;", "\"")
            .replace("&#39;", "'")
            .replace("&nbsp;", " ");

        decoded
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[async_trait]
impl Parser for HtmlParser {
    async fn parse(&self, bytes: &[u8], _filename: &str) -> Result<ParsedDocument> {
        let raw = String::from_utf8_lossy(bytes).into_owned();
        let strip_scripts = self.config.strip_scripts.unwrap_or(true);
        let content = Self::strip(&raw, strip_scripts);
        Ok(ParsedDocument::from_text(content))
    }

    fn name(&self) -> &'static str {
        "html"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn strips_script_and_style_by_default() {
        let html = b"<html><head><style>body{}</style></head><body><script>evil()</script><p>Hello</p></body></html>";
        let parsed = HtmlParser::default().parse(html, "a.html").await.unwrap();
        assert!(!parsed.content.contains("evil"));
        assert!(!parsed.content.contains("body{}"));
        assert!(parsed.content.contains("Hello"));
    }

    #[tokio::test]
    async fn preserves_paragraph_breaks() {
        let html = b"<p>First</p><p>Second</p>";
        let parsed = HtmlParser::default().parse(html, "a.html").await.unwrap();
        assert!(parsed.content.contains("First"));
        assert!(parsed.content.contains("Second"));
        assert!(parsed.content.contains('\n'));
    }
}
