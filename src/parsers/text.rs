//! Plain text parser: bytes are decoded as UTF-8 (lossily) and passed
//! through unchanged. This is the last-resort fallback for [`super::auto`].

use super::{Parser, ParsedDocument};
use crate::error::Result;
use async_trait::async_trait;

/// Plain text passthrough parser.
#[derive(Debug, Default)]
pub struct TextParser;

#[async_trait]
impl Parser for TextParser {
    async fn parse(&self, bytes: &[u8], _filename: &str) -> Result<ParsedDocument> {
        let content = String::from_utf8_lossy(bytes).into_owned();
        Ok(ParsedDocument::from_text(content))
    }

    fn name(&self) -> &'static str {
        "text"
    }
}
