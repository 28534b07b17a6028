//! CSV/TSV parser: delimiter is taken from config, then the filename
//! extension, then sniffed from the first line.

use super::{ParsedDocument, ParsedTable, Parser, ParserConfig};
use crate::error::Result;
use async_trait::async_trait;

/// CSV/TSV parser.
#[derive(Debug, Default)]
pub struct CsvParser {
    config: ParserConfig,
}

impl CsvParser {
    /// Create a parser with the given config.
    #[must_use]
    pub const fn new(config: ParserConfig) -> Self {
        Self { config }
    }

    fn detect_delimiter(&self, filename: &str, first_line: &str) -> char {
        if let Some(d) = self.config.delimiter {
            return d;
        }
        if filename.ends_with(".tsv") {
            return '\t';
        }
        if filename.ends_with(".csv") {
            return ',';
        }
        // Sniff: whichever candidate appears most often in the header line.
        let candidates = [',', '\t', ';', '|'];
        candidates
            .into_iter()
            .max_by_key(|c| first_line.matches(*c).count())
            .unwrap_or(',')
    }

    fn split_row(line: &str, delimiter: char) -> Vec<String> {
        line.split(delimiter).map(|c| c.trim().to_string()).collect()
    }
}

#[async_trait]
impl Parser for CsvParser {
    async fn parse(&self, bytes: &[u8], filename: &str) -> Result<ParsedDocument> {
        let raw = String::from_utf8_lossy(bytes).into_owned();
        let first_line = raw.lines().next().unwrap_or_default();
        let delimiter = self.detect_delimiter(filename, first_line);

        let rows: Vec<Vec<String>> = raw
            .lines()
            .filter(|l| !l.is_empty())
            .map(|l| Self::split_row(l, delimiter))
            .collect();

        let content = rows
            .iter()
            .map(|row| row.join(" | "))
            .collect::<Vec<_>>()
            .join("\n");

        let mut metadata = std::collections::HashMap::new();
        metadata.insert(
            "delimiter".to_string(),
            serde_json::Value::String(delimiter.to_string()),
        );
        metadata.insert(
            "row_count".to_string(),
            serde_json::Value::Number(rows.len().into()),
        );

        Ok(ParsedDocument {
            content,
            metadata,
            pages: None,
            tables: Some(vec![ParsedTable { rows }]),
            images: None,
        })
    }

    fn name(&self) -> &'static str {
        "csv"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn detects_delimiter_by_extension() {
        let parsed = CsvParser::default()
            .parse(b"a\tb\tc\n1\t2\t3", "data.tsv")
            .await
            .unwrap();
        assert_eq!(parsed.metadata["delimiter"], "\t");
    }

    #[tokio::test]
    async fn sniffs_delimiter_when_extension_unknown() {
        let parsed = CsvParser::default()
            .parse(b"a;b;c\n1;2;3", "data.txt")
            .await
            .unwrap();
        assert_eq!(parsed.metadata["delimiter"], ";");
        let tables = parsed.tables.unwrap();
        assert_eq!(tables[0].rows[0], vec!["a", "b", "c"]);
    }
}
