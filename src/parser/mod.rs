use calamine::{open_workbook_auto_from_rs, DataType, Reader};
use csv::{ReaderBuilder, Trim};
use std::borrow::Cow;
use std::io::Cursor;
use tracing::{debug, info, warn};

use crate::error::{AnalyzerError, Result};
use crate::types::FileFormat;

/// Rows of cell text exactly as laid out in the source, header not yet identified
pub type RawRows = Vec<Vec<String>>;

pub trait TableParser {
    /// Split raw file bytes into rows of cell text, dropping fully blank rows
    fn parse(&self, bytes: &[u8]) -> Result<RawRows>;
}

/// Pick the parser for a declared format
pub fn parser_for(format: FileFormat) -> Box<dyn TableParser> {
    match format {
        FileFormat::Csv => Box::new(CsvTableParser::default()),
        FileFormat::Spreadsheet => Box::new(SpreadsheetTableParser),
    }
}

/// Delimited text parser with delimiter and encoding detection
#[derive(Debug, Default)]
pub struct CsvTableParser {
    /// Forced delimiter; detected from the content when unset
    pub delimiter: Option<u8>,
}

impl CsvTableParser {
    pub fn with_delimiter(delimiter: u8) -> Self {
        Self {
            delimiter: Some(delimiter),
        }
    }

    /// Decode as UTF-8, falling back to Windows-1252 for legacy exports
    pub fn decode(bytes: &[u8]) -> Cow<'_, str> {
        match std::str::from_utf8(bytes) {
            Ok(text) => Cow::Borrowed(text.strip_prefix('\u{feff}').unwrap_or(text)),
            Err(e) => {
                warn!(
                    "Input is not valid UTF-8 (at byte {}), decoding as Windows-1252",
                    e.valid_up_to()
                );
                let (text, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
                text
            }
        }
    }

    /// Detect delimiter from content (comma, semicolon, tab, pipe).
    /// Lines holding none of the candidates (title preambles) are not sampled.
    pub fn detect_delimiter(content: &str) -> u8 {
        let candidates = [b',', b';', b'\t', b'|'];
        let sample_lines: Vec<&str> = content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .filter(|l| l.bytes().any(|b| candidates.contains(&b)))
            .take(10)
            .collect();

        if sample_lines.is_empty() {
            return b',';
        }

        let mut best_delimiter = b',';
        let mut best_score = 0.0f32;

        for &delimiter in &candidates {
            let field_counts: Vec<usize> = sample_lines
                .iter()
                .map(|line| line.bytes().filter(|&b| b == delimiter).count())
                .collect();

            // Score by consistency (low standard deviation) and frequency
            let avg = field_counts.iter().sum::<usize>() as f32 / field_counts.len() as f32;
            let variance = field_counts
                .iter()
                .map(|&x| (x as f32 - avg).powi(2))
                .sum::<f32>()
                / field_counts.len() as f32;

            let score = avg / (1.0 + variance.sqrt());

            if score > best_score {
                best_score = score;
                best_delimiter = delimiter;
            }
        }

        best_delimiter
    }
}

impl TableParser for CsvTableParser {
    fn parse(&self, bytes: &[u8]) -> Result<RawRows> {
        debug!("CsvTableParser: start bytes_len={}", bytes.len());
        let content = Self::decode(bytes);
        let delimiter = self
            .delimiter
            .unwrap_or_else(|| Self::detect_delimiter(&content));

        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .trim(Trim::All)
            .flexible(true) // Allow rows with different lengths
            .from_reader(content.as_bytes());

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            let row: Vec<String> = record.iter().map(|s| s.to_string()).collect();
            if row.iter().all(|s| s.trim().is_empty()) {
                continue;
            }
            rows.push(row);
        }

        info!(
            "CsvTableParser: parsed rows={} delimiter={:?}",
            rows.len(),
            delimiter as char
        );
        Ok(rows)
    }
}

/// Workbook parser reading the first worksheet
#[derive(Debug, Default)]
pub struct SpreadsheetTableParser;

impl TableParser for SpreadsheetTableParser {
    fn parse(&self, bytes: &[u8]) -> Result<RawRows> {
        debug!("SpreadsheetTableParser: start bytes_len={}", bytes.len());
        if bytes.is_empty() {
            return Err(AnalyzerError::NoData);
        }

        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or(AnalyzerError::NoData)??;

        let rows: RawRows = range
            .rows()
            .map(|row| {
                row.iter()
                    .map(|cell| {
                        cell.as_string()
                            .unwrap_or_else(|| format!("{}", cell))
                            .trim()
                            .to_string()
                    })
                    .collect::<Vec<String>>()
            })
            .filter(|row| row.iter().any(|s| !s.is_empty()))
            .collect();

        info!("SpreadsheetTableParser: parsed rows={}", rows.len());
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(CsvTableParser::detect_delimiter("a,b,c\nd,e,f"), b',');
        assert_eq!(CsvTableParser::detect_delimiter("a;b;c\nd;e;f"), b';');
        assert_eq!(CsvTableParser::detect_delimiter("a\tb\tc\nd\te\tf"), b'\t');
        assert_eq!(CsvTableParser::detect_delimiter(""), b',');
    }

    #[test]
    fn test_detect_delimiter_past_title_lines() {
        let mut content: String = (0..15).map(|i| format!("Export line {}\n", i)).collect();
        content.push_str("CPT;Payer;Paid\n99213;Aetna;0\n");
        assert_eq!(CsvTableParser::detect_delimiter(&content), b';');
        assert_eq!(CsvTableParser::detect_delimiter("Title only\nNo fields"), b',');
    }

    #[test]
    fn test_parse_skips_blank_lines_and_trims() {
        let rows = CsvTableParser::default()
            .parse(b"CPT, Payer \n\n,\n99213, Aetna\n")
            .unwrap();
        assert_eq!(
            rows,
            vec![
                vec!["CPT".to_string(), "Payer".to_string()],
                vec!["99213".to_string(), "Aetna".to_string()],
            ]
        );
    }

    #[test]
    fn test_parse_quoted_currency() {
        let rows = CsvTableParser::with_delimiter(b',')
            .parse(b"CPT,Paid\n99213,\"$1,250.00\"\n")
            .unwrap();
        assert_eq!(rows[1][1], "$1,250.00");
    }

    #[test]
    fn test_decode_strips_bom_and_handles_latin1() {
        assert_eq!(CsvTableParser::decode(b"\xEF\xBB\xBFCPT"), "CPT");
        // 0xE9 is 'é' in Windows-1252 and invalid as standalone UTF-8
        assert_eq!(CsvTableParser::decode(b"Caf\xE9"), "Café");
    }

    #[test]
    fn test_spreadsheet_rejects_garbage() {
        let err = SpreadsheetTableParser.parse(b"definitely not a workbook").unwrap_err();
        assert!(err.is_malformed_input());
    }

    #[test]
    fn test_spreadsheet_empty_input_is_no_data() {
        let err = SpreadsheetTableParser.parse(b"").unwrap_err();
        assert!(matches!(err, AnalyzerError::NoData));
    }
}
