use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info, instrument, warn};

use crate::config::LoaderConfig;
use crate::error::{AnalyzerError, Result};
use crate::parser::{parser_for, RawRows};
use crate::pipeline::utils::StringUtils;
use crate::types::FileFormat;

/// A billing export after header detection, before any column matching
#[derive(Debug, Clone, Serialize)]
pub struct RawTable {
    /// Index of the header among the non-blank rows of the file
    pub header_row: usize,
    /// Header cells as they appear in the file
    pub source_columns: Vec<String>,
    /// Cleaned, de-duplicated column names used for matching
    pub columns: Vec<String>,
    /// Data rows; absent cells are `None`
    pub rows: Vec<Vec<Option<String>>>,
}

impl RawTable {
    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), self.columns.len())
    }
}

/// Turns raw bytes into a `RawTable`, guessing where the header sits
pub struct Loader {
    config: LoaderConfig,
}

impl Default for Loader {
    fn default() -> Self {
        Self::new(LoaderConfig::default())
    }
}

impl Loader {
    pub fn new(config: LoaderConfig) -> Self {
        Self { config }
    }

    #[instrument(skip(self, bytes), fields(bytes_len = bytes.len()))]
    pub fn load(&self, bytes: &[u8], format: FileFormat) -> Result<RawTable> {
        let rows = parser_for(format).parse(bytes)?;
        self.build_table(rows)
    }

    /// Read a file from disk, inferring its format from the extension unless given
    pub fn load_file(&self, path: &Path, format: Option<FileFormat>) -> Result<RawTable> {
        let format = match format {
            Some(f) => f,
            None => FileFormat::from_path(path)?,
        };
        info!("📂 Loading {} as {:?}", path.display(), format);
        let bytes = fs::read(path)?;
        self.load(&bytes, format)
    }

    /// Index of the first preview row with enough non-empty cells, or 0
    pub fn detect_header_row(&self, rows: &[Vec<String>]) -> usize {
        rows.iter()
            .take(self.config.header_scan_rows)
            .position(|row| {
                row.iter().filter(|cell| !self.is_null(cell)).count()
                    >= self.config.min_header_cells
            })
            .unwrap_or(0)
    }

    /// Whether a cell counts as missing data
    pub fn is_null(&self, cell: &str) -> bool {
        let trimmed = cell.trim();
        self.config
            .null_tokens
            .iter()
            .any(|token| token.trim().eq_ignore_ascii_case(trimmed))
    }

    fn build_table(&self, rows: RawRows) -> Result<RawTable> {
        if rows.is_empty() {
            warn!("No non-blank rows in input");
            return Err(AnalyzerError::NoData);
        }

        let header_row = self.detect_header_row(&rows);
        if header_row > 0 {
            info!("Skipping {} leading non-data rows", header_row);
        }

        let mut rows = rows.into_iter().skip(header_row);
        let source_columns: Vec<String> = rows
            .next()
            .map(|header| header.into_iter().map(|c| c.trim().to_string()).collect())
            .unwrap_or_default();
        let columns = Self::clean_columns(&source_columns);
        let width = columns.len();

        let data: Vec<Vec<Option<String>>> = rows
            .map(|row| {
                if row.len() > width {
                    debug!("Row has {} cells, header has {}; extra cells ignored", row.len(), width);
                }
                (0..width)
                    .map(|i| {
                        row.get(i)
                            .map(|cell| cell.trim())
                            .filter(|cell| !self.is_null(cell))
                            .map(|cell| cell.to_string())
                    })
                    .collect()
            })
            .collect();

        if data.is_empty() {
            warn!("Header found at row {} but no data rows follow", header_row);
        }

        info!(
            "✅ Loaded table: header_row={} rows={} columns={}",
            header_row,
            data.len(),
            width
        );

        Ok(RawTable {
            header_row,
            source_columns,
            columns,
            rows: data,
        })
    }

    /// Clean header names, naming blanks by position and suffixing duplicates
    fn clean_columns(source_columns: &[String]) -> Vec<String> {
        let mut seen: HashMap<String, usize> = HashMap::new();
        let mut cleaned = Vec::with_capacity(source_columns.len());

        for (idx, raw) in source_columns.iter().enumerate() {
            let mut name = StringUtils::clean_column_name(raw);
            if name.is_empty() {
                name = format!("unnamed_{}", idx);
            }

            let count = seen.entry(name.clone()).or_insert(0);
            if *count > 0 {
                name = format!("{}.{}", name, count);
            }
            *count += 1;
            cleaned.push(name);
        }

        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(data: &[&[&str]]) -> RawRows {
        data.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_header_detection_skips_title_rows() {
        let loader = Loader::default();
        let input = rows(&[
            &["Denial Report Q3"],
            &["Generated 2024-10-01", ""],
            &["CPT", "Payer", "Paid Amt"],
            &["99213", "Aetna", "0"],
        ]);
        assert_eq!(loader.detect_header_row(&input), 2);

        let table = loader.build_table(input).unwrap();
        assert_eq!(table.header_row, 2);
        assert_eq!(table.columns, vec!["cpt", "payer", "paid_amt"]);
        assert_eq!(table.source_columns, vec!["CPT", "Payer", "Paid Amt"]);
        assert_eq!(table.shape(), (1, 3));
    }

    #[test]
    fn test_header_defaults_to_first_row() {
        let loader = Loader::default();
        let input = rows(&[&["only"], &["single"], &["cells"]]);
        assert_eq!(loader.detect_header_row(&input), 0);
    }

    #[test]
    fn test_header_scan_is_bounded() {
        let loader = Loader::new(LoaderConfig {
            header_scan_rows: 2,
            ..LoaderConfig::default()
        });
        let input = rows(&[&["title"], &["subtitle"], &["CPT", "Payer"]]);
        assert_eq!(loader.detect_header_row(&input), 0);
    }

    #[test]
    fn test_null_tokens_and_padding() {
        let loader = Loader::default();
        let table = loader
            .build_table(rows(&[
                &["CPT", "Reason", "Paid"],
                &["99213", "N/A"],
                &["99214", "Missing modifier", "nan", "extra"],
            ]))
            .unwrap();

        assert_eq!(table.rows[0], vec![Some("99213".to_string()), None, None]);
        assert_eq!(
            table.rows[1],
            vec![Some("99214".to_string()), Some("Missing modifier".to_string()), None]
        );
    }

    #[test]
    fn test_duplicate_and_blank_headers() {
        let cleaned = Loader::clean_columns(&[
            "Payer".to_string(),
            "".to_string(),
            "payer".to_string(),
            "PAYER ".to_string(),
        ]);
        assert_eq!(cleaned, vec!["payer", "unnamed_1", "payer.1", "payer.2"]);
    }

    #[test]
    fn test_empty_input_is_no_data() {
        let loader = Loader::default();
        assert!(matches!(loader.build_table(Vec::new()), Err(AnalyzerError::NoData)));
        assert!(matches!(loader.load(b"", FileFormat::Csv), Err(AnalyzerError::NoData)));
        assert!(matches!(loader.load(b"\n\n , \n", FileFormat::Csv), Err(AnalyzerError::NoData)));
    }

    #[test]
    fn test_header_only_is_empty_table() {
        let table = Loader::default().load(b"CPT,Payer\n", FileFormat::Csv).unwrap();
        assert_eq!(table.shape(), (0, 2));
    }
}
