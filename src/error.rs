use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed CSV input: {0}")]
    Csv(#[from] csv::Error),

    #[error("Malformed spreadsheet input: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No valid data found in this file")]
    NoData,

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AnalyzerError {
    /// True for input that could not be read as the declared format at all,
    /// as opposed to a well-formed file that simply holds no rows.
    pub fn is_malformed_input(&self) -> bool {
        matches!(self, AnalyzerError::Csv(_) | AnalyzerError::Spreadsheet(_))
    }
}

pub type Result<T> = std::result::Result<T, AnalyzerError>;
