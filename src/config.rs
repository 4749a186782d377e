use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants;
use crate::error::{AnalyzerError, Result};
use crate::types::CanonicalField;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub loader: LoaderConfig,
    pub normalizer: NormalizerConfig,
    pub report: ReportConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// How many leading rows are searched for the header
    pub header_scan_rows: usize,
    /// Non-empty cells a row needs to be taken as the header
    pub min_header_cells: usize,
    /// Cell values read as absent
    pub null_tokens: Vec<String>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            header_scan_rows: constants::DEFAULT_HEADER_SCAN_ROWS,
            min_header_cells: constants::DEFAULT_MIN_HEADER_CELLS,
            null_tokens: constants::DEFAULT_NULL_TOKENS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Minimum similarity (0-100) for a column to be mapped
    pub similarity_threshold: u8,
    /// Additional header spellings keyed by canonical name, e.g. `Balance = ["ar_balance"]`
    pub extra_variants: BTreeMap<String, Vec<String>>,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: constants::DEFAULT_SIMILARITY_THRESHOLD,
            extra_variants: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub top_n: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            top_n: constants::DEFAULT_TOP_N,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Directory for JSON log files; console-only when unset
    pub log_dir: Option<PathBuf>,
    pub file_name: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: None,
            file_name: "denial_analyzer.log".to_string(),
        }
    }
}

impl Config {
    /// Load from an explicit path, or from `denial_analyzer.toml` in the
    /// working directory when present, or fall back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let default_path = PathBuf::from(constants::DEFAULT_CONFIG_FILE);
                if !default_path.exists() {
                    return Ok(Self::default());
                }
                default_path
            }
        };

        let config_content = fs::read_to_string(&config_path).map_err(|e| {
            AnalyzerError::Config(format!(
                "Failed to read config file '{}': {}",
                config_path.display(),
                e
            ))
        })?;

        Self::from_toml_str(&config_content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.normalizer.similarity_threshold > 100 {
            return Err(AnalyzerError::Config(format!(
                "similarity_threshold must be within 0-100, got {}",
                self.normalizer.similarity_threshold
            )));
        }
        if self.loader.header_scan_rows == 0 {
            return Err(AnalyzerError::Config(
                "header_scan_rows must be at least 1".to_string(),
            ));
        }
        for name in self.normalizer.extra_variants.keys() {
            if CanonicalField::from_canonical_name(name).is_none() {
                return Err(AnalyzerError::Config(format!(
                    "unknown canonical field '{}' in extra_variants",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Built-in plus configured variants for one field, in that order
    pub fn variants_for(&self, field: CanonicalField) -> Vec<String> {
        let mut variants: Vec<String> = field
            .default_variants()
            .iter()
            .map(|v| v.to_string())
            .collect();

        for (name, extra) in &self.normalizer.extra_variants {
            if CanonicalField::from_canonical_name(name) == Some(field) {
                variants.extend(extra.iter().map(|v| v.trim().to_lowercase()));
            }
        }
        variants
    }
}
