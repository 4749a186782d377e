/// Defaults shared by the loader, normalizer and report layers.
/// Every value here can be overridden from the TOML config.

// Loader
pub const DEFAULT_HEADER_SCAN_ROWS: usize = 20;
pub const DEFAULT_MIN_HEADER_CELLS: usize = 2;

/// Cell contents treated as absent, compared case-insensitively after trimming
pub const DEFAULT_NULL_TOKENS: &[&str] = &["", "na", "n/a", "nan", "null", "none", "#n/a"];

// Normalizer
pub const DEFAULT_SIMILARITY_THRESHOLD: u8 = 70;

/// Sentinel shown in place of a source column when a canonical field has no match
pub const UNMAPPED_SENTINEL: &str = "MISSING";

// Aggregator
/// Group label for records whose grouping key is absent
pub const BLANK_GROUP_LABEL: &str = "(blank)";

// Report
pub const DEFAULT_TOP_N: usize = 10;
pub const DEFAULT_CONFIG_FILE: &str = "denial_analyzer.toml";

/// Column appended to the cleaned table for the derived flag
pub const DENIED_COLUMN: &str = "Denied";
