pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod parser;
pub mod pipeline;
pub mod report;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use error::{AnalyzerError, Result};
pub use pipeline::{AnalysisReport, Pipeline};
pub use types::{CanonicalField, ClaimRecord, FileFormat};
