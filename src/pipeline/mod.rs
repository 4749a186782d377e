// Analysis pipeline: load, normalize columns, coerce fields, aggregate, explain

pub mod ingestion;
pub mod processing;
pub mod utils;

use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::config::Config;
use crate::error::Result;
use crate::types::FileFormat;
use ingestion::{Loader, RawTable};
use processing::aggregate::{self, DenialHeatmap, GroupRate, PayerSummary, ProcedureDenialSummary};
use processing::coercion::{coerce_records, ClaimTable};
use processing::normalize::ColumnNormalizer;
use processing::root_cause;

/// Everything the presentation layer needs from one uploaded file
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    /// File name when the input came from disk
    pub source: Option<String>,
    /// (rows, columns) of the cleaned table, derived columns included
    pub shape: (usize, usize),
    pub header_row: usize,
    /// Canonical name -> source column or `MISSING`
    pub detected_mapping: BTreeMap<&'static str, String>,
    pub claims: ClaimTable,
    pub procedure_summary: Option<Vec<ProcedureDenialSummary>>,
    pub payer_summary: Option<PayerSummary>,
    pub provider_summary: Option<Vec<GroupRate>>,
    pub heatmap: Option<DenialHeatmap>,
    pub root_causes: Vec<String>,
    pub recommendations: Vec<String>,
}

pub struct Pipeline {
    loader: Loader,
    normalizer: ColumnNormalizer,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

impl Pipeline {
    pub fn new(config: &Config) -> Self {
        Self {
            loader: Loader::new(config.loader.clone()),
            normalizer: ColumnNormalizer::from_config(config),
        }
    }

    /// Analyze an in-memory upload
    #[instrument(skip(self, bytes), fields(bytes_len = bytes.len()))]
    pub fn run(&self, bytes: &[u8], format: FileFormat) -> Result<AnalysisReport> {
        let t_run = std::time::Instant::now();
        let raw = self.loader.load(bytes, format)?;
        let report = self.analyze_table(raw, None);
        Self::record_run_metrics(&report, t_run.elapsed().as_secs_f64());
        Ok(report)
    }

    /// Analyze a file on disk; format is inferred from the extension unless given
    #[instrument(skip(self, path), fields(path = %path.display()))]
    pub fn run_file(&self, path: &Path, format: Option<FileFormat>) -> Result<AnalysisReport> {
        let t_run = std::time::Instant::now();
        let raw = self.loader.load_file(path, format)?;
        let source = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned());
        let report = self.analyze_table(raw, source);
        Self::record_run_metrics(&report, t_run.elapsed().as_secs_f64());
        Ok(report)
    }

    /// Run every stage after loading; never fails, missing columns only skip views
    pub fn analyze_table(&self, raw: RawTable, source: Option<String>) -> AnalysisReport {
        info!("🚀 Analyzing table with {} rows", raw.rows.len());

        let mapping = self.normalizer.normalize(&raw.columns);
        let detected_mapping = mapping.detected_mapping();
        let claims = coerce_records(&raw, mapping);

        let procedure_summary = aggregate::by_procedure(&claims);
        let payer_summary = aggregate::by_payer(&claims);
        let provider_summary = aggregate::by_provider(&claims);
        let heatmap = aggregate::heatmap(&claims);
        let root_causes = root_cause::detect_root_causes(&claims);

        info!(
            "✅ Analysis complete: procedures={} payers={} providers={} root_causes={}",
            procedure_summary.as_ref().map_or(0, Vec::len),
            payer_summary.as_ref().map_or(0, |p| p.denial_rates.len()),
            provider_summary.as_ref().map_or(0, Vec::len),
            root_causes.len()
        );

        AnalysisReport {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            source,
            shape: (claims.len(), claims.columns.len()),
            header_row: raw.header_row,
            detected_mapping,
            claims,
            procedure_summary,
            payer_summary,
            provider_summary,
            heatmap,
            root_causes,
            recommendations: root_cause::recommend_strategies(),
        }
    }

    fn record_run_metrics(report: &AnalysisReport, duration_secs: f64) {
        counter!("denial_analyzer_runs_total").increment(1);
        counter!("denial_analyzer_rows_total").increment(report.claims.len() as u64);
        histogram!("denial_analyzer_run_duration_seconds").record(duration_secs);
    }
}
