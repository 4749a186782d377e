use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::{info, warn};

use crate::constants::DENIED_COLUMN;
use crate::pipeline::ingestion::RawTable;
use crate::pipeline::processing::normalize::ColumnMapping;
use crate::types::{CanonicalField, ClaimRecord};

/// Currency symbols, thousands separators and stray whitespace
static CURRENCY_NOISE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\$€£¥,\s]").expect("valid regex"));

/// Parsed claim lines plus the mapping they were built from
#[derive(Debug, Clone, Serialize)]
pub struct ClaimTable {
    pub mapping: ColumnMapping,
    /// Column names after cleanup, with mapped columns renamed to canonical names
    pub columns: Vec<String>,
    pub records: Vec<ClaimRecord>,
    /// Non-blank numeric cells that could not be parsed and were read as 0
    pub coercion_warnings: usize,
}

impl ClaimTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has(&self, field: CanonicalField) -> bool {
        self.mapping.is_mapped(field)
    }
}

/// Outcome of reading one currency-formatted cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Amount {
    Parsed(f64),
    Blank,
    Malformed,
}

impl Amount {
    pub fn value(self) -> f64 {
        match self {
            Amount::Parsed(v) => v,
            Amount::Blank | Amount::Malformed => 0.0,
        }
    }
}

/// Parse a billing amount such as `$1,250.00` or `(35.10)`
pub fn parse_amount(raw: &str) -> Amount {
    let cleaned = CURRENCY_NOISE.replace_all(raw, "");
    if cleaned.is_empty() {
        return Amount::Blank;
    }

    let (negative, digits) = match cleaned
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
    {
        Some(inner) => (true, inner),
        None => (false, cleaned.as_ref()),
    };

    match digits.parse::<f64>() {
        Ok(v) if v.is_finite() => Amount::Parsed(if negative { -v } else { v }),
        _ => Amount::Malformed,
    }
}

/// Build claim records from a raw table and its column mapping
pub fn coerce_records(table: &RawTable, mapping: ColumnMapping) -> ClaimTable {
    let idx = |field| mapping.source_index(field);
    let code_idx = idx(CanonicalField::ProcedureCode);
    let payer_idx = idx(CanonicalField::Payer);
    let provider_idx = idx(CanonicalField::Provider);
    let payment_idx = idx(CanonicalField::PaymentAmount);
    let balance_idx = idx(CanonicalField::Balance);
    let reason_idx = idx(CanonicalField::DenialReason);

    let mut coercion_warnings = 0usize;
    let mut records = Vec::with_capacity(table.rows.len());

    for (row_number, row) in table.rows.iter().enumerate() {
        let text = |i: Option<usize>| i.and_then(|i| row.get(i).cloned().flatten());

        let mut amount = |i: Option<usize>, field: CanonicalField| -> f64 {
            let Some(raw) = text(i) else {
                return 0.0;
            };
            let parsed = parse_amount(&raw);
            if parsed == Amount::Malformed {
                coercion_warnings += 1;
                warn!(
                    "Row {}: could not parse {} value '{}', using 0",
                    row_number + 1,
                    field,
                    raw
                );
            }
            parsed.value()
        };

        let payment_amount = amount(payment_idx, CanonicalField::PaymentAmount);
        let balance = amount(balance_idx, CanonicalField::Balance);
        let denial_reason = text(reason_idx);

        let denied = match reason_idx {
            Some(_) => denial_reason.is_some(),
            None => payment_amount == 0.0,
        };

        records.push(ClaimRecord {
            procedure_code: text(code_idx),
            payer: text(payer_idx),
            provider: text(provider_idx),
            payment_amount,
            balance,
            denial_reason,
            denied,
        });
    }

    if coercion_warnings > 0 {
        metrics::counter!("denial_analyzer_coercion_fallbacks_total").increment(coercion_warnings as u64);
    }

    let columns = cleaned_columns(table, &mapping);
    let denied_count = records.iter().filter(|r| r.denied).count();
    info!(
        "🧹 Coerced {} records ({} denied, {} numeric fallbacks)",
        records.len(),
        denied_count,
        coercion_warnings
    );

    ClaimTable {
        mapping,
        columns,
        records,
        coercion_warnings,
    }
}

/// Column list after renaming, with numeric fields and the flag appended when absent
fn cleaned_columns(table: &RawTable, mapping: &ColumnMapping) -> Vec<String> {
    let mut columns = table.columns.clone();
    for field in CanonicalField::ALL {
        if let Some(i) = mapping.source_index(field) {
            columns[i] = field.canonical_name().to_string();
        }
    }
    for field in [CanonicalField::PaymentAmount, CanonicalField::Balance] {
        if !mapping.is_mapped(field) {
            columns.push(field.canonical_name().to_string());
        }
    }
    columns.push(DENIED_COLUMN.to_string());
    columns
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::processing::normalize::ColumnNormalizer;

    fn table(columns: &[&str], rows: &[&[Option<&str>]]) -> RawTable {
        RawTable {
            header_row: 0,
            source_columns: columns.iter().map(|s| s.to_string()).collect(),
            columns: columns.iter().map(|s| s.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|c| c.map(|s| s.to_string())).collect())
                .collect(),
        }
    }

    fn coerce(raw: &RawTable) -> ClaimTable {
        let mapping = ColumnNormalizer::default().normalize(&raw.columns);
        coerce_records(raw, mapping)
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("$1,250.00"), Amount::Parsed(1250.0));
        assert_eq!(parse_amount(" 42 "), Amount::Parsed(42.0));
        assert_eq!(parse_amount("(35.10)"), Amount::Parsed(-35.10));
        assert_eq!(parse_amount("-5"), Amount::Parsed(-5.0));
        assert_eq!(parse_amount("€ 9,99"), Amount::Parsed(999.0));
        assert_eq!(parse_amount(""), Amount::Blank);
        assert_eq!(parse_amount("$ "), Amount::Blank);
        assert_eq!(parse_amount("pending"), Amount::Malformed);
        assert_eq!(parse_amount("inf"), Amount::Malformed);
        assert_eq!(parse_amount("pending").value(), 0.0);
    }

    #[test]
    fn test_denied_follows_reason_when_column_exists() {
        let raw = table(
            &["cpt", "paid", "denial_reason"],
            &[
                &[Some("99213"), Some("0"), None],
                &[Some("99214"), Some("120"), Some("Missing modifier")],
            ],
        );
        let claims = coerce(&raw);
        let denied: Vec<bool> = claims.records.iter().map(|r| r.denied).collect();
        assert_eq!(denied, vec![false, true]);

        // toggling the reason's nullness flips the flag
        let toggled = table(
            &["cpt", "paid", "denial_reason"],
            &[
                &[Some("99213"), Some("0"), Some("Auth required")],
                &[Some("99214"), Some("120"), None],
            ],
        );
        let denied: Vec<bool> = coerce(&toggled).records.iter().map(|r| r.denied).collect();
        assert_eq!(denied, vec![true, false]);
    }

    #[test]
    fn test_denied_follows_zero_payment_without_reason_column() {
        let raw = table(
            &["cpt", "paid_amt"],
            &[
                &[Some("99213"), Some("$0.00")],
                &[Some("99213"), Some("0.01")],
                &[Some("99214"), None],
            ],
        );
        let denied: Vec<bool> = coerce(&raw).records.iter().map(|r| r.denied).collect();
        assert_eq!(denied, vec![true, false, true]);
    }

    #[test]
    fn test_missing_numeric_columns_default_to_zero() {
        let raw = table(&["cpt", "payer"], &[&[Some("99213"), Some("Aetna")]]);
        let claims = coerce(&raw);
        assert_eq!(claims.records[0].payment_amount, 0.0);
        assert_eq!(claims.records[0].balance, 0.0);
        assert!(claims.records[0].denied);
        assert_eq!(
            claims.columns,
            vec!["CPT_Code", "Insurance_Company", "Payment_Amount", "Balance", "Denied"]
        );
    }

    #[test]
    fn test_malformed_amount_counts_warning() {
        let raw = table(
            &["cpt", "payment", "balance"],
            &[&[Some("99213"), Some("see note"), Some("$10")]],
        );
        let claims = coerce(&raw);
        assert_eq!(claims.coercion_warnings, 1);
        assert_eq!(claims.records[0].payment_amount, 0.0);
        assert_eq!(claims.records[0].balance, 10.0);
    }
}
