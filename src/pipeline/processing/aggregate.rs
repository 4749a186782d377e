//! Denial-rate rollups over a `ClaimTable`.
//!
//! Each function returns `None` when a column it groups by was not found
//! in the upload, so callers can skip that view instead of failing.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::constants::BLANK_GROUP_LABEL;
use crate::pipeline::processing::coercion::ClaimTable;
use crate::types::{CanonicalField, ClaimRecord};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcedureDenialSummary {
    pub procedure_code: String,
    pub claims: usize,
    pub denials: usize,
    /// Percentage in 0..=100
    pub denial_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupRate {
    pub group: String,
    pub claims: usize,
    /// Mean of the denied flag, as a percentage
    pub denial_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupAmount {
    pub group: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PayerSummary {
    pub denial_rates: Vec<GroupRate>,
    /// Summed outstanding balance per payer
    pub lost_revenue: Vec<GroupAmount>,
}

/// Mean denial rate per procedure code x payer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DenialHeatmap {
    pub procedure_codes: Vec<String>,
    pub payers: Vec<String>,
    /// `cells[row][col]`, indexed like `procedure_codes` x `payers`; `None` where no claims exist
    pub cells: Vec<Vec<Option<f64>>>,
}

impl DenialHeatmap {
    pub fn cell(&self, procedure_code: &str, payer: &str) -> Option<f64> {
        let row = self.procedure_codes.iter().position(|c| c == procedure_code)?;
        let col = self.payers.iter().position(|p| p == payer)?;
        self.cells[row][col]
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    claims: usize,
    denials: usize,
    balance: f64,
}

impl Tally {
    fn add(&mut self, record: &ClaimRecord) {
        self.claims += 1;
        if record.denied {
            self.denials += 1;
        }
        self.balance += record.balance;
    }

    fn rate(&self) -> f64 {
        if self.claims == 0 {
            0.0
        } else {
            self.denials as f64 / self.claims as f64 * 100.0
        }
    }
}

fn group_key(record: &ClaimRecord, field: CanonicalField) -> String {
    record
        .key(field)
        .unwrap_or(BLANK_GROUP_LABEL)
        .to_string()
}

/// Tallies keyed in ascending group order
fn tally_by(table: &ClaimTable, field: CanonicalField) -> Option<BTreeMap<String, Tally>> {
    if !table.has(field) {
        return None;
    }
    let mut groups: BTreeMap<String, Tally> = BTreeMap::new();
    for record in &table.records {
        groups.entry(group_key(record, field)).or_default().add(record);
    }
    Some(groups)
}

fn rates_descending(groups: &BTreeMap<String, Tally>) -> Vec<GroupRate> {
    let mut rates: Vec<GroupRate> = groups
        .iter()
        .map(|(group, tally)| GroupRate {
            group: group.clone(),
            claims: tally.claims,
            denial_rate: tally.rate(),
        })
        .collect();
    rates.sort_by(|a, b| b.denial_rate.total_cmp(&a.denial_rate));
    rates
}

/// Claims, denials and denial rate per procedure code, highest rate first
pub fn by_procedure(table: &ClaimTable) -> Option<Vec<ProcedureDenialSummary>> {
    let groups = tally_by(table, CanonicalField::ProcedureCode)?;
    let mut summary: Vec<ProcedureDenialSummary> = groups
        .into_iter()
        .map(|(code, tally)| ProcedureDenialSummary {
            procedure_code: code,
            claims: tally.claims,
            denials: tally.denials,
            denial_rate: tally.rate(),
        })
        .collect();
    summary.sort_by(|a, b| b.denial_rate.total_cmp(&a.denial_rate));
    Some(summary)
}

/// Procedure rows re-ranked by absolute denial count, capped at `n`
pub fn top_by_denials(summary: &[ProcedureDenialSummary], n: usize) -> Vec<ProcedureDenialSummary> {
    let mut ranked = summary.to_vec();
    ranked.sort_by(|a, b| b.denials.cmp(&a.denials));
    ranked.truncate(n);
    ranked
}

/// Denial rate and lost revenue per payer, each sorted descending on its own
pub fn by_payer(table: &ClaimTable) -> Option<PayerSummary> {
    let groups = tally_by(table, CanonicalField::Payer)?;
    let denial_rates = rates_descending(&groups);

    let mut lost_revenue: Vec<GroupAmount> = groups
        .into_iter()
        .map(|(group, tally)| GroupAmount {
            group,
            amount: tally.balance,
        })
        .collect();
    lost_revenue.sort_by(|a, b| b.amount.total_cmp(&a.amount));

    Some(PayerSummary {
        denial_rates,
        lost_revenue,
    })
}

/// Denial rate per rendering provider, highest first
pub fn by_provider(table: &ClaimTable) -> Option<Vec<GroupRate>> {
    let groups = tally_by(table, CanonicalField::Provider)?;
    Some(rates_descending(&groups))
}

/// Procedure code x payer cross-tabulation of denial rates
pub fn heatmap(table: &ClaimTable) -> Option<DenialHeatmap> {
    if !table.has(CanonicalField::ProcedureCode) || !table.has(CanonicalField::Payer) {
        return None;
    }

    let mut cells: BTreeMap<(String, String), Tally> = BTreeMap::new();
    for record in &table.records {
        let key = (
            group_key(record, CanonicalField::ProcedureCode),
            group_key(record, CanonicalField::Payer),
        );
        cells.entry(key).or_default().add(record);
    }

    let mut procedure_codes: Vec<String> = cells.keys().map(|(c, _)| c.clone()).collect();
    procedure_codes.dedup();
    let mut payers: Vec<String> = cells.keys().map(|(_, p)| p.clone()).collect();
    payers.sort();
    payers.dedup();

    let grid = procedure_codes
        .iter()
        .map(|code| {
            payers
                .iter()
                .map(|payer| {
                    cells
                        .get(&(code.clone(), payer.clone()))
                        .map(Tally::rate)
                })
                .collect()
        })
        .collect();

    Some(DenialHeatmap {
        procedure_codes,
        payers,
        cells: grid,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::ingestion::RawTable;
    use crate::pipeline::processing::coercion::coerce_records;
    use crate::pipeline::processing::normalize::ColumnNormalizer;

    fn claims(columns: &[&str], rows: &[&[&str]]) -> ClaimTable {
        let raw = RawTable {
            header_row: 0,
            source_columns: columns.iter().map(|s| s.to_string()).collect(),
            columns: columns.iter().map(|s| s.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| {
                    r.iter()
                        .map(|c| if c.is_empty() { None } else { Some(c.to_string()) })
                        .collect()
                })
                .collect(),
        };
        let mapping = ColumnNormalizer::default().normalize(&raw.columns);
        coerce_records(&raw, mapping)
    }

    fn sample() -> ClaimTable {
        claims(
            &["cpt", "payer", "provider", "paid", "balance", "denial_reason"],
            &[
                &["99213", "Aetna", "Dr. Lee", "0", "$100", "Missing modifier"],
                &["99213", "Aetna", "Dr. Lee", "80", "0", ""],
                &["99214", "Cigna", "Dr. Kim", "0", "$250.50", "Prior auth"],
                &["99214", "Aetna", "Dr. Lee", "95", "0", ""],
                &["", "Cigna", "", "60", "10", ""],
            ],
        )
    }

    #[test]
    fn test_by_procedure_counts_and_rates() {
        let table = sample();
        let summary = by_procedure(&table).unwrap();

        let total: usize = summary.iter().map(|s| s.claims).sum();
        assert_eq!(total, table.len());
        assert!(summary.iter().all(|s| (0.0..=100.0).contains(&s.denial_rate)));

        // 99213 and 99214 tie at 50%; ascending code order is kept
        assert_eq!(summary[0].procedure_code, "99213");
        assert_eq!(summary[0].denials, 1);
        assert_eq!(summary[0].denial_rate, 50.0);
        assert_eq!(summary[1].procedure_code, "99214");
        assert_eq!(summary[2].procedure_code, BLANK_GROUP_LABEL);
        assert_eq!(summary[2].denial_rate, 0.0);
    }

    #[test]
    fn test_top_by_denials() {
        let summary = vec![
            ProcedureDenialSummary { procedure_code: "A".into(), claims: 10, denials: 1, denial_rate: 10.0 },
            ProcedureDenialSummary { procedure_code: "B".into(), claims: 2, denials: 2, denial_rate: 100.0 },
            ProcedureDenialSummary { procedure_code: "C".into(), claims: 50, denials: 5, denial_rate: 10.0 },
        ];
        let top = top_by_denials(&summary, 2);
        let codes: Vec<&str> = top.iter().map(|s| s.procedure_code.as_str()).collect();
        assert_eq!(codes, vec!["C", "B"]);
    }

    #[test]
    fn test_by_payer_sorts_independently() {
        let payer = by_payer(&sample()).unwrap();

        // Aetna: 1/3 denied, Cigna: 1/2 denied
        assert_eq!(payer.denial_rates[0].group, "Cigna");
        assert_eq!(payer.denial_rates[0].denial_rate, 50.0);
        assert_eq!(payer.denial_rates[1].group, "Aetna");
        assert!((payer.denial_rates[1].denial_rate - 100.0 / 3.0).abs() < 1e-9);

        assert_eq!(payer.lost_revenue[0].group, "Cigna");
        assert_eq!(payer.lost_revenue[0].amount, 260.5);
        assert_eq!(payer.lost_revenue[1].amount, 100.0);
    }

    #[test]
    fn test_by_provider() {
        let providers = by_provider(&sample()).unwrap();
        let groups: Vec<&str> = providers.iter().map(|g| g.group.as_str()).collect();
        assert_eq!(groups, vec!["Dr. Kim", "Dr. Lee", BLANK_GROUP_LABEL]);
        assert_eq!(providers[0].denial_rate, 100.0);
    }

    #[test]
    fn test_heatmap_cells() {
        let map = heatmap(&sample()).unwrap();
        assert_eq!(map.procedure_codes, vec![BLANK_GROUP_LABEL, "99213", "99214"]);
        assert_eq!(map.payers, vec!["Aetna", "Cigna"]);
        assert_eq!(map.cell("99213", "Aetna"), Some(50.0));
        assert_eq!(map.cell("99214", "Cigna"), Some(100.0));
        assert_eq!(map.cell("99214", "Aetna"), Some(0.0));
        assert_eq!(map.cell("99213", "Cigna"), None);
    }

    #[test]
    fn test_unmapped_columns_are_not_applicable() {
        let table = claims(&["visit_date", "paid"], &[&["2024-01-02", "0"]]);
        assert!(by_procedure(&table).is_none());
        assert!(by_payer(&table).is_none());
        assert!(by_provider(&table).is_none());
        assert!(heatmap(&table).is_none());
    }

    #[test]
    fn test_missing_balance_gives_zero_lost_revenue() {
        let table = claims(
            &["cpt", "payer", "paid"],
            &[&["99213", "Aetna", "0"], &["99214", "Cigna", "12"]],
        );
        let payer = by_payer(&table).unwrap();
        assert!(payer.lost_revenue.iter().all(|g| g.amount == 0.0));
        assert_eq!(payer.lost_revenue.len(), 2);
    }
}
