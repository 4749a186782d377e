use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::config::Config;
use crate::constants::{DEFAULT_SIMILARITY_THRESHOLD, UNMAPPED_SENTINEL};
use crate::pipeline::utils::StringUtils;
use crate::types::CanonicalField;

/// Outcome of matching one canonical field against the source header
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ColumnMatch {
    /// Best-scoring source column, at or above the threshold
    Mapped {
        source: String,
        index: usize,
        score: u8,
    },
    /// No column reached the threshold; downstream treats the field as absent
    Unmapped { best_score: u8 },
}

/// Canonical field -> source column for one uploaded table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnMapping {
    matches: BTreeMap<CanonicalField, ColumnMatch>,
}

impl ColumnMapping {
    pub fn get(&self, field: CanonicalField) -> &ColumnMatch {
        // Every canonical field is inserted by the normalizer
        self.matches
            .get(&field)
            .unwrap_or(&ColumnMatch::Unmapped { best_score: 0 })
    }

    pub fn source_index(&self, field: CanonicalField) -> Option<usize> {
        match self.get(field) {
            ColumnMatch::Mapped { index, .. } => Some(*index),
            ColumnMatch::Unmapped { .. } => None,
        }
    }

    pub fn source_name(&self, field: CanonicalField) -> Option<&str> {
        match self.get(field) {
            ColumnMatch::Mapped { source, .. } => Some(source.as_str()),
            ColumnMatch::Unmapped { .. } => None,
        }
    }

    pub fn is_mapped(&self, field: CanonicalField) -> bool {
        self.source_index(field).is_some()
    }

    /// Canonical name -> source column name, or `MISSING`
    pub fn detected_mapping(&self) -> BTreeMap<&'static str, String> {
        CanonicalField::ALL
            .into_iter()
            .map(|field| {
                let source = self
                    .source_name(field)
                    .unwrap_or(UNMAPPED_SENTINEL)
                    .to_string();
                (field.canonical_name(), source)
            })
            .collect()
    }
}

/// Fuzzy header matcher mapping arbitrary export columns onto `CanonicalField`s
pub struct ColumnNormalizer {
    variants: Vec<(CanonicalField, Vec<String>)>,
    threshold: u8,
}

impl Default for ColumnNormalizer {
    fn default() -> Self {
        Self::new(
            CanonicalField::ALL
                .into_iter()
                .map(|f| {
                    (
                        f,
                        f.default_variants().iter().map(|v| v.to_string()).collect(),
                    )
                })
                .collect(),
            DEFAULT_SIMILARITY_THRESHOLD,
        )
    }
}

impl ColumnNormalizer {
    /// `variants` must list fields in registration order
    pub fn new(variants: Vec<(CanonicalField, Vec<String>)>, threshold: u8) -> Self {
        Self {
            variants,
            threshold,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            CanonicalField::ALL
                .into_iter()
                .map(|f| (f, config.variants_for(f)))
                .collect(),
            config.normalizer.similarity_threshold,
        )
    }

    /// Match every canonical field against `columns`.
    ///
    /// Fields are resolved in registration order and each claims at most one
    /// column; a claimed column is no longer a candidate for later fields.
    /// Ties go to the first column encountered.
    pub fn normalize(&self, columns: &[String]) -> ColumnMapping {
        let cleaned: Vec<String> = columns
            .iter()
            .map(|c| StringUtils::clean_column_name(c))
            .collect();
        let mut claimed = vec![false; cleaned.len()];
        let mut matches = BTreeMap::new();

        for (field, variants) in &self.variants {
            let mut best: Option<(usize, u8)> = None;

            for (index, column) in cleaned.iter().enumerate() {
                if claimed[index] {
                    continue;
                }
                for variant in variants {
                    let score = StringUtils::similarity_ratio(column, variant);
                    if best.map_or(true, |(_, s)| score > s) {
                        best = Some((index, score));
                    }
                }
            }

            let column_match = match best {
                Some((index, score)) if score >= self.threshold => {
                    claimed[index] = true;
                    debug!(
                        "Mapped {} <- '{}' (score: {})",
                        field, columns[index], score
                    );
                    ColumnMatch::Mapped {
                        source: cleaned[index].clone(),
                        index,
                        score,
                    }
                }
                other => {
                    let best_score = other.map(|(_, s)| s).unwrap_or(0);
                    debug!("No column for {} (best score: {})", field, best_score);
                    ColumnMatch::Unmapped { best_score }
                }
            };
            matches.insert(*field, column_match);
        }

        let mapped = matches
            .values()
            .filter(|m| matches!(m, ColumnMatch::Mapped { .. }))
            .count();
        info!(
            "🔎 Column mapping: {}/{} canonical fields matched",
            mapped,
            matches.len()
        );

        ColumnMapping { matches }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_maps_short_headers() {
        let mapping = ColumnNormalizer::default().normalize(&cols(&["CPT", "Payer", "Paid Amt"]));

        assert_eq!(mapping.source_name(CanonicalField::ProcedureCode), Some("cpt"));
        assert_eq!(mapping.source_name(CanonicalField::Payer), Some("payer"));
        assert_eq!(mapping.source_name(CanonicalField::PaymentAmount), Some("paid_amt"));
        assert!(!mapping.is_mapped(CanonicalField::Provider));
        assert!(!mapping.is_mapped(CanonicalField::Balance));
        assert!(!mapping.is_mapped(CanonicalField::DenialReason));

        let detected = mapping.detected_mapping();
        assert_eq!(detected["CPT_Code"], "cpt");
        assert_eq!(detected["Balance"], "MISSING");
    }

    #[test]
    fn test_canonical_names_map_to_themselves() {
        let canonical: Vec<String> = CanonicalField::ALL
            .iter()
            .map(|f| f.canonical_name().to_string())
            .collect();
        let normalizer = ColumnNormalizer::default();
        let first = normalizer.normalize(&canonical);

        for (i, field) in CanonicalField::ALL.into_iter().enumerate() {
            assert_eq!(
                first.get(field),
                &ColumnMatch::Mapped {
                    source: canonical[i].to_lowercase(),
                    index: i,
                    score: 100
                }
            );
        }

        let second = normalizer.normalize(&canonical);
        assert_eq!(first, second);
    }

    #[test]
    fn test_fuzzy_variants_above_threshold() {
        let mapping = ColumnNormalizer::default().normalize(&cols(&[
            "Insurance Co",
            "Doctor Name",
            "Balance Due",
            "Denial Reason",
        ]));

        assert_eq!(mapping.source_index(CanonicalField::Payer), Some(0));
        assert_eq!(mapping.source_index(CanonicalField::Provider), Some(1));
        assert_eq!(mapping.source_index(CanonicalField::Balance), Some(2));
        assert_eq!(mapping.source_index(CanonicalField::DenialReason), Some(3));
        assert!(!mapping.is_mapped(CanonicalField::ProcedureCode));
    }

    #[test]
    fn test_below_threshold_is_unmapped() {
        let mapping = ColumnNormalizer::default().normalize(&cols(&["Visit Date", "DOS"]));
        for field in CanonicalField::ALL {
            assert!(matches!(
                mapping.get(field),
                ColumnMatch::Unmapped { best_score } if *best_score < 70
            ));
        }
    }

    #[test]
    fn test_first_registered_field_claims_shared_column() {
        // "amount_due" scores >= 70 for both Payment_Amount and Balance
        let mapping = ColumnNormalizer::default().normalize(&cols(&["Amount Due"]));
        assert_eq!(mapping.source_index(CanonicalField::PaymentAmount), Some(0));
        assert!(!mapping.is_mapped(CanonicalField::Balance));
    }

    #[test]
    fn test_first_column_wins_ties() {
        let mapping = ColumnNormalizer::default().normalize(&cols(&["Payer", "payer"]));
        assert_eq!(mapping.source_index(CanonicalField::Payer), Some(0));
    }

    #[test]
    fn test_configured_threshold_and_variants() {
        let config = Config::from_toml_str(
            r#"
            [normalizer]
            similarity_threshold = 90

            [normalizer.extra_variants]
            Balance = ["ar_balance"]
            "#,
        )
        .unwrap();
        let mapping = ColumnNormalizer::from_config(&config)
            .normalize(&cols(&["AR Balance", "Doctor Name"]));

        assert_eq!(mapping.source_index(CanonicalField::Balance), Some(0));
        // 71 clears the default threshold but not 90
        assert!(!mapping.is_mapped(CanonicalField::Provider));
    }
}
