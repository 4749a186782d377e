use serde::Serialize;
use std::collections::BTreeSet;
use tracing::debug;

use crate::pipeline::processing::coercion::ClaimTable;
use crate::types::CanonicalField;

pub const NO_ROOT_CAUSES: &str = "No major root causes detected.";
pub const NO_REASON_COLUMN: &str = "No Denial_Reason column found";

/// Denial categories recognized from free-text reasons, in reporting order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RootCauseCategory {
    Modifier,
    CoveragePolicy,
    Bundling,
    Documentation,
    Authorization,
    Credentialing,
    FeeSchedule,
    NonCovered,
}

impl RootCauseCategory {
    pub const ALL: [RootCauseCategory; 8] = [
        RootCauseCategory::Modifier,
        RootCauseCategory::CoveragePolicy,
        RootCauseCategory::Bundling,
        RootCauseCategory::Documentation,
        RootCauseCategory::Authorization,
        RootCauseCategory::Credentialing,
        RootCauseCategory::FeeSchedule,
        RootCauseCategory::NonCovered,
    ];

    /// Lowercase substrings that place a reason in this category
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            RootCauseCategory::Modifier => &["modifier"],
            RootCauseCategory::CoveragePolicy => &["lcd", "ncd"],
            RootCauseCategory::Bundling => &["bundling", "ncci"],
            RootCauseCategory::Documentation => &["documentation", "missing"],
            RootCauseCategory::Authorization => &["auth"],
            RootCauseCategory::Credentialing => &["credential"],
            RootCauseCategory::FeeSchedule => &["fee schedule"],
            RootCauseCategory::NonCovered => &["non-covered"],
        }
    }

    pub fn remediation(&self) -> &'static str {
        match self {
            RootCauseCategory::Modifier => "Modifier issue → Fix: Add correct CPT modifiers.",
            RootCauseCategory::CoveragePolicy => "LCD/NCD mismatch → Fix: Validate coverage policies.",
            RootCauseCategory::Bundling => "Bundling edits (NCCI) → Fix: Use coding scrubber tools.",
            RootCauseCategory::Documentation => {
                "Lack of documentation → Fix: Improve provider documentation."
            }
            RootCauseCategory::Authorization => "Prior authorization → Fix: Verify payer requirements.",
            RootCauseCategory::Credentialing => "Credentialing issue → Fix: Verify provider enrollment.",
            RootCauseCategory::FeeSchedule => {
                "Charge exceeds fee schedule → Fix: Review payer contracts."
            }
            RootCauseCategory::NonCovered => {
                "Non-covered service → Fix: Verify coverage before billing."
            }
        }
    }

    pub fn matches(&self, reason: &str) -> bool {
        let lower = reason.to_lowercase();
        self.keywords().iter().any(|k| lower.contains(k))
    }
}

/// General denial-prevention practices, independent of the data
pub const RECOMMENDATIONS: [&str; 8] = [
    "Ensure correct CPT modifiers are applied.",
    "Validate claims against payer LCD/NCD policies before submission.",
    "Use coding scrubber tools to catch bundling edits (NCCI).",
    "Improve provider documentation.",
    "Confirm prior authorization requirements.",
    "Verify provider credentialing and enrollment with each payer.",
    "Educate front desk on capturing complete patient/insurance info.",
    "Establish payer-specific denial appeal templates.",
];

pub fn recommend_strategies() -> Vec<String> {
    RECOMMENDATIONS.iter().map(|s| s.to_string()).collect()
}

/// Categories hit by at least one reason, in category order
pub fn categorize<'a, I>(reasons: I) -> Vec<RootCauseCategory>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut hits = BTreeSet::new();
    for reason in reasons {
        for category in RootCauseCategory::ALL {
            if category.matches(reason) {
                debug!("Reason '{}' -> {:?}", reason, category);
                hits.insert(category);
            }
        }
    }
    hits.into_iter().collect()
}

/// One remediation per category present among the distinct denial reasons
pub fn detect_root_causes(table: &ClaimTable) -> Vec<String> {
    if !table.has(CanonicalField::DenialReason) {
        return vec![NO_REASON_COLUMN.to_string()];
    }

    let distinct: BTreeSet<&str> = table
        .records
        .iter()
        .filter_map(|r| r.denial_reason.as_deref())
        .collect();

    let categories = categorize(distinct);
    if categories.is_empty() {
        return vec![NO_ROOT_CAUSES.to_string()];
    }
    categories
        .into_iter()
        .map(|c| c.remediation().to_string())
        .collect()
}
