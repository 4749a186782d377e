use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::error::{AnalyzerError, Result};

/// Declared layout of an uploaded billing export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum FileFormat {
    Csv,
    Spreadsheet,
}

impl FileFormat {
    /// Infer the format from a file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "csv" | "tsv" | "txt" => Ok(FileFormat::Csv),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Ok(FileFormat::Spreadsheet),
            "" => Err(AnalyzerError::UnsupportedFormat(format!(
                "cannot infer format of '{}' without an extension",
                path.display()
            ))),
            other => Err(AnalyzerError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// The fixed schema every source column is matched against.
///
/// Declaration order is the registration order used when two fields
/// compete for the same source column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CanonicalField {
    #[serde(rename = "CPT_Code")]
    ProcedureCode,
    #[serde(rename = "Insurance_Company")]
    Payer,
    #[serde(rename = "Physician_Name")]
    Provider,
    #[serde(rename = "Payment_Amount")]
    PaymentAmount,
    #[serde(rename = "Balance")]
    Balance,
    #[serde(rename = "Denial_Reason")]
    DenialReason,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 6] = [
        CanonicalField::ProcedureCode,
        CanonicalField::Payer,
        CanonicalField::Provider,
        CanonicalField::PaymentAmount,
        CanonicalField::Balance,
        CanonicalField::DenialReason,
    ];

    /// Column name used for this field in the cleaned table
    pub fn canonical_name(&self) -> &'static str {
        match self {
            CanonicalField::ProcedureCode => "CPT_Code",
            CanonicalField::Payer => "Insurance_Company",
            CanonicalField::Provider => "Physician_Name",
            CanonicalField::PaymentAmount => "Payment_Amount",
            CanonicalField::Balance => "Balance",
            CanonicalField::DenialReason => "Denial_Reason",
        }
    }

    /// Built-in header spellings accepted for this field
    pub fn default_variants(&self) -> &'static [&'static str] {
        match self {
            CanonicalField::ProcedureCode => &["cpt", "cpt_code", "procedure", "procedure_code"],
            CanonicalField::Payer => &["insurance", "payer", "insurance_company"],
            CanonicalField::Provider => &["physician", "provider", "doctor", "physician_name"],
            CanonicalField::PaymentAmount => &[
                "payment",
                "paid",
                "payment_amount",
                "amount_paid",
                "paid_amt",
                "paid_amount",
            ],
            CanonicalField::Balance => &["balance", "amt_due", "outstanding", "due"],
            CanonicalField::DenialReason => &["denial", "reason", "denial_reason"],
        }
    }

    pub fn from_canonical_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.canonical_name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical_name())
    }
}

/// One billed claim line after normalization and coercion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimRecord {
    #[serde(rename = "CPT_Code")]
    pub procedure_code: Option<String>,
    #[serde(rename = "Insurance_Company")]
    pub payer: Option<String>,
    #[serde(rename = "Physician_Name")]
    pub provider: Option<String>,
    #[serde(rename = "Payment_Amount")]
    pub payment_amount: f64,
    #[serde(rename = "Balance")]
    pub balance: f64,
    #[serde(rename = "Denial_Reason")]
    pub denial_reason: Option<String>,
    #[serde(rename = "Denied")]
    pub denied: bool,
}

impl ClaimRecord {
    /// Text value of a grouping field, if the record carries one
    pub fn key(&self, field: CanonicalField) -> Option<&str> {
        match field {
            CanonicalField::ProcedureCode => self.procedure_code.as_deref(),
            CanonicalField::Payer => self.payer.as_deref(),
            CanonicalField::Provider => self.provider.as_deref(),
            CanonicalField::DenialReason => self.denial_reason.as_deref(),
            CanonicalField::PaymentAmount | CanonicalField::Balance => None,
        }
    }
}
