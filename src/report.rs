use std::fmt::Write;

use crate::pipeline::processing::aggregate::{self, GroupAmount, GroupRate};
use crate::pipeline::AnalysisReport;

/// Which part of the analysis to print
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum View {
    #[default]
    All,
    Diagnostics,
    Procedures,
    RootCauses,
    Recommendations,
    Payers,
    Providers,
    LostRevenue,
    Heatmap,
}

/// Render one view (or all of them) as plain text
pub fn render(report: &AnalysisReport, view: View, top_n: usize) -> String {
    match view {
        View::All => [
            render_diagnostics(report),
            render_procedures(report, top_n),
            render_root_causes(report),
            render_recommendations(&report.recommendations),
            render_payers(report, top_n),
            render_providers(report, top_n),
            render_lost_revenue(report, top_n),
            render_heatmap(report),
        ]
        .join("\n"),
        View::Diagnostics => render_diagnostics(report),
        View::Procedures => render_procedures(report, top_n),
        View::RootCauses => render_root_causes(report),
        View::Recommendations => render_recommendations(&report.recommendations),
        View::Payers => render_payers(report, top_n),
        View::Providers => render_providers(report, top_n),
        View::LostRevenue => render_lost_revenue(report, top_n),
        View::Heatmap => render_heatmap(report),
    }
}

/// Left-align the first column, right-align the rest
fn table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.chars().count());
            }
        }
    }

    let format_row = |cells: Vec<&str>| -> String {
        cells
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                if i == 0 {
                    format!("{:<width$}", cell, width = widths[i])
                } else {
                    format!("{:>width$}", cell, width = widths[i])
                }
            })
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = String::new();
    let _ = writeln!(out, "   {}", format_row(headers.to_vec()));
    let rule: usize = widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1);
    let _ = writeln!(out, "   {}", "-".repeat(rule));
    for row in rows {
        let _ = writeln!(out, "   {}", format_row(row.iter().map(String::as_str).collect()));
    }
    out
}

fn rate_rows(groups: &[GroupRate], top_n: usize) -> Vec<Vec<String>> {
    groups
        .iter()
        .take(top_n)
        .map(|g| vec![g.group.clone(), g.claims.to_string(), format!("{:.1}", g.denial_rate)])
        .collect()
}

fn amount_rows(groups: &[GroupAmount], top_n: usize) -> Vec<Vec<String>> {
    groups
        .iter()
        .take(top_n)
        .map(|g| vec![g.group.clone(), format!("${:.2}", g.amount)])
        .collect()
}

pub fn render_diagnostics(report: &AnalysisReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "✅ Data loaded successfully! Shape: ({}, {})",
        report.shape.0, report.shape.1
    );
    if report.header_row > 0 {
        let _ = writeln!(out, "   Header found after {} leading rows", report.header_row);
    }
    if report.claims.coercion_warnings > 0 {
        let _ = writeln!(
            out,
            "   ⚠️  {} numeric values could not be parsed and were read as 0",
            report.claims.coercion_warnings
        );
    }

    let _ = writeln!(out, "\n🔎 Detected column mapping (standard → original):");
    for (canonical, source) in &report.detected_mapping {
        let _ = writeln!(out, "   {:<18} {}", canonical, source);
    }

    let _ = writeln!(out, "\n   Columns after cleanup: {}", report.claims.columns.join(", "));
    out
}

pub fn render_procedures(report: &AnalysisReport, top_n: usize) -> String {
    let mut out = String::from("1️⃣  Top Denied CPT Codes\n");
    let summary = match &report.procedure_summary {
        Some(s) if !s.is_empty() => s,
        _ => {
            out.push_str("   ⚠️  CPT_Code column not found, skipping CPT analysis.\n");
            return out;
        }
    };

    let rows: Vec<Vec<String>> = summary
        .iter()
        .take(top_n)
        .map(|s| {
            vec![
                s.procedure_code.clone(),
                s.claims.to_string(),
                s.denials.to_string(),
                format!("{:.1}", s.denial_rate),
            ]
        })
        .collect();
    out.push_str(&table(&["CPT_Code", "claims", "denials", "denial_rate"], &rows));

    let by_count: Vec<Vec<String>> = aggregate::top_by_denials(summary, top_n)
        .into_iter()
        .map(|s| vec![s.procedure_code, s.denials.to_string()])
        .collect();
    out.push_str("\n   Top CPT Codes by Denial Count\n");
    out.push_str(&table(&["CPT_Code", "denials"], &by_count));
    out
}

pub fn render_root_causes(report: &AnalysisReport) -> String {
    let mut out = String::from("2️⃣  Detect Root Causes\n");
    for insight in &report.root_causes {
        let _ = writeln!(out, "   • {}", insight);
    }
    out
}

pub fn render_recommendations(recommendations: &[String]) -> String {
    let mut out = String::from("3️⃣  Recommend Fixes & Strategies\n");
    for rec in recommendations {
        let _ = writeln!(out, "   ✔ {}", rec);
    }
    out
}

pub fn render_payers(report: &AnalysisReport, top_n: usize) -> String {
    let mut out = String::from("📊 Denial Rates by Payer\n");
    match &report.payer_summary {
        Some(p) => out.push_str(&table(
            &["Insurance_Company", "claims", "denial_rate"],
            &rate_rows(&p.denial_rates, top_n),
        )),
        None => out.push_str("   ⚠️  Insurance_Company column not found, skipping payer analysis.\n"),
    }
    out
}

pub fn render_providers(report: &AnalysisReport, top_n: usize) -> String {
    let mut out = String::from("📊 Denial Rates by Provider\n");
    match &report.provider_summary {
        Some(p) => out.push_str(&table(
            &["Physician_Name", "claims", "denial_rate"],
            &rate_rows(p, top_n),
        )),
        None => out.push_str("   ⚠️  Physician_Name column not found, skipping provider analysis.\n"),
    }
    out
}

pub fn render_lost_revenue(report: &AnalysisReport, top_n: usize) -> String {
    let mut out = String::from("💸 Lost Revenue by Payer\n");
    match &report.payer_summary {
        Some(p) => out.push_str(&table(
            &["Insurance_Company", "lost_revenue"],
            &amount_rows(&p.lost_revenue, top_n),
        )),
        None => out.push_str("   ⚠️  Insurance_Company column not found, skipping lost revenue.\n"),
    }
    out
}

pub fn render_heatmap(report: &AnalysisReport) -> String {
    let mut out = String::from("🔥 Denial Rates Heatmap (CPT vs Payer)\n");
    let Some(map) = &report.heatmap else {
        out.push_str("   ⚠️  CPT_Code and Insurance_Company columns are both required, skipping heatmap.\n");
        return out;
    };

    let mut headers: Vec<&str> = vec!["CPT_Code"];
    headers.extend(map.payers.iter().map(String::as_str));

    let rows: Vec<Vec<String>> = map
        .procedure_codes
        .iter()
        .zip(&map.cells)
        .map(|(code, cells)| {
            let mut row = vec![code.clone()];
            row.extend(cells.iter().map(|c| match c {
                Some(rate) => format!("{:.1}", rate),
                None => "-".to_string(),
            }));
            row
        })
        .collect();

    out.push_str(&table(&headers, &rows));
    out
}
