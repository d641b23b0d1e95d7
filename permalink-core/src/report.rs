// Reindex summaries and rewrite listings

use crate::reindex::ReindexSummary;
use colored::Colorize;
use permalink_engine::{GenerationWarning, UrlRewrite};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

const RULE: &str =
    "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
    Csv,
    Markdown,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            "csv" => Some(ReportFormat::Csv),
            "markdown" | "md" => Some(ReportFormat::Markdown),
            _ => None,
        }
    }
}

pub fn generate_reindex_report(
    summary: &ReindexSummary,
    format: ReportFormat,
) -> Result<String, serde_json::Error> {
    match format {
        ReportFormat::Text => Ok(reindex_text(summary)),
        ReportFormat::Json => reindex_json(summary),
        ReportFormat::Csv => Ok(reindex_csv(summary)),
        ReportFormat::Markdown => Ok(reindex_markdown(summary)),
    }
}

fn reindex_text(summary: &ReindexSummary) -> String {
    let counts = &summary.counts;
    let mut report = String::new();

    report.push_str(RULE);
    report.push('\n');
    report.push_str("                          PERMALINK REINDEX REPORT\n");
    report.push_str(RULE);
    report.push_str("\n\n");

    report.push_str(&format!("Run ID:       {}\n", summary.run_id));
    report.push_str(&format!("Catalog:      {}\n", summary.catalog));
    report.push_str(&format!(
        "Started:      {}\n",
        summary.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    let duration = summary.finished_at - summary.started_at;
    report.push_str(&format!(
        "Duration:     {:.3} seconds\n\n",
        duration.num_milliseconds() as f64 / 1000.0
    ));

    report.push_str(&format!("Entities:     {}\n", counts.entities));
    report.push_str(&format!("  Inserted    {}\n", counts.inserted));
    report.push_str(&format!("  Updated     {}\n", counts.updated));
    report.push_str(&format!("  Redirected  {}\n", counts.redirected));
    report.push_str(&format!("  Superseded  {}\n", counts.superseded));
    report.push_str(&format!("  Unchanged   {}\n", counts.unchanged));
    report.push_str(&format!("  Failed      {}\n", counts.failed));
    report.push_str(&format!("  Warnings    {}\n", counts.warnings));

    let failures: Vec<_> = summary.failures().collect();
    if !failures.is_empty() {
        report.push('\n');
        report.push_str(RULE);
        report.push_str("\nFAILURES\n");
        report.push_str(RULE);
        report.push_str("\n\n");
        for failure in failures {
            report.push_str(&format!(
                "  {} {}: {}\n",
                failure.entity_type,
                failure.entity_id,
                failure.error.as_deref().unwrap_or_default()
            ));
        }
    }

    let warnings: Vec<_> = summary.reports.iter().flat_map(|r| r.warnings()).collect();
    if !warnings.is_empty() {
        report.push('\n');
        report.push_str(RULE);
        report.push_str("\nWARNINGS\n");
        report.push_str(RULE);
        report.push_str("\n\n");
        for warning in warnings {
            report.push_str(&format!("  {}\n", warning));
        }
    }

    report.push('\n');
    report
}

fn reindex_json(summary: &ReindexSummary) -> Result<String, serde_json::Error> {
    let failures: Vec<_> = summary
        .failures()
        .map(|r| {
            serde_json::json!({
                "entity_type": r.entity_type,
                "entity_id": r.entity_id,
                "error": r.error,
            })
        })
        .collect();
    let warnings: Vec<&GenerationWarning> =
        summary.reports.iter().flat_map(|r| r.warnings()).collect();

    let json_report = serde_json::json!({
        "report": {
            "metadata": {
                "generator": "Permalink",
                "version": env!("CARGO_PKG_VERSION"),
                "generated_at": chrono::Utc::now().to_rfc3339(),
                "format": "json"
            },
            "run": {
                "id": summary.run_id,
                "catalog": summary.catalog,
                "started_at": summary.started_at.to_rfc3339(),
                "finished_at": summary.finished_at.to_rfc3339(),
            },
            "counts": summary.counts,
            "failures": failures,
            "warnings": warnings,
        }
    });

    serde_json::to_string_pretty(&json_report)
}

fn reindex_csv(summary: &ReindexSummary) -> String {
    let mut csv = String::from("entity_type,entity_id,status,inserted,updated,retired,warnings,error\n");
    for report in &summary.reports {
        let (status, inserted, updated, retired) = match &report.outcome {
            Some(outcome) => {
                let r = &outcome.reconciliation;
                let status = if r.has_changes() { "changed" } else { "unchanged" };
                (
                    status,
                    r.to_insert.len(),
                    r.to_update.len(),
                    r.to_delete_or_redirect.len(),
                )
            }
            None => ("failed", 0, 0, 0),
        };
        csv.push_str(&format!(
            "{},{},{},{},{},{},{},{}\n",
            report.entity_type,
            report.entity_id,
            status,
            inserted,
            updated,
            retired,
            report.warnings().len(),
            csv_field(report.error.as_deref().unwrap_or_default())
        ));
    }
    csv
}

fn reindex_markdown(summary: &ReindexSummary) -> String {
    let counts = &summary.counts;
    let mut md = String::from("# Permalink Reindex Report\n\n");
    md.push_str(&format!("- **Run:** `{}`\n", summary.run_id));
    md.push_str(&format!("- **Catalog:** `{}`\n", summary.catalog));
    md.push_str(&format!("- **Started:** {}\n\n", summary.started_at.to_rfc3339()));

    md.push_str("| Entities | Inserted | Updated | Redirected | Superseded | Unchanged | Failed | Warnings |\n");
    md.push_str("|---|---|---|---|---|---|---|---|\n");
    md.push_str(&format!(
        "| {} | {} | {} | {} | {} | {} | {} | {} |\n",
        counts.entities,
        counts.inserted,
        counts.updated,
        counts.redirected,
        counts.superseded,
        counts.unchanged,
        counts.failed,
        counts.warnings
    ));

    let failures: Vec<_> = summary.failures().collect();
    if !failures.is_empty() {
        md.push_str("\n## Failures\n\n");
        for failure in failures {
            md.push_str(&format!(
                "- {} `{}`: {}\n",
                failure.entity_type,
                failure.entity_id,
                failure.error.as_deref().unwrap_or_default()
            ));
        }
    }
    md
}

/// Renders rewrites for the `generate` and `list` commands.
pub fn render_rewrites(
    rewrites: &[UrlRewrite],
    format: ReportFormat,
) -> Result<String, serde_json::Error> {
    match format {
        ReportFormat::Text => Ok(rewrites_text(rewrites)),
        ReportFormat::Json => serde_json::to_string_pretty(rewrites),
        ReportFormat::Csv => Ok(rewrites_csv(rewrites)),
        ReportFormat::Markdown => Ok(rewrites_markdown(rewrites)),
    }
}

fn rewrites_text(rewrites: &[UrlRewrite]) -> String {
    if rewrites.is_empty() {
        return "  (no rewrites)\n".to_string();
    }

    let mut out = String::new();
    for (i, rewrite) in rewrites.iter().enumerate() {
        let prefix = if i == rewrites.len() - 1 { "└── " } else { "├── " };
        let arrow = if rewrite.redirect_type.is_redirect() {
            format!("→ {}", rewrite.redirect_type.code()).yellow()
        } else {
            "→".green()
        };
        let origin = if rewrite.is_autogenerated {
            String::new()
        } else {
            format!(" {}", "[custom]".magenta())
        };
        out.push_str(&format!(
            "{}[store {}] {} {} {}{}\n",
            prefix,
            rewrite.store_id,
            rewrite.request_path.bold(),
            arrow,
            rewrite.target_path.dimmed(),
            origin
        ));
    }
    out
}

fn rewrites_csv(rewrites: &[UrlRewrite]) -> String {
    let mut csv = String::from(
        "store_id,entity_type,entity_id,request_path,target_path,redirect_type,is_autogenerated,category_id\n",
    );
    for rewrite in rewrites {
        csv.push_str(&format!(
            "{},{},{},{},{},{},{},{}\n",
            rewrite.store_id,
            rewrite.entity_type,
            rewrite.entity_id,
            csv_field(&rewrite.request_path),
            csv_field(&rewrite.target_path),
            rewrite.redirect_type.code(),
            rewrite.is_autogenerated,
            rewrite
                .category_id()
                .map(|id| id.to_string())
                .unwrap_or_default()
        ));
    }
    csv
}

fn rewrites_markdown(rewrites: &[UrlRewrite]) -> String {
    let mut md = String::from("| Store | Entity | Request path | Target path | Redirect |\n");
    md.push_str("|---|---|---|---|---|\n");
    for rewrite in rewrites {
        md.push_str(&format!(
            "| {} | {} {} | `{}` | `{}` | {} |\n",
            rewrite.store_id,
            rewrite.entity_type,
            rewrite.entity_id,
            rewrite.request_path,
            rewrite.target_path,
            rewrite.redirect_type.code()
        ));
    }
    md
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parsing() {
        assert_eq!(ReportFormat::from_str("JSON"), Some(ReportFormat::Json));
        assert_eq!(ReportFormat::from_str("md"), Some(ReportFormat::Markdown));
        assert_eq!(ReportFormat::from_str("html"), None);
    }

    #[test]
    fn test_csv_field_quoting() {
        assert_eq!(csv_field("plain.html"), "plain.html");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
