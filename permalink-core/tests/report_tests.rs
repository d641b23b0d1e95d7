// Tests for report rendering

use chrono::Utc;
use permalink_core::data::RunCounts;
use permalink_core::reindex::ReindexSummary;
use permalink_core::report::{
    ReportFormat, generate_reindex_report, render_rewrites, save_report,
};
use permalink_core::worker::EntityReport;
use permalink_engine::{EntityType, RedirectType, RegenerationOutcome, UrlRewrite};
use std::fs;
use tempfile::TempDir;

fn summary() -> ReindexSummary {
    let now = Utc::now();
    ReindexSummary {
        run_id: "run-1".to_string(),
        catalog: "catalog.json".to_string(),
        started_at: now,
        finished_at: now,
        counts: RunCounts {
            entities: 2,
            inserted: 3,
            failed: 1,
            ..Default::default()
        },
        reports: vec![
            EntityReport::new(EntityType::Product, 1, RegenerationOutcome::default()),
            EntityReport::with_error(
                EntityType::Product,
                2,
                "Request path 'shoe.html' in store 0 is already used".to_string(),
            ),
        ],
    }
}

fn rewrites() -> Vec<UrlRewrite> {
    vec![
        UrlRewrite::generated(EntityType::Product, 1, 0, "shoe.html", "catalog/product/view/id/1"),
        UrlRewrite::generated(EntityType::Product, 1, 0, "old,shoe.html", "shoe.html")
            .with_redirect(RedirectType::Permanent),
    ]
}

#[test]
fn test_text_report_lists_failures() {
    let report = generate_reindex_report(&summary(), ReportFormat::Text).unwrap();

    assert!(report.contains("PERMALINK REINDEX REPORT"));
    assert!(report.contains("run-1"));
    assert!(report.contains("FAILURES"));
    assert!(report.contains("product 2"));
}

#[test]
fn test_json_report_is_valid_json() {
    let report = generate_reindex_report(&summary(), ReportFormat::Json).unwrap();
    let value: serde_json::Value = serde_json::from_str(&report).unwrap();

    assert_eq!(value["report"]["run"]["id"], "run-1");
    assert_eq!(value["report"]["counts"]["inserted"], 3);
    assert_eq!(value["report"]["failures"].as_array().unwrap().len(), 1);
}

#[test]
fn test_csv_report_has_row_per_entity() {
    let report = generate_reindex_report(&summary(), ReportFormat::Csv).unwrap();
    let lines: Vec<_> = report.lines().collect();

    assert_eq!(lines.len(), 3);
    assert!(lines[1].starts_with("product,1,unchanged"));
    assert!(lines[2].starts_with("product,2,failed"));
}

#[test]
fn test_markdown_report_table() {
    let report = generate_reindex_report(&summary(), ReportFormat::Markdown).unwrap();
    assert!(report.starts_with("# Permalink Reindex Report"));
    assert!(report.contains("| 2 | 3 | 0 | 0 | 0 | 0 | 1 | 0 |"));
}

#[test]
fn test_render_rewrites_formats() {
    let rows = rewrites();

    let json = render_rewrites(&rows, ReportFormat::Json).unwrap();
    let parsed: Vec<UrlRewrite> = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, rows);

    let csv = render_rewrites(&rows, ReportFormat::Csv).unwrap();
    assert!(csv.contains("\"old,shoe.html\""));
    assert!(csv.contains(",301,"));

    let md = render_rewrites(&rows, ReportFormat::Markdown).unwrap();
    assert!(md.contains("`shoe.html`"));

    colored::control::set_override(false);
    let text = render_rewrites(&rows, ReportFormat::Text).unwrap();
    assert!(text.contains("shoe.html → catalog/product/view/id/1"));
    assert!(text.contains("→ 301"));
}

#[test]
fn test_render_empty_listing() {
    colored::control::set_override(false);
    let text = render_rewrites(&[], ReportFormat::Text).unwrap();
    assert!(text.contains("no rewrites"));
}

#[test]
fn test_save_report() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("report.txt");

    save_report("hello", &path).unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), "hello");
}
