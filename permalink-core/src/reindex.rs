use crate::catalog::CatalogSnapshot;
use crate::data::{Database, RunCounts, RunStatus};
use crate::error::Result;
use crate::worker::{EntityReport, EntityReportCallback, RegenerationRequest, RegenerationWorker};
use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use permalink_engine::RewriteOptions;
use permalink_engine::catalog::CategoryId;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{error, warn};

/// Options for configuring a reindex run
pub struct ReindexOptions {
    pub catalog: CatalogSnapshot,
    /// Label stored with the run, usually the snapshot path
    pub catalog_label: String,
    pub rewrite: RewriteOptions,
    pub root_category_id: Option<CategoryId>,
    pub products_only: bool,
    pub queue_capacity: usize,
    pub show_progress_bars: bool,
}

/// Callback for reporting reindex progress
pub type ReindexProgressCallback = Arc<dyn Fn(String) + Send + Sync>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReindexSummary {
    pub run_id: String,
    pub catalog: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub counts: RunCounts,
    pub reports: Vec<EntityReport>,
}

impl ReindexSummary {
    pub fn failures(&self) -> impl Iterator<Item = &EntityReport> {
        self.reports.iter().filter(|r| r.error.is_some())
    }
}

/// Closes a run whose worker went down together with the database handle.
fn mark_run_failed(db_path: Option<&Path>, run_id: &str) {
    let Some(path) = db_path else {
        warn!("Run {} stays open, its in-memory database is gone", run_id);
        return;
    };
    let closed = Database::new(path)
        .and_then(|db| db.finish_run(run_id, RunStatus::Failed, &RunCounts::default()));
    if let Err(e) = closed {
        warn!("Could not mark run {} as failed: {}", run_id, e);
    }
}

/// Regenerate the rewrites of every entity in the snapshot.
///
/// Categories are queued before products. Each entity is reconciled and
/// persisted by the regeneration worker; failures are recorded per entity and
/// do not stop the run.
pub async fn execute_reindex(
    db: Database,
    options: ReindexOptions,
    progress_callback: Option<ReindexProgressCallback>,
) -> Result<(Database, ReindexSummary)> {
    let ReindexOptions {
        catalog,
        catalog_label,
        rewrite,
        root_category_id,
        products_only,
        queue_capacity,
        show_progress_bars,
    } = options;

    let started_at = Utc::now();
    let run_id = db.create_run(&catalog_label)?;
    let db_path = db.path();

    let total = catalog.products.len()
        + if products_only {
            0
        } else {
            catalog.categories.len()
        };

    let progress_bar = if show_progress_bars {
        let pb = ProgressBar::new(total as u64);
        if let Ok(style) =
            ProgressStyle::default_bar().template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(style);
        }
        pb.set_message("Regenerating rewrites...");
        Some(Arc::new(pb))
    } else {
        None
    };

    let failed_count = Arc::new(AtomicUsize::new(0));
    let on_report: EntityReportCallback = {
        let pb = progress_bar.clone();
        let failed = failed_count.clone();
        let progress = progress_callback.clone();
        Arc::new(move |report: &EntityReport| {
            if let Some(ref error) = report.error {
                failed.fetch_add(1, Ordering::Relaxed);
                if let Some(ref callback) = progress {
                    callback(format!(
                        "[!] {} {}: {}",
                        report.entity_type, report.entity_id, error
                    ));
                }
            }
            if let Some(ref pb) = pb {
                pb.inc(1);
            }
        })
    };

    let scopes = Arc::new(catalog.scope_generator(rewrite));
    let worker = RegenerationWorker::spawn(db, scopes, queue_capacity, Some(on_report));

    let mut submit_result = Ok(());
    if !products_only {
        for category in catalog.categories.iter().filter(|c| !c.is_root()) {
            submit_result = worker
                .submit(RegenerationRequest::Category(category.clone()))
                .await;
            if submit_result.is_err() {
                break;
            }
        }
        // Root categories produce nothing but still count towards progress.
        if let Some(ref pb) = progress_bar {
            pb.inc(catalog.categories.iter().filter(|c| c.is_root()).count() as u64);
        }
    }

    if submit_result.is_ok() {
        for product in &catalog.products {
            submit_result = worker
                .submit(RegenerationRequest::Product {
                    product: product.clone(),
                    root_category_id,
                })
                .await;
            if submit_result.is_err() {
                break;
            }
        }
    }

    let (db, stats) = match worker.finish().await {
        Ok(finished) => finished,
        Err(e) => {
            error!("Regeneration worker died during run {}: {}", run_id, e);
            mark_run_failed(db_path.as_deref(), &run_id);
            return Err(e);
        }
    };
    let status = if submit_result.is_ok() {
        RunStatus::Completed
    } else {
        RunStatus::Failed
    };
    db.finish_run(&run_id, status, &stats.counts)?;
    submit_result?;

    if let Some(ref pb) = progress_bar {
        pb.finish_with_message(format!(
            "Reindex complete! {} entities, {} failed",
            stats.counts.entities,
            failed_count.load(Ordering::Relaxed)
        ));
    }

    Ok((
        db,
        ReindexSummary {
            run_id,
            catalog: catalog_label,
            started_at,
            finished_at: Utc::now(),
            counts: stats.counts,
            reports: stats.reports,
        },
    ))
}
