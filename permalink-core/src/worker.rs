// Single regeneration worker fed through a bounded queue

use crate::data::{Database, RunCounts};
use crate::error::{CoreError, Result};
use permalink_engine::catalog::{Category, CategoryId, EntityId, Product};
use permalink_engine::reconcile::Retired;
use permalink_engine::{
    CategoryUrlRewriteGenerator, EntityType, GenerationWarning, ProductUrlRewriteGenerator,
    RegenerationOutcome, ScopeRewriteGenerator,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub enum RegenerationRequest {
    Product {
        product: Product,
        root_category_id: Option<CategoryId>,
    },
    Category(Category),
}

impl RegenerationRequest {
    pub fn product(product: Product) -> Self {
        RegenerationRequest::Product {
            product,
            root_category_id: None,
        }
    }

    pub fn entity(&self) -> (EntityType, EntityId) {
        match self {
            RegenerationRequest::Product { product, .. } => (EntityType::Product, product.id),
            RegenerationRequest::Category(category) => (EntityType::Category, category.id),
        }
    }
}

/// Result of one processed request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityReport {
    pub entity_type: EntityType,
    pub entity_id: EntityId,
    pub outcome: Option<RegenerationOutcome>,
    pub error: Option<String>,
}

impl EntityReport {
    pub fn new(entity_type: EntityType, entity_id: EntityId, outcome: RegenerationOutcome) -> Self {
        Self {
            entity_type,
            entity_id,
            outcome: Some(outcome),
            error: None,
        }
    }

    pub fn with_error(entity_type: EntityType, entity_id: EntityId, error: String) -> Self {
        Self {
            entity_type,
            entity_id,
            outcome: None,
            error: Some(error),
        }
    }

    pub fn warnings(&self) -> &[GenerationWarning] {
        self.outcome
            .as_ref()
            .map(|o| o.warnings.as_slice())
            .unwrap_or(&[])
    }
}

/// Everything the worker did before its queue closed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkerStats {
    pub counts: RunCounts,
    pub reports: Vec<EntityReport>,
}

impl WorkerStats {
    fn record(&mut self, report: EntityReport) {
        self.counts.entities += 1;
        match &report.outcome {
            Some(outcome) => {
                let reconciliation = &outcome.reconciliation;
                self.counts.inserted += reconciliation.to_insert.len();
                self.counts.updated += reconciliation.to_update.len();
                self.counts.unchanged += reconciliation.unchanged;
                for retired in &reconciliation.to_delete_or_redirect {
                    match retired {
                        Retired::Redirect { .. } => self.counts.redirected += 1,
                        Retired::Superseded { .. } => self.counts.superseded += 1,
                    }
                }
                self.counts.warnings += outcome.warnings.len();
            }
            None => self.counts.failed += 1,
        }
        self.reports.push(report);
    }
}

/// Called on the worker thread after each request.
pub type EntityReportCallback = Arc<dyn Fn(&EntityReport) + Send + Sync>;

/// Owns the database and processes regeneration requests one at a time.
///
/// Requests for the same entity are therefore never applied concurrently.
/// Dropping every sender (or calling [`RegenerationWorker::finish`]) stops it.
pub struct RegenerationWorker {
    sender: mpsc::Sender<RegenerationRequest>,
    handle: JoinHandle<(Database, WorkerStats)>,
}

impl RegenerationWorker {
    pub fn spawn(
        db: Database,
        scopes: Arc<ScopeRewriteGenerator>,
        capacity: usize,
        on_report: Option<EntityReportCallback>,
    ) -> Self {
        let (sender, mut receiver) = mpsc::channel::<RegenerationRequest>(capacity.max(1));

        let handle = tokio::task::spawn_blocking(move || {
            let mut db = db;
            let products = ProductUrlRewriteGenerator::new(scopes.clone());
            let categories = CategoryUrlRewriteGenerator::new(scopes);
            let mut stats = WorkerStats::default();

            debug!("Regeneration worker started");
            while let Some(request) = receiver.blocking_recv() {
                let (entity_type, entity_id) = request.entity();
                let result = match &request {
                    RegenerationRequest::Product {
                        product,
                        root_category_id,
                    } => products
                        .sync(product, *root_category_id, &mut db)
                        .map_err(CoreError::from),
                    RegenerationRequest::Category(category) => categories
                        .sync(category, &mut db)
                        .map_err(CoreError::from),
                };

                let report = match result {
                    Ok(outcome) => EntityReport::new(entity_type, entity_id, outcome),
                    Err(e) => {
                        warn!("Failed to regenerate {} {}: {}", entity_type, entity_id, e);
                        EntityReport::with_error(entity_type, entity_id, e.to_string())
                    }
                };

                if let Some(ref callback) = on_report {
                    callback(&report);
                }
                stats.record(report);
            }

            info!(
                "Regeneration worker finished: {} entities, {} failed",
                stats.counts.entities, stats.counts.failed
            );
            (db, stats)
        });

        Self { sender, handle }
    }

    /// Queues a request, waiting while the queue is full.
    pub async fn submit(&self, request: RegenerationRequest) -> Result<()> {
        self.sender
            .send(request)
            .await
            .map_err(|_| CoreError::WorkerClosed)
    }

    /// Extra producer handle for pipelines feeding the same worker.
    pub fn sender(&self) -> mpsc::Sender<RegenerationRequest> {
        self.sender.clone()
    }

    /// Closes the queue, waits for pending requests and hands the database back.
    pub async fn finish(self) -> Result<(Database, WorkerStats)> {
        drop(self.sender);
        Ok(self.handle.await?)
    }
}
