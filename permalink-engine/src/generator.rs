// Entry points used by save and reindex pipelines

use crate::catalog::{Category, CategoryId, Product, Scope};
use crate::error::{Result, RewriteError};
use crate::reconcile::{Reconciler, Reconciliation};
use crate::rewrite::{EntityType, RewriteSet, UrlRewrite};
use crate::scope::{GeneratedRewrites, GenerationWarning, ScopeRewriteGenerator};
use crate::store::{RewriteStore, existing_for};
use crate::visibility::{should_generate, visible_stores};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Result of regenerating one entity against its stored rewrites.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegenerationOutcome {
    /// Inserts followed by updates
    pub rewrites: Vec<UrlRewrite>,
    /// Retired rows turned into permanent redirects
    pub redirects: Vec<UrlRewrite>,
    pub reconciliation: Reconciliation,
    pub warnings: Vec<GenerationWarning>,
}

impl RegenerationOutcome {
    fn from_parts(reconciliation: Reconciliation, warnings: Vec<GenerationWarning>) -> Self {
        Self {
            rewrites: reconciliation.changed_rows(),
            redirects: reconciliation.redirects(),
            reconciliation,
            warnings,
        }
    }
}

/// Error of a store-backed regeneration: either the engine or the store failed.
#[derive(Debug, thiserror::Error)]
pub enum SyncError<E: std::error::Error + 'static> {
    #[error(transparent)]
    Rewrite(#[from] RewriteError),

    #[error("rewrite store error: {0}")]
    Store(#[source] E),
}

#[derive(Debug, Clone)]
pub struct ProductUrlRewriteGenerator {
    scopes: Arc<ScopeRewriteGenerator>,
    reconciler: Reconciler,
}

impl ProductUrlRewriteGenerator {
    pub const ENTITY_TYPE: EntityType = EntityType::Product;

    pub fn new(scopes: Arc<ScopeRewriteGenerator>) -> Self {
        Self {
            scopes,
            reconciler: Reconciler::new(),
        }
    }

    pub fn scopes(&self) -> &ScopeRewriteGenerator {
        &self.scopes
    }

    /// Rewrites for every store the product is visible in.
    ///
    /// A product hidden everywhere yields an empty set rather than an error.
    pub fn generate(
        &self,
        product: &Product,
        root_category_id: Option<CategoryId>,
    ) -> Result<GeneratedRewrites> {
        let visible = visible_stores(product, self.scopes.stores());
        if !should_generate(product, &visible) {
            debug!("Product {} is not visible in any store, nothing to generate", product.id);
            return Ok(GeneratedRewrites::empty());
        }

        self.scopes.generate(product, Scope::Global, root_category_id)
    }

    pub fn regenerate(
        &self,
        product: &Product,
        root_category_id: Option<CategoryId>,
        existing: &RewriteSet,
    ) -> Result<RegenerationOutcome> {
        let generated = self.generate(product, root_category_id)?;
        let reconciliation = self.reconciler.reconcile(&generated.rewrites, existing)?;

        info!(
            "Product {}: {} insert, {} update, {} retired",
            product.id,
            reconciliation.to_insert.len(),
            reconciliation.to_update.len(),
            reconciliation.to_delete_or_redirect.len()
        );

        Ok(RegenerationOutcome::from_parts(reconciliation, generated.warnings))
    }

    /// Loads the stored rows from `store`, regenerates and applies the diff.
    pub fn sync<S: RewriteStore>(
        &self,
        product: &Product,
        root_category_id: Option<CategoryId>,
        store: &mut S,
    ) -> std::result::Result<RegenerationOutcome, SyncError<S::Error>>
    where
        S::Error: 'static,
    {
        let generated = self.generate(product, root_category_id)?;
        let existing = existing_for(&*store, Self::ENTITY_TYPE, product.id, &generated.rewrites)
            .map_err(SyncError::Store)?;
        let reconciliation = self.reconciler.reconcile(&generated.rewrites, &existing)?;

        if reconciliation.has_changes() {
            store.apply(&reconciliation).map_err(SyncError::Store)?;
        }

        Ok(RegenerationOutcome::from_parts(reconciliation, generated.warnings))
    }
}

#[derive(Debug, Clone)]
pub struct CategoryUrlRewriteGenerator {
    scopes: Arc<ScopeRewriteGenerator>,
    reconciler: Reconciler,
}

impl CategoryUrlRewriteGenerator {
    pub const ENTITY_TYPE: EntityType = EntityType::Category;

    pub fn new(scopes: Arc<ScopeRewriteGenerator>) -> Self {
        Self {
            scopes,
            reconciler: Reconciler::new(),
        }
    }

    pub fn generate(&self, category: &Category) -> Result<GeneratedRewrites> {
        self.scopes.generate_category(category, Scope::Global)
    }

    pub fn regenerate(
        &self,
        category: &Category,
        existing: &RewriteSet,
    ) -> Result<RegenerationOutcome> {
        let generated = self.generate(category)?;
        let reconciliation = self.reconciler.reconcile(&generated.rewrites, existing)?;

        info!(
            "Category {}: {} insert, {} update, {} retired",
            category.id,
            reconciliation.to_insert.len(),
            reconciliation.to_update.len(),
            reconciliation.to_delete_or_redirect.len()
        );

        Ok(RegenerationOutcome::from_parts(reconciliation, generated.warnings))
    }

    pub fn sync<S: RewriteStore>(
        &self,
        category: &Category,
        store: &mut S,
    ) -> std::result::Result<RegenerationOutcome, SyncError<S::Error>>
    where
        S::Error: 'static,
    {
        let generated = self.generate(category)?;
        let existing = existing_for(&*store, Self::ENTITY_TYPE, category.id, &generated.rewrites)
            .map_err(SyncError::Store)?;
        let reconciliation = self.reconciler.reconcile(&generated.rewrites, &existing)?;

        if reconciliation.has_changes() {
            store.apply(&reconciliation).map_err(SyncError::Store)?;
        }

        Ok(RegenerationOutcome::from_parts(reconciliation, generated.warnings))
    }
}
