// Catalog snapshot files consumed by `generate` and `reindex`

use crate::error::{CoreError, Result};
use permalink_engine::catalog::{
    Category, CategoryTree, DEFAULT_STORE_ID, EntityId, Product, Store, StoreRegistry,
};
use permalink_engine::{RewriteOptions, ScopeRewriteGenerator, UrlRewrite};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::debug;
use url::Url;

/// Stores, categories and products as exported by the catalog repository.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    #[serde(default)]
    pub stores: Vec<Store>,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub products: Vec<Product>,
}

impl CatalogSnapshot {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let snapshot = Self::from_json(&content)?;
        debug!(
            "Loaded catalog {}: {} stores, {} categories, {} products",
            path.display(),
            snapshot.stores.len(),
            snapshot.categories.len(),
            snapshot.products.len()
        );
        Ok(snapshot)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let snapshot: CatalogSnapshot = serde_json::from_str(content)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Rejects duplicate ids and malformed store base URLs.
    pub fn validate(&self) -> Result<()> {
        let mut store_ids = HashSet::new();
        for store in &self.stores {
            if !store_ids.insert(store.id) {
                return Err(CoreError::InvalidCatalog(format!(
                    "duplicate store id {}",
                    store.id
                )));
            }
            if let Some(base_url) = &store.base_url {
                let url = Url::parse(base_url)?;
                if url.scheme() != "http" && url.scheme() != "https" {
                    return Err(CoreError::InvalidCatalog(format!(
                        "store '{}' base url must be http or https, got {}",
                        store.code, base_url
                    )));
                }
            }
        }

        let mut category_ids = HashSet::new();
        for category in &self.categories {
            if !category_ids.insert(category.id) {
                return Err(CoreError::InvalidCatalog(format!(
                    "duplicate category id {}",
                    category.id
                )));
            }
        }

        let mut product_ids = HashSet::new();
        for product in &self.products {
            if !product_ids.insert(product.id) {
                return Err(CoreError::InvalidCatalog(format!(
                    "duplicate product id {}",
                    product.id
                )));
            }
        }

        Ok(())
    }

    pub fn product(&self, id: EntityId) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    pub fn category(&self, id: EntityId) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    pub fn store_registry(&self) -> StoreRegistry {
        StoreRegistry::new(self.stores.iter().cloned())
    }

    pub fn category_tree(&self) -> CategoryTree {
        CategoryTree::new(self.categories.iter().cloned())
    }

    pub fn scope_generator(&self, options: RewriteOptions) -> ScopeRewriteGenerator {
        ScopeRewriteGenerator::new(self.store_registry(), self.category_tree(), options)
    }

    /// Absolute storefront URL of a rewrite, when its store has a base URL.
    ///
    /// Global rows use the first store with a base URL.
    pub fn storefront_url(&self, rewrite: &UrlRewrite) -> Option<Url> {
        let store = self
            .stores
            .iter()
            .filter(|s| s.base_url.is_some())
            .find(|s| rewrite.store_id == DEFAULT_STORE_ID || s.id == rewrite.store_id)?;
        let base = Url::parse(store.base_url.as_deref()?).ok()?;
        let base = if base.path().ends_with('/') {
            base
        } else {
            Url::parse(&format!("{}/", base.as_str())).ok()?
        };
        base.join(&rewrite.request_path).ok()
    }
}
