// Per-scope rewrite generation

use crate::catalog::{
    Category, CategoryId, CategoryTree, DEFAULT_STORE_ID, EntityId, Product, Scope, StoreId,
    StoreRegistry,
};
use crate::error::{Result, RewriteError};
use crate::options::RewriteOptions;
use crate::path::PathBuilder;
use crate::rewrite::{
    EntityType, RewriteSet, UrlRewrite, category_target_path, product_target_path,
};
use crate::visibility::visible_stores;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use tracing::{debug, warn};

/// A category skipped during generation because its path could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationWarning {
    pub entity_type: EntityType,
    pub entity_id: EntityId,
    pub category_id: CategoryId,
    pub store_id: StoreId,
    pub reason: String,
}

impl fmt::Display for GenerationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}: skipped category {} in store {} ({})",
            self.entity_type, self.entity_id, self.category_id, self.store_id, self.reason
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedRewrites {
    pub rewrites: RewriteSet,
    pub warnings: Vec<GenerationWarning>,
}

impl GeneratedRewrites {
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Store rewrite plus whether the global attribute values would give the same path.
struct Candidate {
    rewrite: UrlRewrite,
    shared: bool,
}

/// Produces the complete rewrite set of an entity for one scope.
#[derive(Debug, Clone)]
pub struct ScopeRewriteGenerator {
    stores: StoreRegistry,
    categories: CategoryTree,
    options: RewriteOptions,
    paths: PathBuilder,
}

impl ScopeRewriteGenerator {
    pub fn new(stores: StoreRegistry, categories: CategoryTree, options: RewriteOptions) -> Self {
        let paths = PathBuilder::new(&options);
        Self {
            stores,
            categories,
            options,
            paths,
        }
    }

    pub fn stores(&self) -> &StoreRegistry {
        &self.stores
    }

    pub fn categories(&self) -> &CategoryTree {
        &self.categories
    }

    pub fn options(&self) -> &RewriteOptions {
        &self.options
    }

    pub fn paths(&self) -> &PathBuilder {
        &self.paths
    }

    /// Rewrites of a product for `scope`.
    ///
    /// The global scope walks every visible store. A row whose path matches the
    /// non-overridden attribute values in every registered store is emitted once
    /// under the default store; the rest are emitted per store, so stores where
    /// the product is hidden or unassigned never answer its paths.
    pub fn generate(
        &self,
        product: &Product,
        scope: Scope,
        root_category_id: Option<CategoryId>,
    ) -> Result<GeneratedRewrites> {
        let visible = visible_stores(product, &self.stores);
        let mut warnings = Vec::new();

        let rewrites: RewriteSet = match scope {
            Scope::Store(store_id) => {
                if !visible.contains(&store_id) {
                    debug!("Product {} is not visible in store {}", product.id, store_id);
                    return Ok(GeneratedRewrites::empty());
                }
                self.product_candidates(product, store_id, root_category_id, &mut warnings)?
                    .into_iter()
                    .map(|c| c.rewrite)
                    .collect()
            }
            Scope::Global => {
                let mut candidates = Vec::new();
                for store_id in &visible {
                    candidates.extend(self.product_candidates(
                        product,
                        *store_id,
                        root_category_id,
                        &mut warnings,
                    )?);
                }
                merge_into_global(candidates, &self.stores.ids().collect())
            }
        };

        debug!(
            "Generated {} rewrites for product {} in {} scope",
            rewrites.len(),
            product.id,
            scope
        );

        Ok(GeneratedRewrites {
            rewrites,
            warnings,
        })
    }

    /// Rewrites of a category's own landing page for `scope`.
    pub fn generate_category(&self, category: &Category, scope: Scope) -> Result<GeneratedRewrites> {
        if category.is_root() {
            return Ok(GeneratedRewrites::empty());
        }

        let store_ids: BTreeSet<StoreId> = self
            .stores
            .iter()
            .filter(|s| category.is_under(s.root_category_id))
            .map(|s| s.id)
            .filter(|id| scope.is_global() || *id == scope.store_id())
            .collect();

        let global_path = self
            .paths
            .category_request_path(category, Scope::Global, &self.categories)
            .ok();

        let mut warnings = Vec::new();
        let mut candidates = Vec::new();
        for store_id in store_ids {
            let store_scope = Scope::Store(store_id);
            if category.url_key_for(store_scope).is_none() {
                return Err(RewriteError::MissingUrlKey {
                    entity_type: EntityType::Category,
                    entity_id: category.id,
                    store_id,
                });
            }

            let request_path =
                match self
                    .paths
                    .category_request_path(category, store_scope, &self.categories)
                {
                    Ok(path) => path,
                    Err(e) => {
                        record_skip(
                            &mut warnings,
                            EntityType::Category,
                            category.id,
                            category.id,
                            store_id,
                            e,
                        );
                        continue;
                    }
                };

            let shared = global_path.as_deref() == Some(request_path.as_str());
            candidates.push(Candidate {
                rewrite: UrlRewrite::generated(
                    EntityType::Category,
                    category.id,
                    store_id,
                    request_path,
                    category_target_path(category.id),
                ),
                shared,
            });
        }

        let rewrites = if scope.is_global() {
            merge_into_global(candidates, &self.stores.ids().collect())
        } else {
            candidates.into_iter().map(|c| c.rewrite).collect()
        };

        Ok(GeneratedRewrites {
            rewrites,
            warnings,
        })
    }

    fn product_candidates(
        &self,
        product: &Product,
        store_id: StoreId,
        root_category_id: Option<CategoryId>,
        warnings: &mut Vec<GenerationWarning>,
    ) -> Result<Vec<Candidate>> {
        let scope = Scope::Store(store_id);
        let root = root_category_id.or_else(|| self.stores.root_category_for(store_id));

        let mut category_rewrites = Vec::new();
        if self.options.generate_category_paths {
            let applicable = self
                .categories
                .collection_for(&product.category_ids)
                .into_iter()
                .filter(|c| !c.is_root())
                .filter(|c| root.is_none_or(|r| c.is_under(r)));

            for category in applicable {
                let category_path =
                    match self.paths.category_url_path(category, scope, &self.categories) {
                        Ok(path) => path,
                        Err(e) => {
                            record_skip(
                                warnings,
                                EntityType::Product,
                                product.id,
                                category.id,
                                store_id,
                                e,
                            );
                            continue;
                        }
                    };

                let request_path =
                    self.paths
                        .product_request_path(product, scope, Some(&category_path))?;
                let global_path = self
                    .paths
                    .category_url_path(category, Scope::Global, &self.categories)
                    .and_then(|p| {
                        self.paths
                            .product_request_path(product, Scope::Global, Some(&p))
                    })
                    .ok();

                let shared = global_path.as_deref() == Some(request_path.as_str());
                category_rewrites.push(Candidate {
                    rewrite: UrlRewrite::generated(
                        EntityType::Product,
                        product.id,
                        store_id,
                        request_path,
                        product_target_path(product.id, Some(category.id)),
                    )
                    .with_category(category.id),
                    shared,
                });
            }
        }

        let mut candidates = Vec::with_capacity(category_rewrites.len() + 1);
        let replace_canonical =
            self.options.category_rewrites_replace_canonical && !category_rewrites.is_empty();
        if !replace_canonical {
            let request_path = self.paths.product_request_path(product, scope, None)?;
            let global_path = self
                .paths
                .product_request_path(product, Scope::Global, None)
                .ok();
            let shared = global_path.as_deref() == Some(request_path.as_str());
            candidates.push(Candidate {
                rewrite: UrlRewrite::generated(
                    EntityType::Product,
                    product.id,
                    store_id,
                    request_path,
                    product_target_path(product.id, None),
                ),
                shared,
            });
        }
        candidates.extend(category_rewrites);

        Ok(candidates)
    }
}

/// Folds per-store candidates into one set: rows shared by every registered
/// store once under the default store, everything else per store.
fn merge_into_global(candidates: Vec<Candidate>, all_stores: &BTreeSet<StoreId>) -> RewriteSet {
    let mut coverage: HashMap<(&str, &str), BTreeSet<StoreId>> = HashMap::new();
    for candidate in candidates.iter().filter(|c| c.shared) {
        coverage
            .entry((
                candidate.rewrite.request_path.as_str(),
                candidate.rewrite.target_path.as_str(),
            ))
            .or_default()
            .insert(candidate.rewrite.store_id);
    }
    let global: HashSet<(String, String)> = coverage
        .into_iter()
        .filter(|(_, stores)| !all_stores.is_empty() && stores == all_stores)
        .map(|((request, target), _)| (request.to_string(), target.to_string()))
        .collect();

    let mut global_paths = HashSet::new();
    let mut store_paths = HashSet::new();
    let mut rewrites = Vec::new();

    for Candidate { mut rewrite, shared } in candidates {
        let key = (rewrite.request_path.clone(), rewrite.target_path.clone());
        if shared && global.contains(&key) {
            if global_paths.insert(key.0) {
                rewrite.store_id = DEFAULT_STORE_ID;
                rewrites.push(rewrite);
            }
        } else if store_paths.insert((rewrite.store_id, rewrite.request_path.clone())) {
            rewrites.push(rewrite);
        }
    }

    RewriteSet::new(rewrites)
}

fn record_skip(
    warnings: &mut Vec<GenerationWarning>,
    entity_type: EntityType,
    entity_id: EntityId,
    category_id: CategoryId,
    store_id: StoreId,
    error: RewriteError,
) {
    warn!("Skipping category {} for {} {}: {}", category_id, entity_type, entity_id, error);
    let reason = match error {
        RewriteError::CategoryPathUnresolvable { reason, .. } => reason,
        other => other.to_string(),
    };
    warnings.push(GenerationWarning {
        entity_type,
        entity_id,
        category_id,
        store_id,
        reason,
    });
}
