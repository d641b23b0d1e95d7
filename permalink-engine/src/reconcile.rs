// Diffing freshly generated rewrites against stored ones

use crate::catalog::{DEFAULT_STORE_ID, StoreId};
use crate::error::{Result, RewriteError};
use crate::rewrite::{RedirectType, RewriteSet, UrlRewrite};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// What happens to a stored autogenerated row that the new generation no longer produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Retired {
    /// The row becomes a 301 to the entity's new path
    Redirect {
        original: UrlRewrite,
        redirect: UrlRewrite,
    },
    /// Another scope now serves the same request path for the same entity
    Superseded { original: UrlRewrite },
}

impl Retired {
    pub fn original(&self) -> &UrlRewrite {
        match self {
            Retired::Redirect { original, .. } => original,
            Retired::Superseded { original } => original,
        }
    }

    pub fn redirect(&self) -> Option<&UrlRewrite> {
        match self {
            Retired::Redirect { redirect, .. } => Some(redirect),
            Retired::Superseded { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconciliation {
    pub to_insert: Vec<UrlRewrite>,
    pub to_update: Vec<UrlRewrite>,
    pub to_delete_or_redirect: Vec<Retired>,
    /// Rows already stored exactly as generated
    pub unchanged: usize,
    /// Generated rows dropped because an operator-authored row holds the path
    pub kept_custom: usize,
}

impl Reconciliation {
    pub fn has_changes(&self) -> bool {
        !(self.to_insert.is_empty()
            && self.to_update.is_empty()
            && self.to_delete_or_redirect.is_empty())
    }

    /// Inserts followed by updates.
    pub fn changed_rows(&self) -> Vec<UrlRewrite> {
        self.to_insert
            .iter()
            .chain(self.to_update.iter())
            .cloned()
            .collect()
    }

    pub fn redirects(&self) -> Vec<UrlRewrite> {
        self.to_delete_or_redirect
            .iter()
            .filter_map(Retired::redirect)
            .cloned()
            .collect()
    }
}

/// Reconciles a new rewrite set with the rows currently stored.
///
/// `existing` holds the entity's stored rows plus any foreign rows answering the
/// request paths of `new` in an overlapping scope. Operator-authored rows are never modified.
#[derive(Debug, Clone, Copy, Default)]
pub struct Reconciler;

impl Reconciler {
    pub fn new() -> Self {
        Self
    }

    pub fn reconcile(&self, new: &RewriteSet, existing: &RewriteSet) -> Result<Reconciliation> {
        let stored: HashMap<(StoreId, &str), &UrlRewrite> =
            existing.iter().map(|r| (r.key(), r)).collect();
        let generated: HashSet<(StoreId, &str)> = new.iter().map(|r| r.key()).collect();

        let mut result = Reconciliation::default();

        for rewrite in new {
            if let Some(current) = existing
                .iter()
                .find(|r| !r.same_owner(rewrite) && r.overlaps(rewrite))
            {
                warn!(
                    "Request path '{}' in store {} is owned by {} {} in store {}",
                    rewrite.request_path,
                    rewrite.store_id,
                    current.entity_type,
                    current.entity_id,
                    current.store_id
                );
                return Err(RewriteError::UrlKeyConflict {
                    request_path: rewrite.request_path.clone(),
                    store_id: rewrite.store_id,
                    existing_entity_type: current.entity_type,
                    existing_entity_id: current.entity_id,
                });
            }

            match stored.get(&rewrite.key()) {
                Some(current) if !current.is_autogenerated => {
                    debug!(
                        "Keeping custom rewrite '{}' in store {}",
                        current.request_path, current.store_id
                    );
                    result.kept_custom += 1;
                }
                Some(current) if differs(current, rewrite) => {
                    result.to_update.push(rewrite.clone());
                }
                Some(_) => result.unchanged += 1,
                None => result.to_insert.push(rewrite.clone()),
            }
        }

        for current in existing {
            if !current.is_autogenerated || generated.contains(&current.key()) {
                continue;
            }

            let replacements: Vec<&UrlRewrite> = new
                .iter()
                .filter(|r| r.same_owner(current) && !r.redirect_type.is_redirect())
                .collect();

            if replacements.is_empty() {
                // Not part of this entity's pass.
                continue;
            }

            if replacements.iter().any(|r| {
                r.request_path == current.request_path && r.target_path == current.target_path
            }) {
                result.to_delete_or_redirect.push(Retired::Superseded {
                    original: current.clone(),
                });
                continue;
            }

            let candidates: Vec<&UrlRewrite> = replacements
                .into_iter()
                .filter(|r| r.request_path != current.request_path)
                .collect();

            let Some(target) = redirect_target(current, &candidates) else {
                debug!(
                    "No replacement path for '{}' in store {}, leaving it in place",
                    current.request_path, current.store_id
                );
                continue;
            };

            if current.redirect_type == RedirectType::Permanent && current.target_path == target {
                result.unchanged += 1;
                continue;
            }

            let redirect = UrlRewrite {
                target_path: target.to_string(),
                redirect_type: RedirectType::Permanent,
                is_autogenerated: true,
                ..current.clone()
            };
            result.to_delete_or_redirect.push(Retired::Redirect {
                original: current.clone(),
                redirect,
            });
        }

        debug!(
            "Reconciled {} new against {} stored rewrites: {} insert, {} update, {} retire",
            new.len(),
            existing.len(),
            result.to_insert.len(),
            result.to_update.len(),
            result.to_delete_or_redirect.len()
        );

        Ok(result)
    }
}

fn differs(current: &UrlRewrite, generated: &UrlRewrite) -> bool {
    current.target_path != generated.target_path
        || current.redirect_type != generated.redirect_type
        || current.metadata != generated.metadata
}

/// New request path a retired row should point at.
///
/// Same store before the global scope, same category before the canonical row.
fn redirect_target<'a>(retired: &UrlRewrite, replacements: &[&'a UrlRewrite]) -> Option<&'a str> {
    let category_id = retired.category_id();
    let in_store = |store_id: StoreId| {
        let rows: Vec<&'a UrlRewrite> = replacements
            .iter()
            .copied()
            .filter(|r| r.store_id == store_id)
            .collect();
        let chosen: Option<&'a UrlRewrite> = rows
            .iter()
            .copied()
            .find(|r| category_id.is_some() && r.category_id() == category_id)
            .or_else(|| rows.iter().copied().find(|r| r.category_id().is_none()))
            .or_else(|| rows.first().copied());
        chosen.map(|r| r.request_path.as_str())
    };

    in_store(retired.store_id).or_else(|| {
        if retired.store_id == DEFAULT_STORE_ID {
            None
        } else {
            in_store(DEFAULT_STORE_ID)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rewrite::EntityType;

    fn generated(store_id: StoreId, request: &str, target: &str) -> UrlRewrite {
        UrlRewrite::generated(EntityType::Product, 123, store_id, request, target)
    }

    const CANONICAL: &str = "catalog/product/view/id/123";

    #[test]
    fn test_renamed_url_key_redirects_old_path() {
        let new = RewriteSet::new(vec![generated(0, "shoe.html", CANONICAL)]);
        let existing = RewriteSet::new(vec![generated(0, "old-shoe.html", CANONICAL)]);

        let result = Reconciler::new().reconcile(&new, &existing).unwrap();

        assert_eq!(result.to_insert, vec![generated(0, "shoe.html", CANONICAL)]);
        assert!(result.to_update.is_empty());
        assert_eq!(result.to_delete_or_redirect.len(), 1);

        let redirect = result.to_delete_or_redirect[0].redirect().unwrap();
        assert_eq!(redirect.request_path, "old-shoe.html");
        assert_eq!(redirect.target_path, "shoe.html");
        assert_eq!(redirect.redirect_type, RedirectType::Permanent);
    }

    #[test]
    fn test_identical_generation_is_unchanged() {
        let set = RewriteSet::new(vec![
            generated(0, "shoe.html", CANONICAL),
            generated(2, "chaussure.html", CANONICAL),
        ]);
        let result = Reconciler::new().reconcile(&set, &set).unwrap();

        assert!(!result.has_changes());
        assert_eq!(result.unchanged, 2);
    }

    #[test]
    fn test_changed_target_is_updated() {
        let new = RewriteSet::new(vec![generated(0, "shoe.html", CANONICAL)]);
        let existing = RewriteSet::new(vec![generated(0, "shoe.html", "catalog/product/view/id/999")]);

        let result = Reconciler::new().reconcile(&new, &existing).unwrap();
        assert_eq!(result.to_update, vec![generated(0, "shoe.html", CANONICAL)]);
        assert!(result.to_insert.is_empty());
    }

    #[test]
    fn test_reverted_url_key_restores_redirect_row() {
        let new = RewriteSet::new(vec![generated(0, "shoe.html", CANONICAL)]);
        let existing = RewriteSet::new(vec![
            generated(0, "shoe.html", "boot.html").with_redirect(RedirectType::Permanent),
            generated(0, "boot.html", CANONICAL),
        ]);

        let result = Reconciler::new().reconcile(&new, &existing).unwrap();
        assert_eq!(result.to_update, vec![generated(0, "shoe.html", CANONICAL)]);

        let redirect = result.to_delete_or_redirect[0].redirect().unwrap();
        assert_eq!(redirect.request_path, "boot.html");
        assert_eq!(redirect.target_path, "shoe.html");
    }

    #[test]
    fn test_existing_redirect_is_repointed_to_latest_path() {
        let new = RewriteSet::new(vec![generated(0, "sneaker.html", CANONICAL)]);
        let existing = RewriteSet::new(vec![
            generated(0, "old-shoe.html", "shoe.html").with_redirect(RedirectType::Permanent),
            generated(0, "shoe.html", CANONICAL),
        ]);

        let result = Reconciler::new().reconcile(&new, &existing).unwrap();
        let redirects = result.redirects();

        assert_eq!(redirects.len(), 2);
        assert!(redirects.iter().all(|r| r.target_path == "sneaker.html"));
    }

    #[test]
    fn test_up_to_date_redirect_is_unchanged() {
        let new = RewriteSet::new(vec![generated(0, "shoe.html", CANONICAL)]);
        let existing = RewriteSet::new(vec![
            generated(0, "old-shoe.html", "shoe.html").with_redirect(RedirectType::Permanent),
            generated(0, "shoe.html", CANONICAL),
        ]);

        let result = Reconciler::new().reconcile(&new, &existing).unwrap();
        assert!(!result.has_changes());
        assert_eq!(result.unchanged, 2);
    }

    #[test]
    fn test_category_rewrite_redirects_to_same_category() {
        let new = RewriteSet::new(vec![
            generated(0, "shoe.html", CANONICAL),
            generated(0, "men/shoe.html", "catalog/product/view/id/123/category/3").with_category(3),
        ]);
        let existing = RewriteSet::new(vec![
            generated(0, "men/old-shoe.html", "catalog/product/view/id/123/category/3")
                .with_category(3),
        ]);

        let result = Reconciler::new().reconcile(&new, &existing).unwrap();
        let redirect = result.to_delete_or_redirect[0].redirect().unwrap();
        assert_eq!(redirect.target_path, "men/shoe.html");
        assert_eq!(redirect.category_id(), Some(3));
    }

    #[test]
    fn test_store_row_redirects_to_global_when_store_has_none() {
        let new = RewriteSet::new(vec![generated(0, "shoe.html", CANONICAL)]);
        let existing = RewriteSet::new(vec![generated(2, "chaussure.html", CANONICAL)]);

        let result = Reconciler::new().reconcile(&new, &existing).unwrap();
        let redirect = result.to_delete_or_redirect[0].redirect().unwrap();
        assert_eq!(redirect.store_id, 2);
        assert_eq!(redirect.target_path, "shoe.html");
    }

    #[test]
    fn test_store_row_now_served_globally_is_superseded() {
        let new = RewriteSet::new(vec![generated(0, "shoe.html", CANONICAL)]);
        let existing = RewriteSet::new(vec![generated(2, "shoe.html", CANONICAL)]);

        let result = Reconciler::new().reconcile(&new, &existing).unwrap();
        assert_eq!(
            result.to_delete_or_redirect,
            vec![Retired::Superseded {
                original: generated(2, "shoe.html", CANONICAL)
            }]
        );
        assert!(result.redirects().is_empty());
    }

    #[test]
    fn test_store_row_with_other_target_is_not_superseded() {
        let category_target = "catalog/product/view/id/123/category/4";
        let new = RewriteSet::new(vec![
            generated(0, "shoe.html", CANONICAL),
            generated(0, "men/shoe.html", category_target).with_category(4),
        ]);
        let existing = RewriteSet::new(vec![generated(2, "shoe.html", category_target).with_category(4)]);

        let result = Reconciler::new().reconcile(&new, &existing).unwrap();
        assert_eq!(result.to_delete_or_redirect.len(), 1);
        let redirect = result.to_delete_or_redirect[0].redirect().unwrap();
        assert_eq!(redirect.store_id, 2);
        assert_eq!(redirect.target_path, "men/shoe.html");
    }

    #[test]
    fn test_custom_rows_are_never_touched() {
        let custom = UrlRewrite::custom(EntityType::Product, 123, 0, "promo.html", CANONICAL);
        let custom_on_path = UrlRewrite::custom(EntityType::Product, 123, 0, "shoe.html", "landing");
        let new = RewriteSet::new(vec![generated(0, "shoe.html", CANONICAL)]);
        let existing = RewriteSet::new(vec![custom.clone(), custom_on_path.clone()]);

        let result = Reconciler::new().reconcile(&new, &existing).unwrap();

        assert!(result.to_update.is_empty());
        assert!(result.to_insert.is_empty());
        assert!(result.to_delete_or_redirect.is_empty());
        assert_eq!(result.kept_custom, 1);
    }

    #[test]
    fn test_foreign_row_on_path_is_a_conflict() {
        let foreign = UrlRewrite::generated(EntityType::Product, 456, 0, "shoe.html", "catalog/product/view/id/456");
        let new = RewriteSet::new(vec![generated(0, "shoe.html", CANONICAL)]);
        let existing = RewriteSet::new(vec![foreign]);

        let err = Reconciler::new().reconcile(&new, &existing).unwrap_err();
        assert_eq!(
            err,
            RewriteError::UrlKeyConflict {
                request_path: "shoe.html".to_string(),
                store_id: 0,
                existing_entity_type: EntityType::Product,
                existing_entity_id: 456,
            }
        );
    }

    #[test]
    fn test_store_row_over_foreign_global_row_is_a_conflict() {
        let foreign = UrlRewrite::generated(EntityType::Product, 456, 0, "shoe.html", "catalog/product/view/id/456");
        let new = RewriteSet::new(vec![generated(1, "shoe.html", CANONICAL)]);

        let err = Reconciler::new()
            .reconcile(&new, &RewriteSet::new(vec![foreign]))
            .unwrap_err();
        assert!(matches!(
            err,
            RewriteError::UrlKeyConflict { store_id: 1, existing_entity_id: 456, .. }
        ));
    }

    #[test]
    fn test_global_row_over_foreign_store_row_is_a_conflict() {
        let foreign = UrlRewrite::generated(EntityType::Product, 456, 2, "shoe.html", "catalog/product/view/id/456");
        let new = RewriteSet::new(vec![generated(0, "shoe.html", CANONICAL)]);

        let err = Reconciler::new()
            .reconcile(&new, &RewriteSet::new(vec![foreign]))
            .unwrap_err();
        assert!(matches!(
            err,
            RewriteError::UrlKeyConflict { store_id: 0, existing_entity_id: 456, .. }
        ));
    }

    #[test]
    fn test_category_with_same_id_is_foreign() {
        let foreign = UrlRewrite::generated(EntityType::Category, 123, 0, "shoe.html", "catalog/category/view/id/123");
        let new = RewriteSet::new(vec![generated(0, "shoe.html", CANONICAL)]);

        assert!(Reconciler::new().reconcile(&new, &RewriteSet::new(vec![foreign])).is_err());
    }

    #[test]
    fn test_same_path_in_other_store_is_not_a_conflict() {
        let foreign = UrlRewrite::generated(EntityType::Product, 456, 1, "shoe.html", "catalog/product/view/id/456");
        let new = RewriteSet::new(vec![generated(2, "shoe.html", CANONICAL)]);

        let result = Reconciler::new()
            .reconcile(&new, &RewriteSet::new(vec![foreign]))
            .unwrap();
        assert_eq!(result.to_insert.len(), 1);
        assert!(result.to_delete_or_redirect.is_empty());
    }

    #[test]
    fn test_rows_of_other_entities_are_not_retired() {
        let other = UrlRewrite::generated(EntityType::Product, 456, 0, "sock.html", "catalog/product/view/id/456");
        let new = RewriteSet::new(vec![generated(0, "shoe.html", CANONICAL)]);

        let result = Reconciler::new()
            .reconcile(&new, &RewriteSet::new(vec![other]))
            .unwrap();
        assert!(result.to_delete_or_redirect.is_empty());
    }

    #[test]
    fn test_empty_generation_leaves_stored_rows() {
        let existing = RewriteSet::new(vec![generated(0, "shoe.html", CANONICAL)]);
        let result = Reconciler::new()
            .reconcile(&RewriteSet::empty(), &existing)
            .unwrap();
        assert!(!result.has_changes());
    }

    #[test]
    fn test_every_retired_autogenerated_row_gets_a_redirect_to_a_new_path() {
        let new = RewriteSet::new(vec![
            generated(0, "sneaker.html", CANONICAL),
            generated(2, "basket.html", CANONICAL),
        ]);
        let existing = RewriteSet::new(vec![
            generated(0, "shoe.html", CANONICAL),
            generated(2, "chaussure.html", CANONICAL),
            generated(3, "schuh.html", CANONICAL),
        ]);

        let result = Reconciler::new().reconcile(&new, &existing).unwrap();
        let new_paths: HashSet<&str> = new.iter().map(|r| r.request_path.as_str()).collect();

        assert_eq!(result.to_delete_or_redirect.len(), 3);
        for retired in &result.to_delete_or_redirect {
            let redirect = retired.redirect().unwrap();
            assert!(new_paths.contains(redirect.target_path.as_str()));
            assert_eq!(redirect.store_id, retired.original().store_id);
        }
        let chaussure = result
            .redirects()
            .into_iter()
            .find(|r| r.request_path == "chaussure.html")
            .unwrap();
        assert_eq!(chaussure.target_path, "basket.html");
    }
}
