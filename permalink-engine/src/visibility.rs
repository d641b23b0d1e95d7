// Store-level visibility resolution

use crate::catalog::{DEFAULT_STORE_ID, Product, StoreId, StoreRegistry, Visibility};
use std::collections::BTreeSet;

/// Stores in which the product is visible.
///
/// Each assigned store is evaluated on its own: a store override wins, otherwise
/// the global visibility applies. The default placeholder store is never part of
/// the result, so an empty set means no rewrites anywhere.
pub fn visible_stores(product: &Product, stores: &StoreRegistry) -> BTreeSet<StoreId> {
    stores
        .assigned_stores(product)
        .into_iter()
        .filter(|store_id| *store_id != DEFAULT_STORE_ID)
        .filter(|store_id| product.visibility_for(*store_id) == Visibility::Visible)
        .collect()
}

/// Whether a save of this product should produce any rewrites.
///
/// A globally hidden product is skipped when no store shows it, or when it is
/// being saved in a concrete store that does not show it.
pub fn should_generate(product: &Product, visible: &BTreeSet<StoreId>) -> bool {
    if visible.is_empty() {
        return false;
    }

    if product.visibility == Visibility::NotVisible
        && product.store_id != DEFAULT_STORE_ID
        && !visible.contains(&product.store_id)
    {
        return false;
    }

    true
}
