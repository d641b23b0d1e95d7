// Catalog value types handed to the engine by the repository layer

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

pub type EntityId = u64;
pub type CategoryId = u64;
pub type StoreId = u32;

/// Store id of the shared admin/default context.
pub const DEFAULT_STORE_ID: StoreId = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Shared context covering every store without an override
    Global,
    Store(StoreId),
}

impl Scope {
    pub fn for_store(store_id: StoreId) -> Self {
        if store_id == DEFAULT_STORE_ID {
            Scope::Global
        } else {
            Scope::Store(store_id)
        }
    }

    pub fn store_id(&self) -> StoreId {
        match self {
            Scope::Global => DEFAULT_STORE_ID,
            Scope::Store(id) => *id,
        }
    }

    pub fn is_global(&self) -> bool {
        matches!(self, Scope::Global)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Global => write!(f, "global"),
            Scope::Store(id) => write!(f, "store {}", id),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Visible,
    NotVisible,
}

/// Store-view values that shadow the global attribute values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreAttributes {
    pub url_key: Option<String>,
    pub url_path: Option<String>,
    pub visibility: Option<Visibility>,
}

impl StoreAttributes {
    pub fn url_key(key: impl Into<String>) -> Self {
        Self {
            url_key: Some(key.into()),
            ..Self::default()
        }
    }

    pub fn visibility(visibility: Visibility) -> Self {
        Self {
            visibility: Some(visibility),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: EntityId,
    /// Store the product is being saved in; `DEFAULT_STORE_ID` for admin saves
    #[serde(default)]
    pub store_id: StoreId,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub url_key: Option<String>,
    /// Stores the product is assigned to. Empty means every registered store.
    #[serde(default)]
    pub store_ids: BTreeSet<StoreId>,
    #[serde(default)]
    pub category_ids: Vec<CategoryId>,
    #[serde(default)]
    pub store_overrides: BTreeMap<StoreId, StoreAttributes>,
}

impl Product {
    pub fn new(id: EntityId, url_key: impl Into<String>) -> Self {
        Self {
            id,
            store_id: DEFAULT_STORE_ID,
            visibility: Visibility::Visible,
            url_key: Some(url_key.into()),
            store_ids: BTreeSet::new(),
            category_ids: Vec::new(),
            store_overrides: BTreeMap::new(),
        }
    }

    pub fn with_stores(mut self, stores: impl IntoIterator<Item = StoreId>) -> Self {
        self.store_ids = stores.into_iter().collect();
        self
    }

    pub fn with_categories(mut self, categories: impl IntoIterator<Item = CategoryId>) -> Self {
        self.category_ids = categories.into_iter().collect();
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_override(mut self, store_id: StoreId, attributes: StoreAttributes) -> Self {
        self.store_overrides.insert(store_id, attributes);
        self
    }

    pub fn saved_in(mut self, store_id: StoreId) -> Self {
        self.store_id = store_id;
        self
    }

    pub fn override_for(&self, store_id: StoreId) -> Option<&StoreAttributes> {
        self.store_overrides.get(&store_id)
    }

    /// Url key for the scope, falling back to the global key when no store value is set.
    pub fn url_key_for(&self, scope: Scope) -> Option<&str> {
        let store_key = match scope {
            Scope::Global => None,
            Scope::Store(id) => self
                .override_for(id)
                .and_then(|o| o.url_key.as_deref())
                .filter(|k| !k.trim().is_empty()),
        };

        store_key.or_else(|| self.url_key.as_deref().filter(|k| !k.trim().is_empty()))
    }

    /// Explicit url path stored for the scope, if any.
    pub fn url_path_for(&self, scope: Scope) -> Option<&str> {
        match scope {
            Scope::Global => None,
            Scope::Store(id) => self
                .override_for(id)
                .and_then(|o| o.url_path.as_deref())
                .filter(|p| !p.trim().is_empty()),
        }
    }

    pub fn visibility_for(&self, store_id: StoreId) -> Visibility {
        self.override_for(store_id)
            .and_then(|o| o.visibility)
            .unwrap_or(self.visibility)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    /// Ancestor ids ordered from the tree root down to the parent
    #[serde(default)]
    pub path: Vec<CategoryId>,
    #[serde(default)]
    pub url_key: Option<String>,
    #[serde(default)]
    pub store_url_keys: BTreeMap<StoreId, String>,
}

impl Category {
    pub fn new(id: CategoryId, path: Vec<CategoryId>, url_key: impl Into<String>) -> Self {
        Self {
            id,
            path,
            url_key: Some(url_key.into()),
            store_url_keys: BTreeMap::new(),
        }
    }

    pub fn with_store_key(mut self, store_id: StoreId, key: impl Into<String>) -> Self {
        self.store_url_keys.insert(store_id, key.into());
        self
    }

    /// 0 for the tree root, 1 for store root categories.
    pub fn level(&self) -> usize {
        self.path.len()
    }

    pub fn parent_id(&self) -> Option<CategoryId> {
        self.path.last().copied()
    }

    /// Root categories never contribute a path segment.
    pub fn is_root(&self) -> bool {
        self.level() < 2
    }

    pub fn is_under(&self, root_id: CategoryId) -> bool {
        self.id == root_id || self.path.contains(&root_id)
    }

    pub fn url_key_for(&self, scope: Scope) -> Option<&str> {
        let store_key = match scope {
            Scope::Global => None,
            Scope::Store(id) => self
                .store_url_keys
                .get(&id)
                .map(String::as_str)
                .filter(|k| !k.trim().is_empty()),
        };

        store_key.or_else(|| self.url_key.as_deref().filter(|k| !k.trim().is_empty()))
    }
}

/// Materialized category collection with url attributes preloaded.
#[derive(Debug, Clone, Default)]
pub struct CategoryTree {
    categories: BTreeMap<CategoryId, Category>,
}

impl CategoryTree {
    pub fn new(categories: impl IntoIterator<Item = Category>) -> Self {
        Self {
            categories: categories.into_iter().map(|c| (c.id, c)).collect(),
        }
    }

    pub fn get(&self, id: CategoryId) -> Option<&Category> {
        self.categories.get(&id)
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Category> {
        self.categories.values()
    }

    /// Categories a product is assigned to, skipping ids the tree does not know.
    pub fn collection_for(&self, ids: &[CategoryId]) -> Vec<&Category> {
        let mut seen = BTreeSet::new();
        ids.iter()
            .filter(|id| seen.insert(**id))
            .filter_map(|id| self.categories.get(id))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Store {
    pub id: StoreId,
    pub code: String,
    pub root_category_id: CategoryId,
    #[serde(default)]
    pub base_url: Option<String>,
}

impl Store {
    pub fn new(id: StoreId, code: impl Into<String>, root_category_id: CategoryId) -> Self {
        Self {
            id,
            code: code.into(),
            root_category_id,
            base_url: None,
        }
    }
}

/// Enumerates the concrete store views. The default store is implicit.
#[derive(Debug, Clone, Default)]
pub struct StoreRegistry {
    stores: BTreeMap<StoreId, Store>,
}

impl StoreRegistry {
    pub fn new(stores: impl IntoIterator<Item = Store>) -> Self {
        Self {
            stores: stores
                .into_iter()
                .filter(|s| s.id != DEFAULT_STORE_ID)
                .map(|s| (s.id, s))
                .collect(),
        }
    }

    pub fn get(&self, id: StoreId) -> Option<&Store> {
        self.stores.get(&id)
    }

    pub fn ids(&self) -> impl Iterator<Item = StoreId> + '_ {
        self.stores.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Store> {
        self.stores.values()
    }

    pub fn is_default(id: StoreId) -> bool {
        id == DEFAULT_STORE_ID
    }

    pub fn root_category_for(&self, id: StoreId) -> Option<CategoryId> {
        self.stores.get(&id).map(|s| s.root_category_id)
    }

    /// Stores the product is assigned to that actually exist in the registry.
    pub fn assigned_stores(&self, product: &Product) -> BTreeSet<StoreId> {
        if product.store_ids.is_empty() {
            self.ids().collect()
        } else {
            product
                .store_ids
                .iter()
                .copied()
                .filter(|id| self.stores.contains_key(id))
                .collect()
        }
    }
}
