use crate::catalog::{CategoryId, DEFAULT_STORE_ID, EntityId, StoreId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Metadata key linking a product rewrite to the category it was generated for.
pub const METADATA_CATEGORY_ID: &str = "category_id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Product,
    Category,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Product => "product",
            EntityType::Category => "category",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "product" => Some(EntityType::Product),
            "category" => Some(EntityType::Category),
            _ => None,
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedirectType {
    #[default]
    None,
    Permanent,
    Temporary,
}

impl RedirectType {
    /// HTTP status used when serving the rewrite, 0 for internal forwards.
    pub fn code(&self) -> u16 {
        match self {
            RedirectType::None => 0,
            RedirectType::Permanent => 301,
            RedirectType::Temporary => 302,
        }
    }

    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            0 => Some(RedirectType::None),
            301 => Some(RedirectType::Permanent),
            302 => Some(RedirectType::Temporary),
            _ => None,
        }
    }

    pub fn is_redirect(&self) -> bool {
        !matches!(self, RedirectType::None)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlRewrite {
    pub request_path: String,
    pub target_path: String,
    pub entity_type: EntityType,
    pub entity_id: EntityId,
    pub store_id: StoreId,
    pub is_autogenerated: bool,
    #[serde(default)]
    pub redirect_type: RedirectType,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl UrlRewrite {
    /// Autogenerated internal forward, as emitted by the generators.
    pub fn generated(
        entity_type: EntityType,
        entity_id: EntityId,
        store_id: StoreId,
        request_path: impl Into<String>,
        target_path: impl Into<String>,
    ) -> Self {
        Self {
            request_path: request_path.into(),
            target_path: target_path.into(),
            entity_type,
            entity_id,
            store_id,
            is_autogenerated: true,
            redirect_type: RedirectType::None,
            metadata: BTreeMap::new(),
        }
    }

    /// Operator-authored rewrite; the engine never touches these.
    pub fn custom(
        entity_type: EntityType,
        entity_id: EntityId,
        store_id: StoreId,
        request_path: impl Into<String>,
        target_path: impl Into<String>,
    ) -> Self {
        Self {
            is_autogenerated: false,
            ..Self::generated(entity_type, entity_id, store_id, request_path, target_path)
        }
    }

    pub fn with_category(mut self, category_id: CategoryId) -> Self {
        self.metadata
            .insert(METADATA_CATEGORY_ID.to_string(), category_id.to_string());
        self
    }

    pub fn with_redirect(mut self, redirect_type: RedirectType) -> Self {
        self.redirect_type = redirect_type;
        self
    }

    pub fn category_id(&self) -> Option<CategoryId> {
        self.metadata
            .get(METADATA_CATEGORY_ID)
            .and_then(|v| v.parse().ok())
    }

    pub fn belongs_to(&self, entity_type: EntityType, entity_id: EntityId) -> bool {
        self.entity_type == entity_type && self.entity_id == entity_id
    }

    pub fn same_owner(&self, other: &UrlRewrite) -> bool {
        self.belongs_to(other.entity_type, other.entity_id)
    }

    /// Uniqueness key among active rewrites.
    pub fn key(&self) -> (StoreId, &str) {
        (self.store_id, self.request_path.as_str())
    }

    /// Both rows answer the same request path in at least one store.
    ///
    /// A global row answers in every store.
    pub fn overlaps(&self, other: &UrlRewrite) -> bool {
        self.request_path == other.request_path
            && (self.store_id == other.store_id
                || self.store_id == DEFAULT_STORE_ID
                || other.store_id == DEFAULT_STORE_ID)
    }
}

/// Rewrites produced for one entity in one pass.
///
/// The set is replaced as a whole; callers cannot edit individual rows in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RewriteSet(Vec<UrlRewrite>);

impl RewriteSet {
    pub fn new(rewrites: Vec<UrlRewrite>) -> Self {
        Self(rewrites)
    }

    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, UrlRewrite> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[UrlRewrite] {
        &self.0
    }

    pub fn find(&self, store_id: StoreId, request_path: &str) -> Option<&UrlRewrite> {
        self.0
            .iter()
            .find(|r| r.store_id == store_id && r.request_path == request_path)
    }

    pub fn into_vec(self) -> Vec<UrlRewrite> {
        self.0
    }
}

impl From<Vec<UrlRewrite>> for RewriteSet {
    fn from(rewrites: Vec<UrlRewrite>) -> Self {
        Self(rewrites)
    }
}

impl FromIterator<UrlRewrite> for RewriteSet {
    fn from_iter<I: IntoIterator<Item = UrlRewrite>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for RewriteSet {
    type Item = UrlRewrite;
    type IntoIter = std::vec::IntoIter<UrlRewrite>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a RewriteSet {
    type Item = &'a UrlRewrite;
    type IntoIter = std::slice::Iter<'a, UrlRewrite>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

pub fn product_target_path(product_id: EntityId, category_id: Option<CategoryId>) -> String {
    match category_id {
        Some(category_id) => format!(
            "catalog/product/view/id/{}/category/{}",
            product_id, category_id
        ),
        None => format!("catalog/product/view/id/{}", product_id),
    }
}

pub fn category_target_path(category_id: CategoryId) -> String {
    format!("catalog/category/view/id/{}", category_id)
}
