use crate::catalog::{CategoryId, EntityId, StoreId};
use crate::rewrite::EntityType;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RewriteError {
    #[error("{entity_type} {entity_id} has no url key for store {store_id}")]
    MissingUrlKey {
        entity_type: EntityType,
        entity_id: EntityId,
        store_id: StoreId,
    },

    #[error(
        "request path '{request_path}' in store {store_id} already belongs to {existing_entity_type} {existing_entity_id}"
    )]
    UrlKeyConflict {
        request_path: String,
        store_id: StoreId,
        existing_entity_type: EntityType,
        existing_entity_id: EntityId,
    },

    #[error("category {category_id} has no resolvable url path in store {store_id}: {reason}")]
    CategoryPathUnresolvable {
        category_id: CategoryId,
        store_id: StoreId,
        reason: String,
    },
}

impl RewriteError {
    /// Errors that abort generation for the entity rather than being recorded as a warning.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, RewriteError::CategoryPathUnresolvable { .. })
    }
}

pub type Result<T> = std::result::Result<T, RewriteError>;
