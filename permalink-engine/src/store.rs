// Boundary to the collaborator that owns persisted rewrites

use crate::catalog::{EntityId, StoreId};
use crate::reconcile::{Reconciliation, Retired};
use crate::rewrite::{EntityType, RewriteSet, UrlRewrite};
use std::collections::{BTreeMap, BTreeSet};
use std::convert::Infallible;

/// Storage collaborator for rewrites.
///
/// Implementations are expected to apply a reconciliation atomically so two
/// saves of the same entity cannot race on a request path.
pub trait RewriteStore {
    type Error: std::error::Error;

    fn find_by_entity(
        &self,
        entity_type: EntityType,
        entity_id: EntityId,
    ) -> Result<RewriteSet, Self::Error>;

    /// Stored rows on any of the given request paths, in every store.
    fn find_by_request_paths(&self, paths: &[String]) -> Result<RewriteSet, Self::Error>;

    fn apply(&mut self, changes: &Reconciliation) -> Result<(), Self::Error>;
}

/// Rows the reconciler needs for `new`: the entity's own rows plus any rows
/// already holding one of the new request paths.
///
/// Foreign rows are kept when their scope overlaps the new row's scope, so a
/// global row meets store rows on the same path and the other way round.
pub fn existing_for<S: RewriteStore + ?Sized>(
    store: &S,
    entity_type: EntityType,
    entity_id: EntityId,
    new: &RewriteSet,
) -> Result<RewriteSet, S::Error> {
    let paths: Vec<String> = new
        .iter()
        .map(|r| r.request_path.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let foreign = store
        .find_by_request_paths(&paths)?
        .into_iter()
        .filter(|row| new.iter().any(|r| r.overlaps(row)));

    let mut rows: BTreeMap<(StoreId, String), UrlRewrite> = BTreeMap::new();
    for row in store
        .find_by_entity(entity_type, entity_id)?
        .into_iter()
        .chain(foreign)
    {
        rows.entry((row.store_id, row.request_path.clone()))
            .or_insert(row);
    }

    Ok(rows.into_values().collect())
}

/// Store backed by a map, for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryRewriteStore {
    rows: BTreeMap<(StoreId, String), UrlRewrite>,
}

impl MemoryRewriteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, rewrite: UrlRewrite) {
        self.rows
            .insert((rewrite.store_id, rewrite.request_path.clone()), rewrite);
    }

    pub fn get(&self, store_id: StoreId, request_path: &str) -> Option<&UrlRewrite> {
        self.rows.get(&(store_id, request_path.to_string()))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn all(&self) -> RewriteSet {
        self.rows.values().cloned().collect()
    }
}

impl RewriteStore for MemoryRewriteStore {
    type Error = Infallible;

    fn find_by_entity(
        &self,
        entity_type: EntityType,
        entity_id: EntityId,
    ) -> Result<RewriteSet, Self::Error> {
        Ok(self
            .rows
            .values()
            .filter(|r| r.belongs_to(entity_type, entity_id))
            .cloned()
            .collect())
    }

    fn find_by_request_paths(&self, paths: &[String]) -> Result<RewriteSet, Self::Error> {
        Ok(self
            .rows
            .values()
            .filter(|r| paths.contains(&r.request_path))
            .cloned()
            .collect())
    }

    fn apply(&mut self, changes: &Reconciliation) -> Result<(), Self::Error> {
        for retired in &changes.to_delete_or_redirect {
            let original = retired.original();
            let key = (original.store_id, original.request_path.clone());
            match retired {
                Retired::Redirect { redirect, .. } => {
                    self.rows.insert(key, redirect.clone());
                }
                Retired::Superseded { .. } => {
                    self.rows.remove(&key);
                }
            }
        }
        for row in changes.to_insert.iter().chain(changes.to_update.iter()) {
            self.insert(row.clone());
        }
        Ok(())
    }
}
