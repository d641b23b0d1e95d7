pub mod catalog;
pub mod error;
pub mod generator;
pub mod gift_message;
pub mod options;
pub mod path;
pub mod reconcile;
pub mod rewrite;
pub mod scope;
pub mod store;
pub mod visibility;

pub use catalog::{
    Category, CategoryTree, DEFAULT_STORE_ID, Product, Scope, Store, StoreAttributes,
    StoreRegistry, Visibility,
};
pub use error::{Result, RewriteError};
pub use generator::{
    CategoryUrlRewriteGenerator, ProductUrlRewriteGenerator, RegenerationOutcome, SyncError,
};
pub use options::RewriteOptions;
pub use reconcile::{Reconciler, Reconciliation, Retired};
pub use rewrite::{EntityType, RedirectType, RewriteSet, UrlRewrite};
pub use scope::{GeneratedRewrites, GenerationWarning, ScopeRewriteGenerator};
pub use store::{MemoryRewriteStore, RewriteStore};
