use permalink_engine::{RewriteError, SyncError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Rewrite(#[from] RewriteError),

    #[error("Invalid catalog: {0}")]
    InvalidCatalog(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Regeneration worker stopped before the request was queued")]
    WorkerClosed,

    #[error("Task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl From<SyncError<rusqlite::Error>> for CoreError {
    fn from(err: SyncError<rusqlite::Error>) -> Self {
        match err {
            SyncError::Rewrite(e) => CoreError::Rewrite(e),
            SyncError::Store(e) => CoreError::Database(e),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
