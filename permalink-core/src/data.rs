use permalink_engine::catalog::{DEFAULT_STORE_ID, EntityId, StoreId};
use permalink_engine::reconcile::{Reconciliation, Retired};
use permalink_engine::{EntityType, RedirectType, RewriteSet, RewriteStore, UrlRewrite};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Result, Row, params};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Upper bound on redirect hops followed by [`Database::resolve`].
pub const MAX_REDIRECT_HOPS: usize = 8;

const REWRITE_COLUMNS: &str = "entity_type, entity_id, request_path, target_path, redirect_type, \
     store_id, is_autogenerated, metadata";

#[derive(Debug)]
pub struct Database {
    conn: Connection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }
}

/// Per-run totals recorded in `reindex_runs`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounts {
    pub entities: usize,
    pub inserted: usize,
    pub updated: usize,
    pub redirected: usize,
    pub superseded: usize,
    pub unchanged: usize,
    pub failed: usize,
    pub warnings: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: String,
    pub start_time: i64,
    pub end_time: Option<i64>,
    pub status: String,
    pub catalog: String,
    pub counts: RunCounts,
}

/// Filter for [`Database::list_rewrites`].
#[derive(Debug, Clone, Default)]
pub struct RewriteFilter {
    pub store_id: Option<StoreId>,
    pub entity_type: Option<EntityType>,
    pub entity_id: Option<EntityId>,
    pub redirects_only: bool,
}

/// Outcome of resolving a request path for a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub request_path: String,
    pub store_id: StoreId,
    /// Every row visited, starting with the one matching `request_path`
    pub hops: Vec<UrlRewrite>,
    /// Internal target of the last row, or the last redirect target when the chain was cut
    pub target_path: String,
    pub loop_detected: bool,
}

fn current_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

fn row_to_rewrite(row: &Row<'_>) -> Result<UrlRewrite> {
    let entity_type: String = row.get(0)?;
    let entity_type = EntityType::parse(&entity_type).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            Type::Text,
            format!("unknown entity type '{}'", entity_type).into(),
        )
    })?;

    let redirect_code: u16 = row.get(4)?;
    let redirect_type = RedirectType::from_code(redirect_code).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            Type::Integer,
            format!("unsupported redirect type {}", redirect_code).into(),
        )
    })?;

    let metadata: Option<String> = row.get(7)?;
    let metadata: BTreeMap<String, String> = match metadata {
        Some(json) => serde_json::from_str(&json)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(7, Type::Text, Box::new(e)))?,
        None => BTreeMap::new(),
    };

    Ok(UrlRewrite {
        entity_type,
        entity_id: row.get(1)?,
        request_path: row.get(2)?,
        target_path: row.get(3)?,
        redirect_type,
        store_id: row.get(5)?,
        is_autogenerated: row.get(6)?,
        metadata,
    })
}

fn metadata_json(rewrite: &UrlRewrite) -> Result<Option<String>> {
    if rewrite.metadata.is_empty() {
        return Ok(None);
    }
    serde_json::to_string(&rewrite.metadata)
        .map(Some)
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

fn insert_row(conn: &Connection, rewrite: &UrlRewrite) -> Result<i64> {
    conn.execute(
        "INSERT INTO url_rewrites (
            entity_type, entity_id, request_path, target_path, redirect_type,
            store_id, is_autogenerated, metadata, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            rewrite.entity_type.as_str(),
            rewrite.entity_id,
            &rewrite.request_path,
            &rewrite.target_path,
            rewrite.redirect_type.code(),
            rewrite.store_id,
            rewrite.is_autogenerated,
            metadata_json(rewrite)?,
            current_timestamp(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Overwrites the row stored under the rewrite's `(request_path, store_id)` key.
fn update_row(conn: &Connection, rewrite: &UrlRewrite) -> Result<usize> {
    conn.execute(
        "UPDATE url_rewrites
         SET entity_type = ?1, entity_id = ?2, target_path = ?3, redirect_type = ?4,
             is_autogenerated = ?5, metadata = ?6, updated_at = ?7
         WHERE request_path = ?8 AND store_id = ?9",
        params![
            rewrite.entity_type.as_str(),
            rewrite.entity_id,
            &rewrite.target_path,
            rewrite.redirect_type.code(),
            rewrite.is_autogenerated,
            metadata_json(rewrite)?,
            current_timestamp(),
            &rewrite.request_path,
            rewrite.store_id,
        ],
    )
}

impl Database {
    pub fn drop(path: &Path) -> std::io::Result<()> {
        fs::remove_file(path)
    }

    pub fn exists(path: &Path) -> bool {
        path.exists()
    }

    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA cache_size = -16000;  -- 16MB cache
            PRAGMA temp_store = MEMORY;
            ",
        )?;

        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    pub fn in_memory() -> Result<Self> {
        let db = Database {
            conn: Connection::open_in_memory()?,
        };
        db.init_schema()?;
        Ok(db)
    }

    /// File backing this database, `None` when in memory.
    pub fn path(&self) -> Option<PathBuf> {
        self.conn
            .path()
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "
CREATE TABLE IF NOT EXISTS url_rewrites (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    entity_type TEXT NOT NULL CHECK(entity_type IN ('product', 'category')),
    entity_id INTEGER NOT NULL,
    request_path TEXT NOT NULL,
    target_path TEXT NOT NULL,
    redirect_type INTEGER NOT NULL DEFAULT 0 CHECK(redirect_type IN (0, 301, 302)),
    store_id INTEGER NOT NULL,
    is_autogenerated INTEGER NOT NULL DEFAULT 1,
    metadata TEXT,              -- JSON object
    updated_at INTEGER NOT NULL,
    UNIQUE(request_path, store_id)
);

CREATE INDEX IF NOT EXISTS idx_url_rewrites_entity ON url_rewrites(entity_type, entity_id);
CREATE INDEX IF NOT EXISTS idx_url_rewrites_target ON url_rewrites(target_path);

-- Reindex runs
CREATE TABLE IF NOT EXISTS reindex_runs (
    id TEXT PRIMARY KEY,
    start_time INTEGER NOT NULL,
    end_time INTEGER,
    status TEXT NOT NULL CHECK(status IN ('running', 'completed', 'failed')),
    catalog TEXT NOT NULL,
    counts TEXT                 -- JSON RunCounts
);
            ",
        )
    }

    // Rewrites
    pub fn insert_rewrite(&self, rewrite: &UrlRewrite) -> Result<i64> {
        insert_row(&self.conn, rewrite)
    }

    pub fn get_rewrite(&self, store_id: StoreId, request_path: &str) -> Result<Option<UrlRewrite>> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {} FROM url_rewrites WHERE request_path = ?1 AND store_id = ?2",
                    REWRITE_COLUMNS
                ),
                params![request_path, store_id],
                row_to_rewrite,
            )
            .optional()
    }

    /// Rows on `request_path` in every store, global row first.
    pub fn get_rewrites_by_request_path(&self, request_path: &str) -> Result<Vec<UrlRewrite>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM url_rewrites WHERE request_path = ?1 ORDER BY store_id",
            REWRITE_COLUMNS
        ))?;

        let rewrites = stmt
            .query_map(params![request_path], row_to_rewrite)?
            .collect::<Result<Vec<_>>>()?;

        Ok(rewrites)
    }

    pub fn get_rewrites_by_entity(
        &self,
        entity_type: EntityType,
        entity_id: EntityId,
    ) -> Result<Vec<UrlRewrite>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM url_rewrites WHERE entity_type = ?1 AND entity_id = ?2
             ORDER BY store_id, request_path",
            REWRITE_COLUMNS
        ))?;

        let rewrites = stmt
            .query_map(params![entity_type.as_str(), entity_id], row_to_rewrite)?
            .collect::<Result<Vec<_>>>()?;

        Ok(rewrites)
    }

    pub fn list_rewrites(&self, filter: &RewriteFilter) -> Result<Vec<UrlRewrite>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM url_rewrites
             WHERE (?1 IS NULL OR store_id = ?1)
               AND (?2 IS NULL OR entity_type = ?2)
               AND (?3 IS NULL OR entity_id = ?3)
               AND (?4 = 0 OR redirect_type != 0)
             ORDER BY store_id, request_path",
            REWRITE_COLUMNS
        ))?;

        let rewrites = stmt
            .query_map(
                params![
                    filter.store_id,
                    filter.entity_type.map(|t| t.as_str()),
                    filter.entity_id,
                    filter.redirects_only,
                ],
                row_to_rewrite,
            )?
            .collect::<Result<Vec<_>>>()?;

        Ok(rewrites)
    }

    pub fn count_rewrites(&self) -> Result<i64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM url_rewrites", [], |row| row.get(0))
    }

    /// Row serving `request_path` in a store: the store's own row first, then the global one.
    pub fn lookup(&self, request_path: &str, store_id: StoreId) -> Result<Option<UrlRewrite>> {
        if store_id != DEFAULT_STORE_ID
            && let Some(rewrite) = self.get_rewrite(store_id, request_path)?
        {
            return Ok(Some(rewrite));
        }
        self.get_rewrite(DEFAULT_STORE_ID, request_path)
    }

    /// Follows redirects from `request_path` until an internal target is reached.
    pub fn resolve(&self, request_path: &str, store_id: StoreId) -> Result<Option<Resolution>> {
        let request_path = request_path.trim_start_matches('/');
        let Some(first) = self.lookup(request_path, store_id)? else {
            return Ok(None);
        };

        let mut visited = HashSet::from([first.request_path.clone()]);
        let mut hops = vec![first];
        let mut loop_detected = false;

        while hops.len() <= MAX_REDIRECT_HOPS {
            let Some(last) = hops.last() else { break };
            if !last.redirect_type.is_redirect() {
                break;
            }
            let next_path = last.target_path.clone();
            if !visited.insert(next_path.clone()) {
                loop_detected = true;
                break;
            }
            match self.lookup(&next_path, store_id)? {
                Some(next) => hops.push(next),
                None => break,
            }
        }

        let target_path = hops
            .last()
            .map(|r| r.target_path.clone())
            .unwrap_or_default();

        Ok(Some(Resolution {
            request_path: request_path.to_string(),
            store_id,
            hops,
            target_path,
            loop_detected,
        }))
    }

    /// Applies a reconciliation in a single transaction.
    pub fn apply_reconciliation(&mut self, changes: &Reconciliation) -> Result<()> {
        let tx = self.conn.transaction()?;

        for retired in &changes.to_delete_or_redirect {
            match retired {
                Retired::Redirect { redirect, .. } => {
                    update_row(&tx, redirect)?;
                }
                Retired::Superseded { original } => {
                    tx.execute(
                        "DELETE FROM url_rewrites
                         WHERE request_path = ?1 AND store_id = ?2 AND is_autogenerated = 1",
                        params![&original.request_path, original.store_id],
                    )?;
                }
            }
        }

        for rewrite in &changes.to_insert {
            insert_row(&tx, rewrite)?;
        }

        for rewrite in &changes.to_update {
            update_row(&tx, rewrite)?;
        }

        tx.commit()
    }

    // Reindex run bookkeeping
    pub fn create_run(&self, catalog: &str) -> Result<String> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let timestamp = current_timestamp();

        self.conn.execute(
            "INSERT INTO reindex_runs (id, start_time, status, catalog) VALUES (?1, ?2, ?3, ?4)",
            params![&run_id, timestamp, RunStatus::Running.as_str(), catalog],
        )?;

        Ok(run_id)
    }

    pub fn finish_run(&self, run_id: &str, status: RunStatus, counts: &RunCounts) -> Result<()> {
        let timestamp = current_timestamp();
        let counts = serde_json::to_string(counts)
            .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

        self.conn.execute(
            "UPDATE reindex_runs SET status = ?1, end_time = ?2, counts = ?3 WHERE id = ?4",
            params![status.as_str(), timestamp, counts, run_id],
        )?;
        Ok(())
    }

    pub fn get_run(&self, run_id: &str) -> Result<Option<RunRecord>> {
        self.conn
            .query_row(
                "SELECT id, start_time, end_time, status, catalog, counts FROM reindex_runs WHERE id = ?1",
                params![run_id],
                |row| {
                    let counts: Option<String> = row.get(5)?;
                    let counts = match counts {
                        Some(json) => serde_json::from_str(&json).map_err(|e| {
                            rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e))
                        })?,
                        None => RunCounts::default(),
                    };
                    Ok(RunRecord {
                        id: row.get(0)?,
                        start_time: row.get(1)?,
                        end_time: row.get(2)?,
                        status: row.get(3)?,
                        catalog: row.get(4)?,
                        counts,
                    })
                },
            )
            .optional()
    }

    pub fn get_connection(&self) -> &Connection {
        &self.conn
    }
}

impl RewriteStore for Database {
    type Error = rusqlite::Error;

    fn find_by_entity(
        &self,
        entity_type: EntityType,
        entity_id: EntityId,
    ) -> Result<RewriteSet> {
        self.get_rewrites_by_entity(entity_type, entity_id)
            .map(RewriteSet::new)
    }

    fn find_by_request_paths(&self, paths: &[String]) -> Result<RewriteSet> {
        let mut rewrites = Vec::new();
        for request_path in paths {
            rewrites.extend(self.get_rewrites_by_request_path(request_path)?);
        }
        Ok(RewriteSet::new(rewrites))
    }

    fn apply(&mut self, changes: &Reconciliation) -> Result<()> {
        self.apply_reconciliation(changes)
    }
}
