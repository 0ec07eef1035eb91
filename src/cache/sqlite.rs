//! Persistent cache store backed by SQLite.
//! One row per (request_key, kind); upserts replace payload and translated flag in place.

use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use super::{CacheEntry, CacheError, CacheKind, CacheStore};

pub struct SqliteCacheStore {
    conn: Mutex<Connection>,
}

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS cocktail_cache (
        request_key TEXT NOT NULL,
        kind TEXT NOT NULL,
        response_json TEXT NOT NULL,
        translated INTEGER NOT NULL DEFAULT 0,
        updated_at INTEGER NOT NULL,
        PRIMARY KEY (request_key, kind)
    );";

impl SqliteCacheStore {
    /// Open (or create) the cache database at the given path.
    pub fn open(db_path: &Path) -> Result<Self, CacheError> {
        let conn = Connection::open(db_path)?;
        // WAL mode for better concurrent read performance
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        conn.execute_batch(SCHEMA)?;
        info!(path = %db_path.display(), "SQLite cache opened");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Private in-memory database, mostly for tests.
    pub fn open_in_memory() -> Result<Self, CacheError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl CacheStore for SqliteCacheStore {
    fn find(&self, request_key: &str, kind: CacheKind) -> Result<Option<CacheEntry>, CacheError> {
        let conn = self.conn.lock();
        let row: Option<(String, String, i64)> = conn
            .query_row(
                "SELECT kind, response_json, translated FROM cocktail_cache
                 WHERE request_key = ?1 AND kind = ?2",
                params![request_key, kind.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        let Some((stored_kind, payload, translated)) = row else {
            return Ok(None);
        };
        let kind = CacheKind::parse(&stored_kind)
            .ok_or_else(|| CacheError::Corrupt(format!("unknown kind {stored_kind:?}")))?;
        debug!(key = request_key, kind = %kind, translated = translated != 0, "cache row hit");
        Ok(Some(CacheEntry {
            request_key: request_key.to_string(),
            kind,
            payload,
            translated: translated != 0,
        }))
    }

    fn upsert(&self, entry: CacheEntry) -> Result<(), CacheError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO cocktail_cache (request_key, kind, response_json, translated, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (request_key, kind) DO UPDATE SET
                response_json = excluded.response_json,
                translated = excluded.translated,
                updated_at = excluded.updated_at",
            params![
                entry.request_key,
                entry.kind.as_str(),
                entry.payload,
                entry.translated,
                now_unix()
            ],
        )?;
        Ok(())
    }

    fn len(&self) -> Result<usize, CacheError> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM cocktail_cache", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

fn now_unix() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
