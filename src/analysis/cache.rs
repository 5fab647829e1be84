//! Content-addressed verdict cache
//!
//! A verdict list is stored under the pair (hash of file content, hash of
//! practice statement). Both hashes are taken over text with quotes, backticks
//! and whitespace removed, so formatting-only edits keep hitting the cache.
//! Renaming or moving a file does not matter; only what it contains does.

use super::error::CacheError;
use super::types::VerdictRecord;
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Characters (besides whitespace) that never affect a cache key
pub const IGNORED_KEY_CHARS: [char; 3] = ['\'', '"', '`'];

/// Strips quotes, backticks and all whitespace
pub fn normalize_for_key(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace() && !IGNORED_KEY_CHARS.contains(c))
        .collect()
}

/// Hex SHA-256 of the normalized text
pub fn content_digest(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize_for_key(text).as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub file_hash: String,
    pub practice_hash: String,
}

impl CacheKey {
    pub fn derive(content: &str, statement: &str) -> Self {
        Self {
            file_hash: content_digest(content),
            practice_hash: content_digest(statement),
        }
    }
}

/// Durable map from (content, statement) to a complete verdict list
#[async_trait]
pub trait ContentCache: Send + Sync {
    async fn lookup(
        &self,
        content: &str,
        statement: &str,
    ) -> Result<Option<Vec<VerdictRecord>>, CacheError>;

    /// Last writer wins
    async fn store(
        &self,
        content: &str,
        statement: &str,
        records: &[VerdictRecord],
    ) -> Result<(), CacheError>;
}

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS verdicts (
      file_hash     TEXT NOT NULL,
      practice_hash TEXT NOT NULL,
      records       TEXT NOT NULL,
      updated_at    TEXT NOT NULL,
      PRIMARY KEY (file_hash, practice_hash)
    );
"#;

/// SQLite-backed cache. Calls run on the blocking pool so a slow disk never
/// stalls the evaluation workers.
#[derive(Clone)]
pub struct SqliteContentCache {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl SqliteContentCache {
    /// Opens (or creates) the cache file, creating parent directories
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CacheError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Opened verdict cache at {}", path.display());

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: Some(path.to_path_buf()),
        })
    }

    pub fn open_in_memory() -> Result<Self, CacheError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: None,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub async fn entry_count(&self) -> Result<u64, CacheError> {
        self.with_connection(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM verdicts", [], |row| row.get(0))?;
            Ok(count.max(0) as u64)
        })
        .await
    }

    /// Removes every entry, returning how many were deleted
    pub async fn clear(&self) -> Result<u64, CacheError> {
        let removed = self
            .with_connection(|conn| Ok(conn.execute("DELETE FROM verdicts", [])? as u64))
            .await?;
        info!("Cleared {} cached verdict lists", removed);
        Ok(removed)
    }

    async fn with_connection<F, T>(&self, f: F) -> Result<T, CacheError>
    where
        F: FnOnce(&Connection) -> Result<T, CacheError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().map_err(|_| CacheError::Poisoned)?;
            f(&guard)
        })
        .await
        .map_err(|e| CacheError::TaskJoin(e.to_string()))?
    }
}

impl std::fmt::Debug for SqliteContentCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteContentCache")
            .field("path", &self.path)
            .finish()
    }
}

#[async_trait]
impl ContentCache for SqliteContentCache {
    async fn lookup(
        &self,
        content: &str,
        statement: &str,
    ) -> Result<Option<Vec<VerdictRecord>>, CacheError> {
        let key = CacheKey::derive(content, statement);
        let raw: Option<String> = self
            .with_connection(move |conn| {
                Ok(conn
                    .query_row(
                        "SELECT records FROM verdicts WHERE file_hash = ?1 AND practice_hash = ?2",
                        (&key.file_hash, &key.practice_hash),
                        |row| row.get(0),
                    )
                    .optional()?)
            })
            .await?;

        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn store(
        &self,
        content: &str,
        statement: &str,
        records: &[VerdictRecord],
    ) -> Result<(), CacheError> {
        let key = CacheKey::derive(content, statement);
        let json = serde_json::to_string(records)?;
        debug!(
            "Caching {} verdicts for file {} / practice {}",
            records.len(),
            &key.file_hash[..12],
            &key.practice_hash[..12]
        );

        self.with_connection(move |conn| {
            let now = Utc::now().to_rfc3339();
            conn.execute(
                r#"
                INSERT INTO verdicts(file_hash, practice_hash, records, updated_at)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(file_hash, practice_hash) DO UPDATE SET
                  records    = excluded.records,
                  updated_at = excluded.updated_at
                "#,
                (&key.file_hash, &key.practice_hash, &json, &now),
            )?;
            Ok(())
        })
        .await
    }
}

/// In-process cache, used for `--no-cache` style runs and in tests
#[derive(Debug, Default)]
pub struct MemoryContentCache {
    entries: Mutex<HashMap<CacheKey, Vec<VerdictRecord>>>,
}

impl MemoryContentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ContentCache for MemoryContentCache {
    async fn lookup(
        &self,
        content: &str,
        statement: &str,
    ) -> Result<Option<Vec<VerdictRecord>>, CacheError> {
        let key = CacheKey::derive(content, statement);
        let entries = self.entries.lock().map_err(|_| CacheError::Poisoned)?;
        Ok(entries.get(&key).cloned())
    }

    async fn store(
        &self,
        content: &str,
        statement: &str,
        records: &[VerdictRecord],
    ) -> Result<(), CacheError> {
        let key = CacheKey::derive(content, statement);
        let mut entries = self.entries.lock().map_err(|_| CacheError::Poisoned)?;
        entries.insert(key, records.to_vec());
        Ok(())
    }
}
