use rusqlite::Connection;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;
use tracing::debug;

/// Things that can go wrong in the blob store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage backend failed: {0}")]
    Backend(String),

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Key-value store for opaque JSON blobs
///
/// The marketplace persists whole entities as JSON under well-known keys
/// (the product list, per-user favorite sets, the activity map). Abstracting
/// the store behind a trait lets tests swap in the in-memory stub without
/// touching a real database file.
pub trait BlobStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn put(&self, key: &str, value: &str) -> Result<()>;
    /// Write several blobs in one atomic step - all land or none do.
    fn put_many(&self, entries: &[(&str, String)]) -> Result<()>;
    fn delete(&self, key: &str) -> Result<()>;
}

/// Deserialize a stored blob, `None` if the key was never written
pub fn get_json<T, S>(store: &S, key: &str) -> Result<Option<T>>
where
    T: DeserializeOwned,
    S: BlobStore + ?Sized,
{
    match store.get(key)? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Serialize and store a value under a key
pub fn put_json<T, S>(store: &S, key: &str, value: &T) -> Result<()>
where
    T: Serialize,
    S: BlobStore + ?Sized,
{
    let raw = serde_json::to_string(value)?;
    store.put(key, &raw)
}

/// SQLite-backed blob store
///
/// SQLite was chosen because:
/// - Zero-config embedded database
/// - Transactions give us atomic multi-key writes for free
/// - Battle-tested and reliable
/// - Doesn't require a separate process
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Purely in-memory database, handy for tests
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS blobs (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Backend("store mutex poisoned".into()))
    }
}

impl BlobStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT value FROM blobs WHERE key = ?1")?;
        let mut rows = stmt.query([key])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO blobs (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = ?3",
            rusqlite::params![key, value, chrono::Utc::now().timestamp()],
        )?;
        Ok(())
    }

    fn put_many(&self, entries: &[(&str, String)]) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let now = chrono::Utc::now().timestamp();
        for (key, value) in entries {
            tx.execute(
                "INSERT INTO blobs (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = ?2, updated_at = ?3",
                rusqlite::params![key, value, now],
            )?;
        }
        tx.commit()?;
        debug!("Committed {} blobs", entries.len());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM blobs WHERE key = ?1", [key])?;
        Ok(())
    }
}

/// In-memory stub with the same contract, for tests and ephemeral runs
#[derive(Default)]
pub struct MemoryStore {
    map: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.map
            .lock()
            .map_err(|_| StoreError::Backend("store mutex poisoned".into()))
    }
}

impl BlobStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn put_many(&self, entries: &[(&str, String)]) -> Result<()> {
        let mut map = self.lock()?;
        for (key, value) in entries {
            map.insert(key.to_string(), value.clone());
        }
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_round_trip() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.get("missing").unwrap().is_none());

        store.put("products", r#"[{"id":"p1"}]"#).unwrap();
        assert_eq!(
            store.get("products").unwrap().as_deref(),
            Some(r#"[{"id":"p1"}]"#)
        );

        // Overwrite wins
        store.put("products", "[]").unwrap();
        assert_eq!(store.get("products").unwrap().as_deref(), Some("[]"));

        store.delete("products").unwrap();
        assert!(store.get("products").unwrap().is_none());
    }

    #[test]
    fn put_many_writes_all_keys() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .put_many(&[
                ("products", "[]".to_string()),
                ("favorites:u1", r#"["p1"]"#.to_string()),
            ])
            .unwrap();

        assert_eq!(store.get("products").unwrap().as_deref(), Some("[]"));
        assert_eq!(
            store.get("favorites:u1").unwrap().as_deref(),
            Some(r#"["p1"]"#)
        );
    }

    #[test]
    fn json_helpers_round_trip() {
        let store = MemoryStore::new();
        put_json(&store, "ids", &vec!["a".to_string(), "b".to_string()]).unwrap();

        let ids: Option<Vec<String>> = get_json(&store, "ids").unwrap();
        assert_eq!(ids, Some(vec!["a".to_string(), "b".to_string()]));

        let missing: Option<Vec<String>> = get_json(&store, "nope").unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn memory_store_behaves_like_sqlite() {
        let store = MemoryStore::new();
        store.put("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
        store.delete("k").unwrap();
        assert!(store.get("k").unwrap().is_none());
    }
}
