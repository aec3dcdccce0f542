//! store.rs: durable set of adverts already seen, keyed by (portal, external id).

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use rusqlite::{params, Connection, ErrorCode};

use crate::error::StoreError;
use crate::extract::types::AdvertRecord;

pub trait AdvertStore: Send + Sync {
    /// Create tables if absent. Safe to call any number of times.
    fn initialize(&self) -> Result<(), StoreError>;

    fn exists(&self, source_id: &str, external_id: &str) -> Result<bool, StoreError>;

    /// Persist a new advert. Committed before returning; a pair that is
    /// already present fails with [`StoreError::Conflict`].
    fn insert(&self, record: &AdvertRecord) -> Result<(), StoreError>;

    fn count(&self) -> Result<u64, StoreError>;
}

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS adverts (
        source_id   TEXT NOT NULL,
        external_id TEXT NOT NULL,
        title       TEXT NOT NULL,
        url         TEXT NOT NULL,
        price       TEXT,
        first_seen  TEXT NOT NULL,
        PRIMARY KEY (source_id, external_id)
    );
";

#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database file, creating its directory if needed.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize()?;
        Ok(store)
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // Poison is ignored: every statement autocommits.
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AdvertStore for SqliteStore {
    fn initialize(&self) -> Result<(), StoreError> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    fn exists(&self, source_id: &str, external_id: &str) -> Result<bool, StoreError> {
        let found: bool = self.conn().query_row(
            "SELECT EXISTS(SELECT 1 FROM adverts WHERE source_id = ?1 AND external_id = ?2)",
            params![source_id, external_id],
            |row| row.get(0),
        )?;
        Ok(found)
    }

    fn insert(&self, record: &AdvertRecord) -> Result<(), StoreError> {
        let first_seen = chrono::Utc::now().to_rfc3339();
        let res = self.conn().execute(
            "INSERT INTO adverts (source_id, external_id, title, url, price, first_seen)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.source_id,
                record.external_id,
                record.title,
                record.url,
                record.price,
                first_seen
            ],
        );
        match res {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::Conflict {
                    source_id: record.source_id.clone(),
                    external_id: record.external_id.clone(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    fn count(&self) -> Result<u64, StoreError> {
        let n: i64 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM adverts", [], |row| row.get(0))?;
        Ok(n.max(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desk() -> AdvertRecord {
        AdvertRecord {
            source_id: "x".into(),
            external_id: "1".into(),
            title: "Desk".into(),
            url: "https://x/1".into(),
            price: Some("10".into()),
        }
    }

    #[test]
    fn fresh_store_knows_nothing() {
        let s = SqliteStore::open_in_memory().unwrap();
        assert!(!s.exists("x", "1").unwrap());
        assert_eq!(s.count().unwrap(), 0);
    }

    #[test]
    fn initialize_is_idempotent() {
        let s = SqliteStore::open_in_memory().unwrap();
        s.insert(&desk()).unwrap();
        s.initialize().unwrap();
        s.initialize().unwrap();
        assert!(s.exists("x", "1").unwrap());
    }

    #[test]
    fn key_is_scoped_by_portal() {
        let s = SqliteStore::open_in_memory().unwrap();
        s.insert(&desk()).unwrap();
        assert!(!s.exists("y", "1").unwrap());
        let mut other = desk();
        other.source_id = "y".into();
        s.insert(&other).unwrap();
        assert_eq!(s.count().unwrap(), 2);
    }
}
