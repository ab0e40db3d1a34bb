use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use rusqlite_migration::{Migrations, M};

use crate::app::{ConfluenceError, Result};
use crate::store::{CacheEntry, Store};

const ACTIVE_GENERATION_KEY: &str = "active_generation";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);

        let mut conn = self.lock()?;

        conn.execute("PRAGMA foreign_keys = ON", [])?;
        migrations
            .to_latest(&mut conn)
            .map_err(|_| ConfluenceError::Database(rusqlite::Error::InvalidQuery))?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| {
            ConfluenceError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(1),
                Some(e.to_string()),
            ))
        })
    }

    fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| s.parse::<DateTime<Utc>>().ok())
    }
}

impl Store for SqliteStore {
    fn open_store(&self, name: &str) -> Result<()> {
        let conn = self.lock()?;

        conn.execute(
            "INSERT OR IGNORE INTO caches (name, created_at) VALUES (?1, ?2)",
            params![name, Utc::now().to_rfc3339()],
        )?;

        Ok(())
    }

    fn store_names(&self) -> Result<Vec<String>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare("SELECT name FROM caches ORDER BY created_at, name")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;

        Ok(names)
    }

    fn delete_store(&self, name: &str) -> Result<bool> {
        let conn = self.lock()?;

        // Entries go with it through ON DELETE CASCADE
        let deleted = conn.execute("DELETE FROM caches WHERE name = ?1", params![name])?;
        Ok(deleted > 0)
    }

    fn put(&self, entry: &CacheEntry) -> Result<()> {
        let mut conn = self.lock()?;

        // One transaction so readers never see a half-written entry
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT OR IGNORE INTO caches (name, created_at) VALUES (?1, ?2)",
            params![entry.store, Utc::now().to_rfc3339()],
        )?;
        tx.execute(
            "INSERT OR REPLACE INTO entries (cache_name, key, url, status, content_type, body, cached_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                entry.store,
                entry.key,
                entry.url,
                entry.status,
                entry.content_type,
                entry.body,
                entry.cached_at.to_rfc3339()
            ],
        )?;
        tx.commit()?;

        Ok(())
    }

    fn lookup(&self, stores: &[&str], key: &str) -> Result<Option<CacheEntry>> {
        let conn = self.lock()?;

        for store in stores {
            let found = conn
                .query_row(
                    "SELECT cache_name, key, url, status, content_type, body, cached_at
                     FROM entries WHERE cache_name = ?1 AND key = ?2",
                    params![store, key],
                    |row| {
                        Ok(CacheEntry {
                            store: row.get(0)?,
                            key: row.get(1)?,
                            url: row.get(2)?,
                            status: row.get(3)?,
                            content_type: row.get(4)?,
                            body: row.get(5)?,
                            cached_at: row
                                .get::<_, String>(6)
                                .ok()
                                .and_then(|s| Self::parse_datetime(&s))
                                .unwrap_or_else(Utc::now),
                        })
                    },
                )
                .optional()?;

            if found.is_some() {
                return Ok(found);
            }
        }

        Ok(None)
    }

    fn entry_count(&self, store: &str) -> Result<usize> {
        let conn = self.lock()?;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM entries WHERE cache_name = ?1",
            params![store],
            |row| row.get(0),
        )?;

        Ok(count as usize)
    }

    fn active_generation(&self) -> Result<Option<String>> {
        let conn = self.lock()?;

        let value = conn
            .query_row(
                "SELECT value FROM meta WHERE key = ?1",
                params![ACTIVE_GENERATION_KEY],
                |row| row.get(0),
            )
            .optional()?;

        Ok(value)
    }

    fn set_active_generation(&self, name: Option<&str>) -> Result<()> {
        let conn = self.lock()?;

        match name {
            Some(name) => {
                conn.execute(
                    "INSERT INTO meta (key, value) VALUES (?1, ?2)
                     ON CONFLICT(key) DO UPDATE SET value = ?2",
                    params![ACTIVE_GENERATION_KEY, name],
                )?;
            }
            None => {
                conn.execute(
                    "DELETE FROM meta WHERE key = ?1",
                    params![ACTIVE_GENERATION_KEY],
                )?;
            }
        }

        Ok(())
    }
}
