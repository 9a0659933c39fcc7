use std::collections::HashMap;

use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};

/// Key-value persistence contract the counter store flushes through.
///
/// Both operations are fallible; an absent key on load means "start from
/// empty state", and a failed save is non-fatal to the caller (retried on
/// the next mutation).
pub trait StateStore: Send {
    fn load(&mut self, key: &str) -> Result<Option<Vec<u8>>>;

    fn save(&mut self, key: &str, value: &[u8]) -> Result<()>;
}

/// SQLite-backed state store: one `kv_state` table, value replaced in place.
pub struct SqliteStateStore {
    conn: Connection,
}

impl SqliteStateStore {
    pub fn open(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        let mut store = Self { conn };
        store.ensure_schema()?;
        Ok(store)
    }

    fn ensure_schema(&mut self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;

            CREATE TABLE IF NOT EXISTS kv_state (
              key TEXT PRIMARY KEY,
              value BLOB NOT NULL
            );
            "#,
        )?;
        Ok(())
    }
}

impl StateStore for SqliteStateStore {
    fn load(&mut self, key: &str) -> Result<Option<Vec<u8>>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv_state WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn save(&mut self, key: &str, value: &[u8]) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv_state(key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}

/// In-memory state store for tests.
#[derive(Debug, Default)]
pub struct InMemoryStateStore {
    entries: HashMap<String, Vec<u8>>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for InMemoryStateStore {
    fn load(&mut self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.get(key).cloned())
    }

    fn save(&mut self, key: &str, value: &[u8]) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }
}
