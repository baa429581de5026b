use std::path::Path;

use rusqlite::{Connection, Transaction};
use tracing::debug;

use crate::errors::{LeagueError, Result};

const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Owner of the league SQLite connection.
pub struct LeagueDb {
    conn: Connection,
}

impl LeagueDb {
    /// Open (or create) the database file and apply the schema.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the parent directory cannot be created, the
    /// file cannot be opened, or the schema fails to apply.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                LeagueError::StorageError(format!(
                    "failed to create db directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let conn = Connection::open(path).map_err(|e| {
            LeagueError::StorageError(format!("failed to open db at {}: {e}", path.display()))
        })?;
        Self::init(conn, path.display().to_string())
    }

    /// Open a private in-memory database with the schema applied.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the schema fails to apply.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn, ":memory:".to_string())
    }

    fn init(conn: Connection, label: String) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA_SQL)
            .map_err(|e| LeagueError::StorageError(format!("failed to apply schema: {e}")))?;
        debug!(db = %label, "League DB initialized");
        Ok(Self { conn })
    }

    #[must_use]
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Begin a transaction. Dropping it without commit rolls back.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if SQLite refuses to start the transaction.
    pub fn transaction(&mut self) -> Result<Transaction<'_>> {
        Ok(self.conn.transaction()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_creates_all_tables() {
        let db = LeagueDb::open_in_memory().unwrap();
        let mut stmt = db
            .conn()
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .unwrap();
        let names: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<_, _>>()
            .unwrap();
        for table in [
            "entries",
            "matches",
            "season_scores",
            "seasons",
            "session_settlements",
            "session_stats",
            "sessions",
            "users",
        ] {
            assert!(names.iter().any(|n| n == table), "missing {table}");
        }
    }

    #[test]
    fn reopening_a_file_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("league.db");
        {
            let db = LeagueDb::open(&path).unwrap();
            db.conn()
                .execute(
                    "INSERT INTO users (slack_user_id, display_name, created_at) VALUES ('U1', 'a', 'x')",
                    [],
                )
                .unwrap();
        }
        let db = LeagueDb::open(&path).unwrap();
        let count: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }
}
