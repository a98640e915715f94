//! Database connection management with pragma configuration.
//!
//! This module handles opening the SQLite database, applying required pragmas
//! for performance and concurrency (WAL mode), running migrations, and the
//! version-level operations the lifecycle controller uses on activation.

use super::migrations;
use crate::Error;
use std::path::Path;
use tokio_rusqlite::{Connection, params};

/// Cache database handle.
///
/// Wraps a tokio-rusqlite Connection that runs database operations on a
/// background thread. All cache versions share one database file; each
/// version tag is its own namespace within it.
#[derive(Clone, Debug)]
pub struct CacheDb {
    pub(crate) conn: Connection,
}

impl CacheDb {
    /// Open a database at the specified path.
    ///
    /// Creates the file if it doesn't exist, applies performance pragmas,
    /// and runs any pending migrations.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let conn = Connection::open(path).await.map_err(|e| Error::Database(e.into()))?;
        Self::init(conn).await
    }

    /// Open an in-memory database for testing.
    ///
    /// Creates a temporary in-memory SQLite database with the same
    /// pragma configuration as file-based databases.
    pub async fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| Error::Database(e.into()))?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self, Error> {
        conn.call(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode=WAL;
                 PRAGMA synchronous=NORMAL;
                 PRAGMA temp_store=MEMORY;
                 PRAGMA foreign_keys=ON;",
            )?;
            Ok(())
        })
        .await
        .map_err(Error::Database)?;

        migrations::run(&conn).await?;

        Ok(Self { conn })
    }

    /// All version tags that currently hold entries.
    pub async fn list_versions(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT DISTINCT version FROM entries ORDER BY version")?;
                let versions = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(versions)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete every entry of one version namespace.
    ///
    /// Returns the number of deleted entries.
    pub async fn delete_version(&self, version: &str) -> Result<u64, Error> {
        let version = version.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM entries WHERE version = ?1", params![version])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
