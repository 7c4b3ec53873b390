//! libSQL record sink for imported liturgy entries.
//!
//! The [`Storage`] struct wraps a libSQL database, either a local file or a
//! remote server authenticated with a token taken from the environment.
//! Each import replaces the whole entry set in one transaction.

mod migrations;

use std::path::Path;

use chrono::{DateTime, Utc};
use libsql::{Connection, Database, params};
use uuid::Uuid;

use scriptorium_shared::{LiturgyEntry, Result, ScriptoriumError, SinkConfig};

const ENTRY_COLUMNS: &str =
    "season, title, entry_order, html_content, source_files, created_at";

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
}

impl Storage {
    /// Connect to the database described by the `[sink]` config.
    ///
    /// Remote databases fail with `ConfigurationMissing` when no token is set.
    pub async fn connect(config: &SinkConfig) -> Result<Self> {
        match config.auth_token()? {
            Some(token) => Self::open_remote(&config.database, token).await,
            None => Self::open(Path::new(&config.database)).await,
        }
    }

    /// Open or create a local database at `path`.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ScriptoriumError::io(parent, e))?;
            }
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| ScriptoriumError::Storage(e.to_string()))?;

        Self::from_database(db).await
    }

    /// Connect to a remote libSQL server.
    pub async fn open_remote(url: &str, auth_token: String) -> Result<Self> {
        let db = libsql::Builder::new_remote(url.to_string(), auth_token)
            .build()
            .await
            .map_err(|e| ScriptoriumError::Storage(e.to_string()))?;

        Self::from_database(db).await
    }

    async fn from_database(db: Database) -> Result<Self> {
        let conn = db
            .connect()
            .map_err(|e| ScriptoriumError::Storage(e.to_string()))?;

        let storage = Self { db, conn };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        ScriptoriumError::Storage(format!(
                            "migration v{} failed: {e}",
                            migration.version
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    // -----------------------------------------------------------------------
    // Entry operations
    // -----------------------------------------------------------------------

    /// Replace every stored entry with `entries`.
    ///
    /// Runs in a single transaction: on failure the previous rows remain.
    /// Returns the number of inserted rows.
    pub async fn replace_entries(&self, entries: &[LiturgyEntry]) -> Result<usize> {
        let tx = self
            .conn
            .transaction()
            .await
            .map_err(|e| ScriptoriumError::Storage(e.to_string()))?;

        let removed = tx
            .execute("DELETE FROM liturgy_entries", params![])
            .await
            .map_err(|e| ScriptoriumError::Storage(e.to_string()))?;
        if removed > 0 {
            tracing::info!(removed, "dropping existing entries");
        }

        let insert = format!(
            "INSERT INTO liturgy_entries (id, {ENTRY_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"
        );
        for entry in entries {
            let source_files = serde_json::to_string(&entry.source_files)
                .map_err(|e| ScriptoriumError::Storage(e.to_string()))?;
            tx.execute(
                &insert,
                params![
                    Uuid::now_v7().to_string(),
                    entry.season.as_str(),
                    entry.title.as_str(),
                    i64::from(entry.order),
                    entry.html_content.as_str(),
                    source_files,
                    entry.created_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| ScriptoriumError::Storage(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| ScriptoriumError::Storage(e.to_string()))?;

        tracing::info!(inserted = entries.len(), "stored liturgy entries");
        Ok(entries.len())
    }

    /// Count stored entries.
    pub async fn count_entries(&self) -> Result<u64> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM liturgy_entries", params![])
            .await
            .map_err(|e| ScriptoriumError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => row
                .get::<i64>(0)
                .map(|n| n.max(0) as u64)
                .map_err(|e| ScriptoriumError::Storage(e.to_string())),
            Ok(None) => Ok(0),
            Err(e) => Err(ScriptoriumError::Storage(e.to_string())),
        }
    }

    /// List all entries by order.
    pub async fn list_entries(&self) -> Result<Vec<LiturgyEntry>> {
        let sql = format!("SELECT {ENTRY_COLUMNS} FROM liturgy_entries ORDER BY entry_order");
        let mut rows = self
            .conn
            .query(&sql, params![])
            .await
            .map_err(|e| ScriptoriumError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| ScriptoriumError::Storage(e.to_string()))?
        {
            results.push(row_to_entry(&row)?);
        }
        Ok(results)
    }

    /// List the entries of one season by order.
    pub async fn list_entries_by_season(&self, season: &str) -> Result<Vec<LiturgyEntry>> {
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM liturgy_entries WHERE season = ?1 ORDER BY entry_order"
        );
        let mut rows = self
            .conn
            .query(&sql, params![season])
            .await
            .map_err(|e| ScriptoriumError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| ScriptoriumError::Storage(e.to_string()))?
        {
            results.push(row_to_entry(&row)?);
        }
        Ok(results)
    }
}

/// Convert a database row to a [`LiturgyEntry`].
fn row_to_entry(row: &libsql::Row) -> Result<LiturgyEntry> {
    let order: i64 = row
        .get(2)
        .map_err(|e| ScriptoriumError::Storage(e.to_string()))?;
    let source_files: String = row
        .get(4)
        .map_err(|e| ScriptoriumError::Storage(e.to_string()))?;
    let created_at: String = row
        .get(5)
        .map_err(|e| ScriptoriumError::Storage(e.to_string()))?;

    Ok(LiturgyEntry {
        season: row
            .get::<String>(0)
            .map_err(|e| ScriptoriumError::Storage(e.to_string()))?,
        title: row
            .get::<String>(1)
            .map_err(|e| ScriptoriumError::Storage(e.to_string()))?,
        order: u32::try_from(order)
            .map_err(|e| ScriptoriumError::Storage(format!("invalid order {order}: {e}")))?,
        html_content: row
            .get::<String>(3)
            .map_err(|e| ScriptoriumError::Storage(e.to_string()))?,
        source_files: serde_json::from_str(&source_files)
            .map_err(|e| ScriptoriumError::Storage(format!("invalid source_files: {e}")))?,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| ScriptoriumError::Storage(format!("invalid date: {e}")))?,
    })
}
