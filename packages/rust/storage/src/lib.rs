//! Turso Embedded / libSQL storage layer for pipeline memory.
//!
//! The [`Storage`] struct wraps a libSQL database holding a keyed history of
//! JSON values written by pipeline stages (`last_collection`,
//! `last_analysis`, ...).
//!
//! **Access rules:**
//! - the pipeline process: read-write via [`Storage::open`]
//! - inspection tools: read-only via [`Storage::open_readonly`]

mod migrations;

use std::path::Path;

use aiinsight_shared::{AiInsightError, Result};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use libsql::{Connection, Database, params};
use serde::Serialize;
use uuid::Uuid;

/// One stored memory value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemoryEntry {
    pub id: String,
    pub key: String,
    pub value: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AiInsightError::io(parent, e))?;
        }

        let storage = Self::connect(path, false).await?;
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open an existing database at `path` in read-only mode.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        Self::connect(path, true).await
    }

    async fn connect(path: &Path, readonly: bool) -> Result<Self> {
        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| AiInsightError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| AiInsightError::Storage(e.to_string()))?;

        Ok(Self { db, conn, readonly })
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
                self.conn.execute_batch(migration.sql).await.map_err(|e| {
                    AiInsightError::Storage(format!(
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

    /// Ensure we're in read-write mode before writing.
    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(AiInsightError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Memory operations
    // -----------------------------------------------------------------------

    /// Append a value under `key`. Returns the new entry ID.
    pub async fn store(&self, key: &str, value: &serde_json::Value) -> Result<String> {
        self.check_writable()?;
        let id = Uuid::now_v7().to_string();
        let value_json =
            serde_json::to_string(value).map_err(|e| AiInsightError::Storage(e.to_string()))?;
        let now = timestamp(Utc::now());

        self.conn
            .execute(
                "INSERT INTO memory (id, key, value_json, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![id.as_str(), key, value_json.as_str(), now.as_str()],
            )
            .await
            .map_err(|e| AiInsightError::Storage(e.to_string()))?;

        tracing::debug!(key, id = %id, "stored memory entry");
        Ok(id)
    }

    /// Most recent entry for `key`, if any.
    pub async fn latest(&self, key: &str) -> Result<Option<MemoryEntry>> {
        Ok(self.history(key, 1).await?.into_iter().next())
    }

    /// Up to `limit` entries for `key`, newest first.
    pub async fn history(&self, key: &str, limit: usize) -> Result<Vec<MemoryEntry>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut rows = self
            .conn
            .query(
                "SELECT id, key, value_json, created_at FROM memory
                 WHERE key = ?1 ORDER BY seq DESC LIMIT ?2",
                params![key, limit],
            )
            .await
            .map_err(|e| AiInsightError::Storage(e.to_string()))?;

        let mut entries = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| AiInsightError::Storage(e.to_string()))?
        {
            entries.push(row_to_entry(&row)?);
        }
        Ok(entries)
    }

    /// Total number of stored entries across all keys.
    pub async fn count(&self) -> Result<u64> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM memory", params![])
            .await
            .map_err(|e| AiInsightError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => row
                .get::<u64>(0)
                .map_err(|e| AiInsightError::Storage(e.to_string())),
            Ok(None) => Ok(0),
            Err(e) => Err(AiInsightError::Storage(e.to_string())),
        }
    }

    /// Delete entries older than `retention_days`, then the oldest entries
    /// beyond `max_items`. Returns the number of deleted rows.
    pub async fn prune(&self, retention_days: u32, max_items: usize) -> Result<u64> {
        self.check_writable()?;
        let cutoff = timestamp(Utc::now() - Duration::days(i64::from(retention_days)));

        let expired = self
            .conn
            .execute(
                "DELETE FROM memory WHERE created_at < ?1",
                params![cutoff.as_str()],
            )
            .await
            .map_err(|e| AiInsightError::Storage(e.to_string()))?;

        let keep = i64::try_from(max_items).unwrap_or(i64::MAX);
        let overflow = self
            .conn
            .execute(
                "DELETE FROM memory WHERE seq NOT IN
                 (SELECT seq FROM memory ORDER BY seq DESC LIMIT ?1)",
                params![keep],
            )
            .await
            .map_err(|e| AiInsightError::Storage(e.to_string()))?;

        let deleted = expired + overflow;
        if deleted > 0 {
            tracing::info!(expired, overflow, "pruned memory entries");
        }
        Ok(deleted)
    }
}

/// RFC 3339 with fixed precision so stored timestamps compare as strings.
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Convert a database row to a [`MemoryEntry`].
fn row_to_entry(row: &libsql::Row) -> Result<MemoryEntry> {
    let value_json: String = row
        .get(2)
        .map_err(|e| AiInsightError::Storage(e.to_string()))?;
    let created_at: String = row
        .get(3)
        .map_err(|e| AiInsightError::Storage(e.to_string()))?;

    Ok(MemoryEntry {
        id: row
            .get::<String>(0)
            .map_err(|e| AiInsightError::Storage(e.to_string()))?,
        key: row
            .get::<String>(1)
            .map_err(|e| AiInsightError::Storage(e.to_string()))?,
        value: serde_json::from_str(&value_json)
            .map_err(|e| AiInsightError::Storage(format!("invalid stored value: {e}")))?,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| AiInsightError::Storage(format!("invalid date: {e}")))?,
    })
}
