use std::{collections::HashSet, str::FromStr as _, time::Duration};

use api::{RowFilter, SecretRow};
use jiff::Timestamp;
use serde_json::Value;
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    types::Json,
};
use tokio::{
    sync::oneshot,
    task::JoinHandle,
    time::{MissedTickBehavior, interval},
};

use crate::tree::FlattenedLeaf;

#[derive(thiserror::Error, Debug)]
pub enum CacheError {
    #[error("Secret cache query failed: {0}")]
    Database(#[from] sqlx::Error),
}

type Result<T> = core::result::Result<T, CacheError>;

const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS secrets (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    path TEXT NOT NULL,
    value TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    UNIQUE (name, path)
);
CREATE INDEX IF NOT EXISTS secrets_name ON secrets (name);
CREATE INDEX IF NOT EXISTS secrets_path ON secrets (path);
CREATE INDEX IF NOT EXISTS secrets_created_at ON secrets (created_at);
";

/// Disposable projection of vault secrets as flattened rows.
///
/// Rows are never the source of truth: every update reads the secret from the vault again.
/// `(name, path)` is unique, inserting an existing leaf is a no-op.
#[derive(Clone, Debug)]
pub struct SecretCache {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct CachedRow {
    name: String,
    path: String,
    value: Json<Value>,
}

impl From<CachedRow> for SecretRow {
    fn from(row: CachedRow) -> Self {
        Self {
            name: row.name,
            path: row.path,
            value: row.value.0,
        }
    }
}

impl SecretCache {
    /// Open (and create) the cache at `url`, e.g. `sqlite::memory:` or `sqlite://cache.db`
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = if url.contains(":memory:") || url.contains("mode=memory") {
            // every connection would see its own empty in-memory database
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new().connect_with(options).await?
        };
        sqlx::raw_sql(SCHEMA).execute(&pool).await?;
        Ok(Self { pool })
    }

    /// Names of all secrets that have at least one cached row
    pub async fn cached_names(&self) -> Result<HashSet<String>> {
        let names: Vec<String> = sqlx::query_scalar("SELECT DISTINCT name FROM secrets")
            .fetch_all(&self.pool)
            .await?;
        Ok(names.into_iter().collect())
    }

    /// Store the leaves of `name`. Returns how many rows were actually inserted
    pub async fn insert_rows(
        &self,
        name: &str,
        leaves: &[FlattenedLeaf],
        created_at: Timestamp,
    ) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;
        for leaf in leaves {
            inserted += sqlx::query(
                "INSERT INTO secrets (name, path, value, created_at) VALUES (?, ?, ?, ?)
                 ON CONFLICT (name, path) DO NOTHING",
            )
            .bind(name)
            .bind(&leaf.path)
            .bind(leaf.value.to_string())
            .bind(created_at.as_millisecond())
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }
        tx.commit().await?;
        Ok(inserted)
    }

    /// All rows in insertion order, restricted to the rows matching `filter`
    pub async fn rows(&self, filter: &RowFilter) -> Result<Vec<SecretRow>> {
        let rows: Vec<CachedRow> = sqlx::query_as(
            "SELECT name, path, value FROM secrets
             WHERE (?1 IS NULL OR name LIKE ?1)
               AND (?2 IS NULL OR path LIKE ?2)
               AND (?3 IS NULL OR value LIKE ?3)
             ORDER BY id",
        )
        .bind(filter.name.as_deref())
        .bind(filter.path.as_deref())
        .bind(filter.value.as_deref())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(SecretRow::from).collect())
    }

    /// Drop every row of a single secret so the next listing fetches it again
    pub async fn remove_secret(&self, name: &str) -> Result<u64> {
        Ok(sqlx::query("DELETE FROM secrets WHERE name = ?")
            .bind(name)
            .execute(&self.pool)
            .await?
            .rows_affected())
    }

    pub async fn clear(&self) -> Result<u64> {
        Ok(sqlx::query("DELETE FROM secrets")
            .execute(&self.pool)
            .await?
            .rows_affected())
    }

    pub async fn delete_older_than(&self, cutoff: Timestamp) -> Result<u64> {
        Ok(sqlx::query("DELETE FROM secrets WHERE created_at < ?")
            .bind(cutoff.as_millisecond())
            .execute(&self.pool)
            .await?
            .rows_affected())
    }

    /// Delete all rows which were cached more than `retention` ago
    pub async fn sweep_expired(&self, retention: Duration) -> Result<u64> {
        let cutoff = Timestamp::now()
            .checked_sub(retention)
            .unwrap_or(Timestamp::MIN);
        self.delete_older_than(cutoff).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepConfig {
    /// Time between two sweeps
    pub interval: Duration,
    /// Maximum age of a cached row
    pub retention: Duration,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5 * 60),
            retention: Duration::from_secs(5 * 60),
        }
    }
}

/// Background task which periodically removes expired rows from a [`SecretCache`]
pub struct Sweeper {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl Sweeper {
    pub fn start(cache: SecretCache, config: SweepConfig) -> Self {
        let (shutdown, mut stopped) = oneshot::channel();
        let task = tokio::spawn(async move {
            let mut ticks = interval(config.interval);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // the first tick completes immediately
            ticks.tick().await;
            loop {
                tokio::select! {
                    _ = &mut stopped => break,
                    _ = ticks.tick() => match cache.sweep_expired(config.retention).await {
                        Ok(deleted) => log::info!("Deleted {deleted} cached rows older than {:?}", config.retention),
                        Err(err) => log::error!("Cache sweep failed: {err}"),
                    },
                }
            }
        });
        Self { shutdown, task }
    }

    /// Stop sweeping and wait for a running sweep to finish
    pub async fn stop(self) {
        // the task is gone already if the receiver was dropped
        let _ = self.shutdown.send(());
        if let Err(err) = self.task.await {
            log::error!("Cache sweeper terminated abnormally: {err}");
        }
    }
}
