//! SQLite-backed item store.
//!
//! Writes go through one async mutex that also owns the `collected_at` clock,
//! so timestamps never go backwards in insertion order.

mod models;

use std::{
    path::{Path, PathBuf},
    str::FromStr,
    sync::Arc,
    time::Duration,
};

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub use models::{
    InsertOutcome, ListQuery, LocationKind, NewItem, NewsItem, SourceCount, Stats, StoreLocation,
    StoreStatus,
};
use models::{fmt_ts, parse_ts, NewsRow};

const MAX_CONNECTIONS: u32 = 5;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SELECT_ITEMS: &str = "SELECT id, title, title_translated, link, source_name, published_at, \
     collected_at, description, description_translated FROM news_items";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cannot create store directory {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to open database '{path}': {source}")]
    Connection { path: String, source: sqlx::Error },
    #[error("database '{path}' is not writable: {source}")]
    ReadOnly { path: String, source: sqlx::Error },
    #[error("failed to run database migrations: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("query failed: {0}")]
    Query(#[from] sqlx::Error),
    #[error("primary store unavailable ({primary}); fallback unavailable ({fallback})")]
    Unavailable {
        primary: Box<StoreError>,
        fallback: Box<StoreError>,
    },
}

#[derive(Clone)]
pub struct NewsStore {
    pool: SqlitePool,
    location: StoreLocation,
    /// Last issued `collected_at`; the lock also serializes writers.
    clock: Arc<Mutex<Option<DateTime<Utc>>>>,
}

impl NewsStore {
    /// Open (creating if needed) the database file at `path`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::open_as(path.as_ref(), LocationKind::Persistent).await
    }

    /// Open `primary`; if that fails, warn and open `fallback` in degraded mode.
    pub async fn open_with_fallback(
        primary: impl AsRef<Path>,
        fallback: impl AsRef<Path>,
    ) -> Result<Self, StoreError> {
        let (primary, fallback) = (primary.as_ref(), fallback.as_ref());
        let primary_err = match Self::open(primary).await {
            Ok(store) => return Ok(store),
            Err(e) => e,
        };
        warn!(
            path = %primary.display(),
            fallback = %fallback.display(),
            error = %primary_err,
            "primary store unavailable, running degraded on fallback path"
        );
        Self::open_as(fallback, LocationKind::Fallback)
            .await
            .map_err(|fallback_err| StoreError::Unavailable {
                primary: Box::new(primary_err),
                fallback: Box::new(fallback_err),
            })
    }

    /// Private in-memory database.
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        let opts = SqliteConnectOptions::from_str("sqlite::memory:").map_err(|source| {
            StoreError::Connection {
                path: ":memory:".to_string(),
                source,
            }
        })?;
        // One connection that never expires: the data lives inside it.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(opts)
            .await
            .map_err(|source| StoreError::Connection {
                path: ":memory:".to_string(),
                source,
            })?;
        Self::init(
            pool,
            StoreLocation {
                path: None,
                kind: LocationKind::Memory,
            },
        )
        .await
    }

    async fn open_as(path: &Path, kind: LocationKind) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| StoreError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let opts = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);
        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(opts)
            .await
            .map_err(|source| StoreError::Connection {
                path: path.display().to_string(),
                source,
            })?;

        Self::init(
            pool,
            StoreLocation {
                path: Some(path.to_path_buf()),
                kind,
            },
        )
        .await
    }

    async fn init(pool: SqlitePool, location: StoreLocation) -> Result<Self, StoreError> {
        sqlx::migrate!("./migrations").run(&pool).await?;

        // A file that opened read-only only fails on first write; find out now.
        let label = location
            .path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| ":memory:".to_string());
        {
            let mut conn = pool.acquire().await?;
            sqlx::query("BEGIN IMMEDIATE")
                .execute(&mut *conn)
                .await
                .map_err(|source| StoreError::ReadOnly {
                    path: label.clone(),
                    source,
                })?;
            sqlx::query("ROLLBACK").execute(&mut *conn).await?;
        }

        let last: Option<String> =
            sqlx::query_scalar("SELECT MAX(collected_at) FROM news_items")
                .fetch_one(&pool)
                .await?;

        info!(path = %label, kind = ?location.kind, "store ready");
        Ok(Self {
            pool,
            location,
            clock: Arc::new(Mutex::new(last.as_deref().and_then(parse_ts))),
        })
    }

    pub fn location(&self) -> &StoreLocation {
        &self.location
    }

    pub async fn insert_if_absent(&self, item: NewItem) -> Result<InsertOutcome, StoreError> {
        self.insert_if_absent_at(item, Utc::now()).await
    }

    /// Insert using `now` as the wall clock reading. Still clamped to the last issued value.
    pub async fn insert_if_absent_at(
        &self,
        item: NewItem,
        now: DateTime<Utc>,
    ) -> Result<InsertOutcome, StoreError> {
        let mut clock = self.clock.lock().await;
        let collected_at = match *clock {
            Some(last) if last > now => last,
            _ => now,
        };
        let published_at = item.published_at.unwrap_or(collected_at);

        let res = sqlx::query(
            "INSERT INTO news_items \
             (title, title_translated, link, source_name, published_at, collected_at, description, description_translated) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(link) DO NOTHING",
        )
        .bind(&item.title)
        .bind(&item.title_translated)
        .bind(&item.link)
        .bind(&item.source_name)
        .bind(fmt_ts(&published_at))
        .bind(fmt_ts(&collected_at))
        .bind(&item.description)
        .bind(&item.description_translated)
        .execute(&self.pool)
        .await?;

        if res.rows_affected() == 0 {
            debug!(link = %item.link, "duplicate link");
            return Ok(InsertOutcome::Duplicate);
        }
        *clock = Some(collected_at);
        Ok(InsertOutcome::Inserted(res.last_insert_rowid()))
    }

    pub async fn contains_link(&self, link: &str) -> Result<bool, StoreError> {
        let hit: i64 = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM news_items WHERE link = ?)")
            .bind(link)
            .fetch_one(&self.pool)
            .await?;
        Ok(hit != 0)
    }

    /// Newest `collected_at` first; ties by id, newest first.
    pub async fn list(&self, q: &ListQuery) -> Result<Vec<NewsItem>, StoreError> {
        // SQLite treats a negative LIMIT as "no limit".
        let limit = q.limit.map(i64::from).unwrap_or(-1);
        let rows: Vec<NewsRow> = match q.source.as_deref() {
            Some(source) => {
                let sql = format!(
                    "{SELECT_ITEMS} WHERE source_name = ? ORDER BY collected_at DESC, id DESC LIMIT ?"
                );
                sqlx::query_as(&sql)
                    .bind(source)
                    .bind(limit)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let sql = format!("{SELECT_ITEMS} ORDER BY collected_at DESC, id DESC LIMIT ?");
                sqlx::query_as(&sql)
                    .bind(limit)
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        Ok(rows.into_iter().map(NewsItem::from).collect())
    }

    pub async fn count_by_source(&self) -> Result<Vec<SourceCount>, StoreError> {
        let rows = sqlx::query_as::<_, SourceCount>(
            "SELECT source_name, COUNT(*) AS count FROM news_items \
             GROUP BY source_name ORDER BY count DESC, source_name ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn aggregate_stats(&self) -> Result<Stats, StoreError> {
        let (total_items, total_sources, last): (i64, i64, Option<String>) = sqlx::query_as(
            "SELECT COUNT(*), COUNT(DISTINCT source_name), MAX(collected_at) FROM news_items",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(Stats {
            total_items,
            total_sources,
            last_collected_at: last.as_deref().and_then(parse_ts),
        })
    }

    pub async fn evict_older_than(&self, max_age: Duration) -> Result<u64, StoreError> {
        self.evict_older_than_at(Utc::now(), max_age).await
    }

    /// Delete items whose `collected_at` is strictly before `now - max_age`.
    pub async fn evict_older_than_at(
        &self,
        now: DateTime<Utc>,
        max_age: Duration,
    ) -> Result<u64, StoreError> {
        let Some(cutoff) = chrono::Duration::from_std(max_age)
            .ok()
            .and_then(|age| now.checked_sub_signed(age))
        else {
            return Ok(0);
        };

        let _writer = self.clock.lock().await;
        let res = sqlx::query("DELETE FROM news_items WHERE collected_at < ?")
            .bind(fmt_ts(&cutoff))
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected())
    }

    pub async fn status(&self) -> Result<StoreStatus, StoreError> {
        let stats = self.aggregate_stats().await?;
        let last_pub: Option<String> =
            sqlx::query_scalar("SELECT MAX(published_at) FROM news_items")
                .fetch_one(&self.pool)
                .await?;
        let size_bytes = match &self.location.path {
            Some(p) => tokio::fs::metadata(p).await.ok().map(|m| m.len()),
            None => None,
        };
        Ok(StoreStatus {
            path: self.location.path.clone(),
            location: self.location.kind,
            degraded: self.location.is_degraded(),
            size_bytes,
            total_items: stats.total_items,
            total_sources: stats.total_sources,
            last_collected_at: stats.last_collected_at,
            last_published_at: last_pub.as_deref().and_then(parse_ts),
        })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
