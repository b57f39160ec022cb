use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::path::PathBuf;

/// Item ready to be persisted. `collected_at` is assigned by the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewItem {
    pub title: String,
    pub title_translated: Option<String>,
    pub link: String,
    pub source_name: String,
    /// `None` falls back to the assigned `collected_at`.
    pub published_at: Option<DateTime<Utc>>,
    pub description: String,
    pub description_translated: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewsItem {
    pub id: i64,
    pub title: String,
    pub title_translated: Option<String>,
    pub link: String,
    pub source_name: String,
    pub published_at: DateTime<Utc>,
    pub collected_at: DateTime<Utc>,
    pub description: String,
    pub description_translated: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct NewsRow {
    id: i64,
    title: String,
    title_translated: Option<String>,
    link: String,
    source_name: String,
    published_at: String,
    collected_at: String,
    description: String,
    description_translated: Option<String>,
}

impl From<NewsRow> for NewsItem {
    fn from(row: NewsRow) -> Self {
        let collected_at = parse_ts(&row.collected_at).unwrap_or_else(Utc::now);
        NewsItem {
            id: row.id,
            title: row.title,
            title_translated: row.title_translated,
            link: row.link,
            source_name: row.source_name,
            published_at: parse_ts(&row.published_at).unwrap_or(collected_at),
            collected_at,
            description: row.description,
            description_translated: row.description_translated,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted(i64),
    Duplicate,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub source: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct SourceCount {
    #[serde(rename = "source")]
    pub source_name: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub total_items: i64,
    pub total_sources: i64,
    pub last_collected_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationKind {
    Persistent,
    Fallback,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreLocation {
    pub path: Option<PathBuf>,
    pub kind: LocationKind,
}

impl StoreLocation {
    pub fn is_degraded(&self) -> bool {
        self.kind == LocationKind::Fallback
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreStatus {
    pub path: Option<PathBuf>,
    pub location: LocationKind,
    pub degraded: bool,
    pub size_bytes: Option<u64>,
    pub total_items: i64,
    pub total_sources: i64,
    pub last_collected_at: Option<DateTime<Utc>>,
    pub last_published_at: Option<DateTime<Utc>>,
}

/// Fixed-width UTC text, so lexical order in SQL matches time order.
pub(crate) fn fmt_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_ts(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
