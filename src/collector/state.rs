use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;

/// Where the worker is right now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CollectorState {
    Idle,
    Fetching { feed: String },
    Processing { feed: String, item: usize },
    Evicting,
    Sleeping { next_cycle_at: DateTime<Utc> },
    Stopped,
}

/// Totals for one pass over the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub feeds_ok: usize,
    pub feeds_failed: usize,
    pub inserted: usize,
    pub duplicates: usize,
    pub skipped: usize,
    pub translated: usize,
    pub translation_failures: usize,
    pub evicted: u64,
    /// Shutdown arrived mid-cycle; remaining feeds and eviction were skipped.
    pub interrupted: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl CycleReport {
    pub(crate) fn begin(started_at: DateTime<Utc>) -> Self {
        Self {
            feeds_ok: 0,
            feeds_failed: 0,
            inserted: 0,
            duplicates: 0,
            skipped: 0,
            translated: 0,
            translation_failures: 0,
            evicted: 0,
            interrupted: false,
            started_at,
            finished_at: started_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    #[serde(flatten)]
    pub state: CollectorState,
    pub cycles_completed: u64,
    pub last_report: Option<CycleReport>,
}

#[derive(Debug)]
struct Inner {
    state: CollectorState,
    cycles_completed: u64,
    last_report: Option<CycleReport>,
}

/// Shared, read-mostly view of the worker for the API and the digest printer.
#[derive(Debug, Clone)]
pub struct StatusBoard {
    inner: Arc<RwLock<Inner>>,
    reports: Arc<watch::Sender<Option<CycleReport>>>,
}

impl Default for StatusBoard {
    fn default() -> Self {
        let (reports, _) = watch::channel(None);
        Self {
            inner: Arc::new(RwLock::new(Inner {
                state: CollectorState::Idle,
                cycles_completed: 0,
                last_report: None,
            })),
            reports: Arc::new(reports),
        }
    }
}

impl StatusBoard {
    pub fn set_state(&self, state: CollectorState) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .state = state;
    }

    pub fn state(&self) -> CollectorState {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .state
            .clone()
    }

    pub(crate) fn record(&self, report: CycleReport) {
        {
            let mut g = self.inner.write().unwrap_or_else(PoisonError::into_inner);
            g.cycles_completed += 1;
            g.last_report = Some(report.clone());
        }
        self.reports.send_replace(Some(report));
    }

    /// Notified after every finished cycle.
    pub fn subscribe(&self) -> watch::Receiver<Option<CycleReport>> {
        self.reports.subscribe()
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        let g = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        StatusSnapshot {
            state: g.state.clone(),
            cycles_completed: g.cycles_completed,
            last_report: g.last_report.clone(),
        }
    }
}
