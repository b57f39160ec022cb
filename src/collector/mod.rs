// src/collector/mod.rs
//! Ingestion cycle: fetch → normalize → detect → translate → insert, then evict.
//!
//! One sequential worker. Feeds run in registry order, items in feed order.
//! A failing feed or item never aborts its siblings.

pub mod state;

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use metrics::{counter, gauge, histogram};
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::ingest::{normalize_text, FeedFetcher, FeedSource, FetchError, RawItem};
use crate::lang::{needs_translation, LanguageDetector};
use crate::store::{InsertOutcome, NewItem, NewsStore};
use crate::translate::{TranslateError, Translator};

pub use state::{CollectorState, CycleReport, StatusBoard, StatusSnapshot};

#[derive(Debug, Clone)]
pub struct CollectorSettings {
    pub target_language: String,
    pub max_age: Duration,
    pub refresh_interval: Duration,
    pub fetch_timeout: Duration,
}

impl CollectorSettings {
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            target_language: cfg.target_language.clone(),
            max_age: cfg.max_age(),
            refresh_interval: cfg.refresh_interval(),
            fetch_timeout: cfg.fetch_timeout(),
        }
    }
}

/// Why an item was not stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    MissingLink,
    MissingTitle,
    Store(String),
}

/// Result of handling one feed entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Inserted {
        id: i64,
        translated: usize,
        translation_failures: usize,
    },
    Duplicate,
    Rejected(RejectReason),
}

#[derive(Debug, Default, Clone, Copy)]
struct TranslationTally {
    ok: usize,
    failed: usize,
}

pub struct Collector {
    feeds: Vec<FeedSource>,
    fetcher: Arc<dyn FeedFetcher>,
    detector: Arc<dyn LanguageDetector>,
    translator: Arc<dyn Translator>,
    store: NewsStore,
    settings: CollectorSettings,
    status: StatusBoard,
}

impl Collector {
    pub fn new(
        feeds: Vec<FeedSource>,
        fetcher: Arc<dyn FeedFetcher>,
        detector: Arc<dyn LanguageDetector>,
        translator: Arc<dyn Translator>,
        store: NewsStore,
        settings: CollectorSettings,
    ) -> Self {
        crate::metrics::ensure_described();
        Self {
            feeds,
            fetcher,
            detector,
            translator,
            store,
            settings,
            status: StatusBoard::default(),
        }
    }

    pub fn status(&self) -> StatusBoard {
        self.status.clone()
    }

    pub fn store(&self) -> &NewsStore {
        &self.store
    }

    pub fn feeds(&self) -> &[FeedSource] {
        &self.feeds
    }

    /// One full pass with no sleep afterwards.
    pub async fn run_once(&self) -> CycleReport {
        let (_tx, rx) = watch::channel(false);
        self.run_once_until(rx).await
    }

    /// Like [`Collector::run_once`], cut short when `shutdown` turns true.
    pub async fn run_once_until(&self, shutdown: watch::Receiver<bool>) -> CycleReport {
        let report = self.run_cycle(&shutdown).await;
        self.status.set_state(CollectorState::Stopped);
        report
    }

    /// Cycle, sleep `refresh_interval`, repeat until `shutdown` turns true.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            feeds = self.feeds.len(),
            interval_secs = self.settings.refresh_interval.as_secs(),
            "collector started"
        );
        loop {
            let report = self.run_cycle(&shutdown).await;
            if report.interrupted || *shutdown.borrow() {
                break;
            }

            let next = Utc::now()
                + chrono::Duration::from_std(self.settings.refresh_interval)
                    .unwrap_or_else(|_| chrono::Duration::seconds(30));
            self.status
                .set_state(CollectorState::Sleeping { next_cycle_at: next });
            tokio::select! {
                _ = tokio::time::sleep(self.settings.refresh_interval) => {}
                _ = shutdown_signalled(&mut shutdown) => break,
            }
        }
        self.status.set_state(CollectorState::Stopped);
        info!("collector stopped");
    }

    pub async fn run_cycle(&self, shutdown: &watch::Receiver<bool>) -> CycleReport {
        let started = std::time::Instant::now();
        let mut report = CycleReport::begin(Utc::now());
        let mut stop = shutdown.clone();

        'feeds: for feed in &self.feeds {
            if *stop.borrow() {
                report.interrupted = true;
                break;
            }
            self.status.set_state(CollectorState::Fetching {
                feed: feed.name.clone(),
            });

            let fetched = tokio::select! {
                r = self.fetch_with_timeout(feed) => r,
                _ = shutdown_signalled(&mut stop) => {
                    report.interrupted = true;
                    break 'feeds;
                }
            };
            let items = match fetched {
                Ok(items) => {
                    report.feeds_ok += 1;
                    items
                }
                Err(e) => {
                    warn!(feed = %feed.name, url = %feed.url, error = %e, "feed failed");
                    counter!("collector_feed_errors_total", "feed" => feed.name.clone())
                        .increment(1);
                    report.feeds_failed += 1;
                    continue;
                }
            };

            let mut inserted = 0usize;
            for (idx, raw) in items.into_iter().enumerate() {
                if *stop.borrow() {
                    report.interrupted = true;
                    break 'feeds;
                }
                self.status.set_state(CollectorState::Processing {
                    feed: feed.name.clone(),
                    item: idx,
                });
                match self.process_item(feed, raw).await {
                    ItemOutcome::Inserted {
                        translated,
                        translation_failures,
                        ..
                    } => {
                        inserted += 1;
                        report.inserted += 1;
                        report.translated += translated;
                        report.translation_failures += translation_failures;
                        counter!("collector_items_inserted_total").increment(1);
                    }
                    ItemOutcome::Duplicate => {
                        report.duplicates += 1;
                        counter!("collector_items_duplicate_total").increment(1);
                    }
                    ItemOutcome::Rejected(reason) => {
                        debug!(feed = %feed.name, ?reason, "item rejected");
                        report.skipped += 1;
                        counter!("collector_items_skipped_total").increment(1);
                    }
                }
            }
            info!(feed = %feed.name, inserted, "feed collected");
        }

        // An interrupted cycle leaves eviction to the next run.
        if !report.interrupted {
            self.status.set_state(CollectorState::Evicting);
            match self.store.evict_older_than(self.settings.max_age).await {
                Ok(n) => {
                    report.evicted = n;
                    counter!("collector_evicted_total").increment(n);
                }
                Err(e) => warn!(error = %e, "eviction failed"),
            }
        }

        report.finished_at = Utc::now();
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        histogram!("collector_cycle_ms").record(elapsed_ms);
        gauge!("collector_last_cycle_ts").set(report.finished_at.timestamp() as f64);
        info!(
            feeds_ok = report.feeds_ok,
            feeds_failed = report.feeds_failed,
            inserted = report.inserted,
            duplicates = report.duplicates,
            skipped = report.skipped,
            translated = report.translated,
            evicted = report.evicted,
            interrupted = report.interrupted,
            elapsed_ms = elapsed_ms as u64,
            "cycle finished"
        );
        self.status.record(report.clone());
        self.status.set_state(CollectorState::Idle);
        report
    }

    async fn fetch_with_timeout(&self, feed: &FeedSource) -> Result<Vec<RawItem>, FetchError> {
        let limit = self.settings.fetch_timeout;
        match tokio::time::timeout(limit, self.fetcher.fetch(feed)).await {
            Ok(r) => r,
            Err(_) => Err(FetchError::Timeout(limit.as_secs())),
        }
    }

    /// Normalize, translate when needed, insert. Never panics, never aborts the feed.
    pub async fn process_item(&self, feed: &FeedSource, raw: RawItem) -> ItemOutcome {
        let Some(link) = raw
            .link
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
        else {
            return ItemOutcome::Rejected(RejectReason::MissingLink);
        };
        let title = normalize_text(raw.title.as_deref().unwrap_or_default());
        if title.is_empty() {
            return ItemOutcome::Rejected(RejectReason::MissingTitle);
        }
        let description = normalize_text(raw.description.as_deref().unwrap_or_default());

        // Known links are not translated again.
        match self.store.contains_link(link).await {
            Ok(true) => return ItemOutcome::Duplicate,
            Ok(false) => {}
            Err(e) => {
                warn!(feed = %feed.name, link, error = %e, "store lookup failed");
                return ItemOutcome::Rejected(RejectReason::Store(e.to_string()));
            }
        }

        let mut tally = TranslationTally::default();
        let title_translated = self.translate_field(&title, link, &mut tally).await;
        let description_translated = if description.is_empty() {
            None
        } else {
            self.translate_field(&description, link, &mut tally).await
        };

        let item = NewItem {
            title,
            title_translated,
            link: link.to_string(),
            source_name: feed.name.clone(),
            published_at: raw.published_at,
            description,
            description_translated,
        };
        match self.store.insert_if_absent(item).await {
            Ok(InsertOutcome::Inserted(id)) => ItemOutcome::Inserted {
                id,
                translated: tally.ok,
                translation_failures: tally.failed,
            },
            Ok(InsertOutcome::Duplicate) => ItemOutcome::Duplicate,
            Err(e) => {
                warn!(feed = %feed.name, link, error = %e, "insert failed");
                ItemOutcome::Rejected(RejectReason::Store(e.to_string()))
            }
        }
    }

    async fn translate_field(
        &self,
        text: &str,
        link: &str,
        tally: &mut TranslationTally,
    ) -> Option<String> {
        let lang = self.detector.detect(text);
        if !needs_translation(&lang, &self.settings.target_language) {
            return None;
        }
        let source = lang.code()?;

        match self.translator.translate(text, source).await {
            Ok(out) => {
                let out = normalize_text(&out);
                if out.is_empty() || out == text {
                    return None;
                }
                tally.ok += 1;
                counter!("collector_translations_total").increment(1);
                Some(out)
            }
            Err(TranslateError::Disabled) => None,
            Err(e) => {
                tally.failed += 1;
                counter!("collector_translation_failures_total").increment(1);
                warn!(link, source_lang = source, error = %e, "translation failed");
                None
            }
        }
    }
}

/// Resolves once the flag is true. A dropped sender means no shutdown will come.
async fn shutdown_signalled(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Owns the background worker and its shutdown channel.
pub struct CollectorHandle {
    collector: Arc<Collector>,
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl CollectorHandle {
    pub fn new(collector: Arc<Collector>) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            collector,
            shutdown,
            task: None,
        }
    }

    /// Spawn the continuous loop. No-op if already running.
    pub fn start(&mut self) {
        if self.task.is_some() {
            return;
        }
        self.shutdown.send_replace(false);
        let collector = self.collector.clone();
        let rx = self.shutdown.subscribe();
        self.task = Some(tokio::spawn(async move {
            collector.run(rx).await;
        }));
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Signal shutdown and wait for the worker to finish its current item.
    pub async fn stop(&mut self) {
        self.shutdown.send_replace(true);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "collector task ended abnormally");
            }
        }
    }

    pub fn collector(&self) -> &Arc<Collector> {
        &self.collector
    }
}
