// tests/common/mod.rs
// Shared fakes for integration tests. Not every test binary uses every helper.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use news_collector::collector::{Collector, CollectorSettings};
use news_collector::ingest::{FeedFetcher, FeedSource, FetchError, RawItem};
use news_collector::lang::{Language, LanguageDetector};
use news_collector::store::NewsStore;
use news_collector::translate::{TranslateError, Translator};

pub fn raw(title: &str, link: &str) -> RawItem {
    RawItem {
        title: Some(title.to_string()),
        link: Some(link.to_string()),
        description: None,
        published_at: None,
    }
}

pub fn raw_with(title: &str, link: &str, description: &str, published: Option<DateTime<Utc>>) -> RawItem {
    RawItem {
        title: Some(title.to_string()),
        link: Some(link.to_string()),
        description: Some(description.to_string()),
        published_at: published,
    }
}

enum Scripted {
    Items(Vec<RawItem>),
    Fail(u16),
    Hang,
}

/// Fetcher driven by a per-URL script. Unknown URLs fail with 404.
#[derive(Default)]
pub struct ScriptedFetcher {
    script: Mutex<HashMap<String, Scripted>>,
    calls: AtomicUsize,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(self, url: &str, items: Vec<RawItem>) -> Self {
        self.script
            .lock()
            .unwrap()
            .insert(url.to_string(), Scripted::Items(items));
        self
    }

    pub fn failing(self, url: &str, status: u16) -> Self {
        self.script
            .lock()
            .unwrap()
            .insert(url.to_string(), Scripted::Fail(status));
        self
    }

    pub fn hanging(self, url: &str) -> Self {
        self.script
            .lock()
            .unwrap()
            .insert(url.to_string(), Scripted::Hang);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedFetcher for ScriptedFetcher {
    async fn fetch(&self, source: &FeedSource) -> Result<Vec<RawItem>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let outcome = {
            let script = self.script.lock().unwrap();
            match script.get(&source.url) {
                Some(Scripted::Items(v)) => Ok(v.clone()),
                Some(Scripted::Fail(code)) => Err(FetchError::Status(*code)),
                Some(Scripted::Hang) => Err(FetchError::Timeout(0)),
                None => Err(FetchError::Status(404)),
            }
        };
        if let Err(FetchError::Timeout(_)) = outcome {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        outcome
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Classifies by prefix: `EN ` → en, `PT ` → pt, anything else → unknown.
pub struct PrefixDetector;

impl LanguageDetector for PrefixDetector {
    fn detect(&self, text: &str) -> Language {
        if text.starts_with("EN ") {
            Language::Code("en".into())
        } else if text.starts_with("PT ") {
            Language::Code("pt".into())
        } else {
            Language::Unknown
        }
    }
}

/// Rewrites `EN ` to `PT `. Fails on texts containing `FAIL`, echoes texts containing `SAME`.
#[derive(Default)]
pub struct PrefixTranslator {
    calls: AtomicUsize,
}

impl PrefixTranslator {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Translator for PrefixTranslator {
    async fn translate(&self, text: &str, _source_lang: &str) -> Result<String, TranslateError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if text.contains("FAIL") {
            return Err(TranslateError::Status(503));
        }
        if text.contains("SAME") {
            return Ok(text.to_string());
        }
        Ok(text.replacen("EN ", "PT ", 1))
    }

    fn provider_name(&self) -> &'static str {
        "prefix"
    }
}

pub fn settings(interval: Duration) -> CollectorSettings {
    CollectorSettings {
        target_language: "pt".to_string(),
        max_age: Duration::from_secs(24 * 3600),
        refresh_interval: interval,
        fetch_timeout: Duration::from_millis(300),
    }
}

pub fn feeds(names: &[&str]) -> Vec<FeedSource> {
    names
        .iter()
        .map(|n| FeedSource::new(*n, format!("https://{}.example.test/rss", n.to_lowercase())))
        .collect()
}

pub fn url_of(name: &str) -> String {
    format!("https://{}.example.test/rss", name.to_lowercase())
}

pub fn collector(
    feeds: Vec<FeedSource>,
    fetcher: Arc<ScriptedFetcher>,
    translator: Arc<PrefixTranslator>,
    store: NewsStore,
    interval: Duration,
) -> Collector {
    Collector::new(
        feeds,
        fetcher,
        Arc::new(PrefixDetector),
        translator,
        store,
        settings(interval),
    )
}
