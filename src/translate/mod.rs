//! Translation: provider abstraction + daily quota wrapper.
//!
//! The collector calls a [`Translator`] at most once per text per item. Every
//! failure is returned as a [`TranslateError`]; callers store the item without
//! a translated field instead of retrying.

pub mod google;
pub mod libre;

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tracing::info;

use crate::config::translator::TranslatorConfig;

pub use google::GoogleProvider;
pub use libre::LibreTranslateProvider;

/// Texts shorter than this are never sent to a provider.
pub const MIN_TRANSLATE_CHARS: usize = 3;

#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    #[error("translation disabled")]
    Disabled,

    #[error("text too short to translate")]
    TooShort,

    #[error("daily translation quota of {limit} exhausted")]
    QuotaExhausted { limit: u32 },

    #[error("provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider returned HTTP {0}")]
    Status(u16),

    #[error("malformed provider response: {0}")]
    Malformed(String),

    #[error("provider returned an empty translation")]
    Empty,
}

/// What the collector depends on.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate `text` (detected as `source_lang`) into the configured target language.
    async fn translate(&self, text: &str, source_lang: &str) -> Result<String, TranslateError>;
    /// Provider name for diagnostics.
    fn provider_name(&self) -> &'static str;
}

/// Low-level provider: does the real remote call.
#[async_trait]
pub trait Provider: Send + Sync + 'static {
    async fn fetch(&self, text: &str, source_lang: &str) -> Result<String, TranslateError>;
    fn name(&self) -> &'static str;
}

pub type DynTranslator = Arc<dyn Translator>;

/// Build the translator described by `cfg`, translating into `target_lang`.
pub fn build_translator(
    cfg: &TranslatorConfig,
    target_lang: &str,
) -> Result<DynTranslator, TranslateError> {
    let translator: DynTranslator = match cfg.provider.as_str() {
        "google" => Arc::new(QuotaTranslator::new(
            GoogleProvider::new(target_lang, cfg.timeout())?,
            cfg.daily_limit,
        )),
        "libre" => Arc::new(QuotaTranslator::new(
            LibreTranslateProvider::new(
                cfg.endpoint.as_deref().unwrap_or(libre::DEFAULT_ENDPOINT),
                cfg.api_key.clone(),
                target_lang,
                cfg.timeout(),
            )?,
            cfg.daily_limit,
        )),
        _ => Arc::new(DisabledTranslator),
    };
    info!(
        provider = translator.provider_name(),
        target = target_lang,
        daily_limit = cfg.daily_limit,
        "translator ready"
    );
    Ok(translator)
}

/// Always refuses; used when translation is switched off.
pub struct DisabledTranslator;

#[async_trait]
impl Translator for DisabledTranslator {
    async fn translate(&self, _text: &str, _source_lang: &str) -> Result<String, TranslateError> {
        Err(TranslateError::Disabled)
    }

    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

#[derive(Debug, Clone)]
struct DailyCounter {
    day: NaiveDate,
    used: u32,
}

/// Wraps a provider with a per-UTC-day call budget.
/// Every provider call counts, successful or not; refused calls do not.
pub struct QuotaTranslator<P: Provider> {
    inner: P,
    daily_limit: u32,
    counter: Mutex<DailyCounter>,
}

impl<P: Provider> QuotaTranslator<P> {
    pub fn new(inner: P, daily_limit: u32) -> Self {
        Self {
            inner,
            daily_limit,
            counter: Mutex::new(DailyCounter {
                day: Utc::now().date_naive(),
                used: 0,
            }),
        }
    }

    /// Calls made today.
    pub fn used_today(&self) -> u32 {
        let g = self.counter.lock().unwrap_or_else(PoisonError::into_inner);
        if g.day == Utc::now().date_naive() {
            g.used
        } else {
            0
        }
    }

    fn reserve(&self, today: NaiveDate) -> Result<(), TranslateError> {
        let mut g = self.counter.lock().unwrap_or_else(PoisonError::into_inner);
        if g.day != today {
            g.day = today;
            g.used = 0;
        }
        if g.used >= self.daily_limit {
            return Err(TranslateError::QuotaExhausted {
                limit: self.daily_limit,
            });
        }
        g.used += 1;
        Ok(())
    }
}

#[async_trait]
impl<P: Provider> Translator for QuotaTranslator<P> {
    async fn translate(&self, text: &str, source_lang: &str) -> Result<String, TranslateError> {
        let text = text.trim();
        if text.chars().count() < MIN_TRANSLATE_CHARS {
            return Err(TranslateError::TooShort);
        }
        self.reserve(Utc::now().date_naive())?;

        let out = self.inner.fetch(text, source_lang).await?;
        let out = out.trim();
        if out.is_empty() {
            return Err(TranslateError::Empty);
        }
        Ok(out.to_string())
    }

    fn provider_name(&self) -> &'static str {
        self.inner.name()
    }
}
