//! Runtime configuration.
//!
//! Layering, lowest to highest precedence: built-in defaults (per environment),
//! optional TOML file, process env (`.env` is loaded into it by the binary).

pub mod translator;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};
use tracing::warn;

pub use translator::TranslatorConfig;

pub const ENV_CONFIG_PATH: &str = "COLLECTOR_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/collector.toml";
pub const ENV_PRODUCTION_MARKER: &str = "RAILWAY_ENVIRONMENT";
pub const DEV_API_KEY: &str = "dev-key-12345";

const MIN_INTERVAL_SECS: u64 = 1;
const MIN_MAX_AGE_HOURS: u64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn detect() -> Self {
        match env::var(ENV_PRODUCTION_MARKER) {
            Ok(v) if !v.trim().is_empty() => Environment::Production,
            _ => Environment::Development,
        }
    }

    pub fn default_db_path(self) -> PathBuf {
        match self {
            Environment::Production => PathBuf::from("/app/news.db"),
            Environment::Development => PathBuf::from("news.db"),
        }
    }

    /// Well-known key for local use only. Production has none until `API_KEY` is set.
    pub fn default_api_key(self) -> Option<&'static str> {
        match self {
            Environment::Production => None,
            Environment::Development => Some(DEV_API_KEY),
        }
    }

    /// Default `EnvFilter` directive when `RUST_LOG` is unset.
    pub fn default_log_filter(self) -> &'static str {
        match self {
            Environment::Production => "info",
            Environment::Development => "debug,hyper=info,reqwest=info,sqlx=warn",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiConfig {
    /// Required on every non-public route; unset means those routes answer 503.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub port: u16,
    /// Exact origins, `*.example.com` wildcards, or `*` for any.
    pub allowed_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            port: 5000,
            allowed_origins: vec!["*".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub refresh_interval_secs: u64,
    pub max_age_hours: u64,
    pub target_language: String,
    pub db_path: PathBuf,
    pub db_fallback_path: PathBuf,
    pub fetch_timeout_secs: u64,
    pub feeds_path: Option<PathBuf>,
    pub translator: TranslatorConfig,
    pub api: ApiConfig,
}

/// Shape of `config/collector.toml`. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    refresh_interval_secs: Option<u64>,
    max_age_hours: Option<u64>,
    target_language: Option<String>,
    db_path: Option<PathBuf>,
    db_fallback_path: Option<PathBuf>,
    fetch_timeout_secs: Option<u64>,
    feeds_path: Option<PathBuf>,
    translator: Option<TranslatorConfig>,
    api: Option<FileApi>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileApi {
    api_key: Option<String>,
    port: Option<u16>,
    allowed_origins: Option<Vec<String>>,
}

pub fn default_fallback_path() -> PathBuf {
    env::temp_dir().join("news-collector").join("news.db")
}

impl AppConfig {
    pub fn defaults(environment: Environment) -> Self {
        Self {
            environment,
            refresh_interval_secs: 30,
            max_age_hours: 24,
            target_language: "pt".to_string(),
            db_path: environment.default_db_path(),
            db_fallback_path: default_fallback_path(),
            fetch_timeout_secs: 20,
            feeds_path: None,
            translator: TranslatorConfig::default(),
            api: ApiConfig {
                api_key: environment.default_api_key().map(str::to_string),
                ..ApiConfig::default()
            },
        }
    }

    /// TOML file (`$COLLECTOR_CONFIG_PATH` or `config/collector.toml`) → env.
    ///
    /// `.env` is not read here; the binary loads it before tracing starts.
    pub fn load() -> anyhow::Result<Self> {
        let explicit = env::var(ENV_CONFIG_PATH).ok().map(PathBuf::from);
        let file = match explicit {
            Some(p) => Some(p),
            None => {
                let p = PathBuf::from(DEFAULT_CONFIG_PATH);
                p.exists().then_some(p)
            }
        };
        Self::load_from(file.as_deref())
    }

    /// Same as [`AppConfig::load`] without `.env`, reading `file` if given.
    pub fn load_from(file: Option<&Path>) -> anyhow::Result<Self> {
        let mut cfg = Self::defaults(Environment::detect());
        if let Some(path) = file {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            cfg.apply_toml(&raw)
                .with_context(|| format!("parsing config {}", path.display()))?;
        }
        cfg.apply_env();
        cfg.sanitize()?;
        Ok(cfg)
    }

    pub fn apply_toml(&mut self, raw: &str) -> anyhow::Result<()> {
        let f: FileConfig = toml::from_str(raw)?;
        if let Some(v) = f.refresh_interval_secs {
            self.refresh_interval_secs = v;
        }
        if let Some(v) = f.max_age_hours {
            self.max_age_hours = v;
        }
        if let Some(v) = f.target_language {
            self.target_language = v;
        }
        if let Some(v) = f.db_path {
            self.db_path = v;
        }
        if let Some(v) = f.db_fallback_path {
            self.db_fallback_path = v;
        }
        if let Some(v) = f.fetch_timeout_secs {
            self.fetch_timeout_secs = v;
        }
        if f.feeds_path.is_some() {
            self.feeds_path = f.feeds_path;
        }
        if let Some(t) = f.translator {
            self.translator = t;
        }
        if let Some(api) = f.api {
            if api.api_key.is_some() {
                self.api.api_key = api.api_key;
            }
            if let Some(p) = api.port {
                self.api.port = p;
            }
            if let Some(o) = api.allowed_origins {
                self.api.allowed_origins = o;
            }
        }
        Ok(())
    }

    /// Env overrides. Unparseable numbers are logged and ignored.
    pub fn apply_env(&mut self) {
        if let Some(v) = env_parse("REFRESH_INTERVAL") {
            self.refresh_interval_secs = v;
        }
        if let Some(v) = env_parse("MAX_AGE_HOURS") {
            self.max_age_hours = v;
        }
        if let Some(v) = env_string("TARGET_LANGUAGE") {
            self.target_language = v;
        }
        if let Some(v) = env_string("DB_PATH") {
            self.db_path = PathBuf::from(v);
        }
        if let Some(v) = env_string("DB_FALLBACK_PATH") {
            self.db_fallback_path = PathBuf::from(v);
        }
        if let Some(v) = env_parse("FETCH_TIMEOUT_SECS") {
            self.fetch_timeout_secs = v;
        }
        if let Some(v) = env_string(crate::ingest::registry::ENV_FEEDS_PATH) {
            self.feeds_path = Some(PathBuf::from(v));
        }
        if let Some(v) = env_string("TRANSLATOR_PROVIDER") {
            self.translator.provider = v;
        }
        if let Some(v) = env_string(translator::ENV_TRANSLATOR_API_KEY) {
            self.translator.api_key = Some(v);
        }
        if let Some(v) = env_string("TRANSLATOR_ENDPOINT") {
            self.translator.endpoint = Some(v);
        }
        if let Some(v) = env_parse("TRANSLATOR_DAILY_LIMIT") {
            self.translator.daily_limit = v;
        }
        if let Some(v) = env_string("API_KEY") {
            self.api.api_key = Some(v);
        }
        if let Some(v) = env_parse("PORT") {
            self.api.port = v;
        }
        if let Some(v) = env_string("ALLOWED_ORIGINS") {
            self.api.allowed_origins = split_origins(&v);
        }
    }

    pub fn sanitize(&mut self) -> anyhow::Result<()> {
        if self.refresh_interval_secs < MIN_INTERVAL_SECS {
            warn!(value = self.refresh_interval_secs, "refresh interval too small, clamping");
            self.refresh_interval_secs = MIN_INTERVAL_SECS;
        }
        if self.max_age_hours < MIN_MAX_AGE_HOURS {
            warn!(value = self.max_age_hours, "max age too small, clamping");
            self.max_age_hours = MIN_MAX_AGE_HOURS;
        }
        if self.fetch_timeout_secs == 0 {
            self.fetch_timeout_secs = 20;
        }
        self.target_language = self.target_language.trim().to_lowercase();
        if self.target_language.is_empty() {
            self.target_language = "pt".to_string();
        }
        self.api.api_key = self.api.api_key.take().filter(|k| !k.trim().is_empty());
        self.api.allowed_origins.retain(|o| !o.trim().is_empty());
        self.translator.sanitize()
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_hours.saturating_mul(3600))
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

fn env_string(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    let raw = env_string(key)?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(key, value = %raw, "ignoring unparseable env value");
            None
        }
    }
}

pub fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
