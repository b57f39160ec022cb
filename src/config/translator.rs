use serde::{Deserialize, Serialize};
use std::{env, time::Duration};

pub const ENV_TRANSLATOR_API_KEY: &str = "TRANSLATOR_API_KEY";

fn default_provider() -> String {
    "google".to_string()
}
fn default_daily_limit() -> u32 {
    5000
}
fn default_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslatorConfig {
    /// "google" | "libre" | "disabled" (case-insensitive)
    #[serde(default = "default_provider")]
    pub provider: String,
    /// "ENV" means: read from TRANSLATOR_API_KEY
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// Base URL for self-hosted LibreTranslate.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_daily_limit")]
    pub daily_limit: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            api_key: None,
            endpoint: None,
            daily_limit: default_daily_limit(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl TranslatorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Lowercase the provider, resolve an "ENV" key, clamp limits.
    pub fn sanitize(&mut self) -> anyhow::Result<()> {
        self.provider = self.provider.trim().to_lowercase();
        match self.provider.as_str() {
            "google" | "libre" | "disabled" => {}
            "" | "none" | "off" => self.provider = "disabled".to_string(),
            other => anyhow::bail!("Unsupported translator provider: {other}"),
        }

        if let Some(key) = &self.api_key {
            if key.trim().eq_ignore_ascii_case("env") {
                self.api_key = Some(env::var(ENV_TRANSLATOR_API_KEY).map_err(|_| {
                    anyhow::anyhow!("Missing {ENV_TRANSLATOR_API_KEY} env var")
                })?);
            }
        }

        if self.timeout_secs == 0 {
            self.timeout_secs = default_timeout_secs();
        }
        Ok(())
    }
}
