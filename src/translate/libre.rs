//! LibreTranslate-compatible provider (`POST /translate`), optional API key.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{Provider, TranslateError};

pub const DEFAULT_ENDPOINT: &str = "https://libretranslate.com";

pub struct LibreTranslateProvider {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    target: String,
}

impl LibreTranslateProvider {
    pub fn new(
        endpoint: &str,
        api_key: Option<String>,
        target: &str,
        timeout: Duration,
    ) -> Result<Self, TranslateError> {
        let http = reqwest::Client::builder()
            .user_agent("news-collector/0.1")
            .connect_timeout(Duration::from_secs(4).min(timeout))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            target: target.to_string(),
        })
    }
}

#[derive(Serialize)]
struct Req<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

#[derive(Deserialize)]
struct Resp {
    #[serde(rename = "translatedText")]
    translated_text: Option<String>,
    error: Option<String>,
}

#[async_trait]
impl Provider for LibreTranslateProvider {
    async fn fetch(&self, text: &str, source_lang: &str) -> Result<String, TranslateError> {
        let req = Req {
            q: text,
            source: source_lang,
            target: &self.target,
            format: "text",
            api_key: self.api_key.as_deref(),
        };
        let resp = self
            .http
            .post(format!("{}/translate", self.endpoint))
            .json(&req)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(TranslateError::Status(status.as_u16()));
        }
        let body: Resp = resp
            .json()
            .await
            .map_err(|e| TranslateError::Malformed(e.to_string()))?;
        match (body.translated_text, body.error) {
            (Some(t), _) if !t.trim().is_empty() => Ok(t),
            (_, Some(err)) => Err(TranslateError::Malformed(err)),
            _ => Err(TranslateError::Empty),
        }
    }

    fn name(&self) -> &'static str {
        "libre"
    }
}
