//! Google Translate public web endpoint (`client=gtx`). No credentials.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::{Provider, TranslateError};

const ENDPOINT: &str = "https://translate.googleapis.com/translate_a/single";

pub struct GoogleProvider {
    http: reqwest::Client,
    target: String,
    endpoint: String,
}

impl GoogleProvider {
    pub fn new(target: &str, timeout: Duration) -> Result<Self, TranslateError> {
        Self::with_endpoint(ENDPOINT, target, timeout)
    }

    pub fn with_endpoint(
        endpoint: &str,
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
            target: target.to_string(),
            endpoint: endpoint.to_string(),
        })
    }
}

/// The body is `[[["translated","original",...], ...], null, "en", ...]`.
pub(crate) fn parse_gtx_body(body: &Value) -> Result<String, TranslateError> {
    let segments = body
        .get(0)
        .and_then(Value::as_array)
        .ok_or_else(|| TranslateError::Malformed("missing segment list".to_string()))?;
    let out: String = segments
        .iter()
        .filter_map(|seg| seg.get(0).and_then(Value::as_str))
        .collect();
    if out.trim().is_empty() {
        return Err(TranslateError::Empty);
    }
    Ok(out)
}

#[async_trait]
impl Provider for GoogleProvider {
    async fn fetch(&self, text: &str, source_lang: &str) -> Result<String, TranslateError> {
        let resp = self
            .http
            .get(&self.endpoint)
            .query(&[
                ("client", "gtx"),
                ("sl", source_lang),
                ("tl", self.target.as_str()),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(TranslateError::Status(resp.status().as_u16()));
        }
        let body: Value = resp
            .json()
            .await
            .map_err(|e| TranslateError::Malformed(e.to_string()))?;
        parse_gtx_body(&body)
    }

    fn name(&self) -> &'static str {
        "google"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn segments_are_concatenated() {
        let body = json!([
            [["Ações sobem. ", "Stocks rise. ", null, null, 10], ["Petróleo cai.", "Oil falls.", null, null, 10]],
            null,
            "en"
        ]);
        assert_eq!(parse_gtx_body(&body).unwrap(), "Ações sobem. Petróleo cai.");
    }

    #[test]
    fn unexpected_shape_is_malformed() {
        assert!(matches!(
            parse_gtx_body(&json!({"error": "quota"})),
            Err(TranslateError::Malformed(_))
        ));
        assert!(matches!(
            parse_gtx_body(&json!([[]])),
            Err(TranslateError::Empty)
        ));
    }
}
