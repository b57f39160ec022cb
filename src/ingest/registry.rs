// src/ingest/registry.rs
//! Feed source registry: built-in list plus optional TOML/JSON override.

use anyhow::{anyhow, Context, Result};
use chrono::{Datelike, Utc};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::ingest::types::FeedSource;

pub const ENV_FEEDS_PATH: &str = "FEEDS_PATH";

/// Built-in financial feeds, in collection order.
/// The Banco Central endpoints are keyed by the current year.
pub fn default_feeds() -> Vec<FeedSource> {
    let year = Utc::now().year();
    vec![
        FeedSource::new("Bloomberg", "https://feeds.bloomberg.com/markets/news.rss"),
        FeedSource::new(
            "The Wall Street Journal",
            "https://feeds.content.dowjones.io/public/rss/RSSMarketsMain",
        ),
        FeedSource::new("Yahoo Finance", "https://finance.yahoo.com/news/rssindex"),
        FeedSource::new("Investing.com BR", "https://br.investing.com/rss/news.rss"),
        FeedSource::new("OilPrice", "https://oilprice.com/rss/main"),
        FeedSource::new("Financial Times", "https://www.ft.com/rss/home/uk"),
        FeedSource::new(
            "CNBC",
            "https://www.cnbc.com/id/100003114/device/rss/rss.html",
        ),
        FeedSource::new("InfoMoney", "https://www.infomoney.com.br/feed/"),
        FeedSource::new("Money Times", "https://www.moneytimes.com.br/feed/"),
        FeedSource::new(
            "Banco Central - Notícias",
            format!("https://www.bcb.gov.br/api/feed/sitebcb/sitefeeds/noticias?ano={year}"),
        ),
        FeedSource::new(
            "Banco Central - Comunicados",
            format!(
                "https://www.bcb.gov.br/api/feed/app/demaisnormativos/atosecomunicados?ano={year}"
            ),
        ),
        FeedSource::new(
            "Banco Central - Notas à Imprensa",
            format!("https://www.bcb.gov.br/api/feed/sitebcb/sitefeeds/notasImprensa?ano={year}"),
        ),
        FeedSource::new("CoinDesk", "https://www.coindesk.com/arc/outboundfeeds/rss/"),
    ]
}

/// Load feeds from an explicit path. Supports TOML (`[[feeds]]`) or JSON (array).
pub fn load_feeds_from(path: &Path) -> Result<Vec<FeedSource>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading feed registry from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_feeds(&content, ext.as_str())
}

/// Resolve the registry:
/// 1) explicit path (config `feeds_path` or $FEEDS_PATH)
/// 2) config/feeds.toml
/// 3) config/feeds.json
/// 4) built-in defaults
pub fn load_feeds_default(explicit: Option<&Path>) -> Result<Vec<FeedSource>> {
    let from_env = std::env::var(ENV_FEEDS_PATH).ok().map(PathBuf::from);
    if let Some(p) = explicit.map(Path::to_path_buf).or(from_env) {
        if p.exists() {
            return load_feeds_from(&p);
        }
        return Err(anyhow!("feed registry path {} does not exist", p.display()));
    }
    let toml_p = PathBuf::from("config/feeds.toml");
    if toml_p.exists() {
        return load_feeds_from(&toml_p);
    }
    let json_p = PathBuf::from("config/feeds.json");
    if json_p.exists() {
        return load_feeds_from(&json_p);
    }
    Ok(default_feeds())
}

fn parse_feeds(s: &str, hint_ext: &str) -> Result<Vec<FeedSource>> {
    let try_toml = hint_ext == "toml" || s.contains("[[feeds]]");
    if try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    if let Ok(v) = parse_json(s) {
        return Ok(v);
    }
    if !try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    Err(anyhow!("unsupported feed registry format"))
}

fn parse_toml(s: &str) -> Result<Vec<FeedSource>> {
    #[derive(serde::Deserialize)]
    struct TomlFeeds {
        feeds: Vec<FeedSource>,
    }
    let v: TomlFeeds = toml::from_str(s)?;
    Ok(clean_list(v.feeds))
}

fn parse_json(s: &str) -> Result<Vec<FeedSource>> {
    let v: Vec<FeedSource> = serde_json::from_str(s)?;
    Ok(clean_list(v))
}

/// Trim, drop blanks and keep the first occurrence of each name (order preserved).
fn clean_list(items: Vec<FeedSource>) -> Vec<FeedSource> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(items.len());
    for it in items {
        let name = it.name.trim();
        let url = it.url.trim();
        if name.is_empty() || url.is_empty() {
            continue;
        }
        if seen.insert(name.to_string()) {
            out.push(FeedSource::new(name, url));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_list_trims_and_keeps_first_name() {
        let toml = r#"
[[feeds]]
name = " A "
url = "https://a.test/rss"

[[feeds]]
name = ""
url = "https://blank.test/rss"

[[feeds]]
name = "A"
url = "https://other.test/rss"
"#;
        let out = parse_toml(toml).unwrap();
        assert_eq!(out, vec![FeedSource::new("A", "https://a.test/rss")]);
    }
}
