// src/ingest/providers/rss.rs
//! RSS 2.0 / RSS 1.0 (RDF) / Atom fetcher.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::collections::HashMap;
use std::time::Duration;

use crate::ingest::types::{FeedFetcher, FeedSource, FetchError, RawItem};

/// Maximum accepted feed body (5 MiB).
pub const MAX_FEED_BYTES: u64 = 5 * 1024 * 1024;
const CONNECT_TIMEOUT_SECS: u64 = 5;
const MAX_REDIRECTS: usize = 5;
const USER_AGENT: &str = "news-collector/0.1 (+rss)";

/// Direct children of `<item>`/`<entry>` that we keep. Matched on the local
/// name, so `dc:date` is `Date` and `atom:link` / `media:title` share the plain fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
    Description,
    Summary,
    Content,
    PubDate,
    Date,
    Published,
    Updated,
}

impl Field {
    fn from_local(name: &[u8]) -> Option<Self> {
        match name {
            b"title" => Some(Field::Title),
            b"link" => Some(Field::Link),
            b"description" => Some(Field::Description),
            b"summary" => Some(Field::Summary),
            b"content" => Some(Field::Content),
            b"pubDate" => Some(Field::PubDate),
            b"date" => Some(Field::Date),
            b"published" => Some(Field::Published),
            b"updated" => Some(Field::Updated),
            _ => None,
        }
    }
}

/// Order in which date fields are tried.
const DATE_FIELDS: [Field; 4] = [Field::PubDate, Field::Date, Field::Published, Field::Updated];

#[derive(Debug, Default)]
struct LinkRef {
    href: Option<String>,
    rel: Option<String>,
    text: String,
}

/// Collects one `<item>`/`<entry>`. Repeated fields are kept; `build` picks.
#[derive(Debug, Default)]
struct ItemBuilder {
    title: Vec<String>,
    links: Vec<LinkRef>,
    description: Vec<String>,
    summary: Vec<String>,
    content: Vec<String>,
    dates: Vec<(Field, String)>,
}

impl ItemBuilder {
    fn push(&mut self, field: Field, text: String) {
        match field {
            Field::Title => self.title.push(text),
            Field::Link => {
                if let Some(link) = self.links.last_mut() {
                    link.text = text;
                }
            }
            Field::Description => self.description.push(text),
            Field::Summary => self.summary.push(text),
            Field::Content => self.content.push(text),
            Field::PubDate | Field::Date | Field::Published | Field::Updated => {
                self.dates.push((field, text))
            }
        }
    }

    /// RSS link text first, then an Atom `rel="alternate"` (or rel-less) href, then any href.
    fn link(&self) -> Option<String> {
        first_non_empty(self.links.iter().map(|l| l.text.as_str()))
            .or_else(|| {
                first_non_empty(
                    self.links
                        .iter()
                        .filter(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
                        .filter_map(|l| l.href.as_deref()),
                )
            })
            .or_else(|| first_non_empty(self.links.iter().filter_map(|l| l.href.as_deref())))
    }

    fn build(self) -> RawItem {
        let published_at = DATE_FIELDS.iter().find_map(|want| {
            self.dates
                .iter()
                .filter(|(field, _)| field == want)
                .find_map(|(_, value)| parse_feed_date(value))
        });
        RawItem {
            title: first_non_empty(&self.title),
            link: self.link(),
            description: first_non_empty(&self.summary)
                .or_else(|| first_non_empty(&self.description))
                .or_else(|| first_non_empty(&self.content)),
            published_at,
        }
    }
}

/// Parse an RFC 2822 (RSS) or RFC 3339 (Atom, dc:date) timestamp into UTC.
pub fn parse_feed_date(ts: &str) -> Option<DateTime<Utc>> {
    let ts = ts.trim();
    if ts.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc2822(ts)
        .or_else(|_| DateTime::parse_from_rfc3339(ts))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn first_non_empty<I, S>(values: I) -> Option<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    values
        .into_iter()
        .map(|v| v.as_ref().trim().to_string())
        .find(|v| !v.is_empty())
}

fn link_ref(e: &BytesStart<'_>) -> LinkRef {
    let mut link = LinkRef::default();
    for attr in e.attributes().flatten() {
        let value = attr
            .unescape_value()
            .map(|v| v.into_owned())
            .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned());
        match attr.key.local_name().as_ref() {
            b"href" => link.href = Some(value),
            b"rel" => link.rel = Some(value),
            _ => {}
        }
    }
    link
}

fn check_root(name: &[u8]) -> Result<(), FetchError> {
    match name {
        b"rss" | b"RDF" | b"feed" => Ok(()),
        other => Err(FetchError::Malformed(format!(
            "<{}> is not an RSS, RDF or Atom root",
            String::from_utf8_lossy(other)
        ))),
    }
}

/// Parse a feed document into raw items, in document order.
///
/// Items are collected one by one from the event stream, so an odd entry
/// (repeated or unparseable fields, xhtml text, stray end tags) only affects
/// itself. Only a document that is not XML, has a foreign root or ends early
/// fails the whole feed.
pub fn parse_feed(xml: &str) -> Result<Vec<RawItem>, FetchError> {
    let cleaned = scrub_html_entities_for_xml(xml.trim_start_matches('\u{feff}'));
    let mut reader = Reader::from_str(&cleaned);
    reader.config_mut().check_end_names = false;

    let mut items = Vec::new();
    // Local names of the open elements.
    let mut open: Vec<Vec<u8>> = Vec::new();
    // Depth of the open item element, and what it has collected so far.
    let mut current: Option<(usize, ItemBuilder)> = None;
    let mut field: Option<(Field, String)> = None;
    let mut seen_root = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.local_name().as_ref().to_vec();
                if !seen_root {
                    check_root(&name)?;
                    seen_root = true;
                }
                let depth = open.len();
                match current.as_ref().map(|(d, _)| *d) {
                    None => {
                        if name == b"item" || name == b"entry" {
                            current = Some((depth, ItemBuilder::default()));
                        }
                    }
                    Some(item_depth) if depth == item_depth + 1 => {
                        if let Some(f) = Field::from_local(&name) {
                            if let (Field::Link, Some((_, builder))) = (f, current.as_mut()) {
                                builder.links.push(link_ref(&e));
                            }
                            field = Some((f, String::new()));
                        }
                    }
                    // Markup nested in a field (Atom xhtml): keep words apart.
                    Some(_) => {
                        if let Some((_, buf)) = field.as_mut() {
                            buf.push(' ');
                        }
                    }
                }
                open.push(name);
            }
            Ok(Event::Empty(e)) => {
                let name = e.local_name().as_ref().to_vec();
                if !seen_root {
                    check_root(&name)?;
                    seen_root = true;
                }
                if let Some((item_depth, builder)) = current.as_mut() {
                    if open.len() == *item_depth + 1 && name == b"link" {
                        builder.links.push(link_ref(&e));
                    } else if let Some((_, buf)) = field.as_mut() {
                        buf.push(' ');
                    }
                }
            }
            Ok(Event::Text(t)) => {
                if let Some((_, buf)) = field.as_mut() {
                    match t.unescape() {
                        Ok(text) => buf.push_str(&text),
                        // Unknown entity: keep it raw, normalization decodes it later.
                        Err(_) => buf.push_str(&String::from_utf8_lossy(&t)),
                    }
                }
            }
            Ok(Event::CData(c)) => {
                if let Some((_, buf)) = field.as_mut() {
                    buf.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Ok(Event::End(e)) => {
                // A stray end tag is dropped; a matching one closes everything inside it.
                let name = e.local_name().as_ref().to_vec();
                let Some(pos) = open.iter().rposition(|n| *n == name) else {
                    continue;
                };
                open.truncate(pos);
                let depth = open.len();
                let Some(item_depth) = current.as_ref().map(|(d, _)| *d) else {
                    continue;
                };
                if depth <= item_depth + 1 {
                    if let (Some((f, text)), Some((_, builder))) = (field.take(), current.as_mut()) {
                        builder.push(f, text);
                    }
                }
                if depth <= item_depth {
                    if let Some((_, builder)) = current.take() {
                        items.push(builder.build());
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(FetchError::Malformed(e.to_string())),
            _ => {}
        }
    }

    if !seen_root {
        return Err(FetchError::Malformed("document has no root element".to_string()));
    }
    if let Some(name) = open.last() {
        return Err(FetchError::Malformed(format!(
            "document ends inside <{}>",
            String::from_utf8_lossy(name)
        )));
    }
    Ok(items)
}

/// Fetcher for all registered feeds. HTTP in production, fixtures in tests.
pub struct RssFetcher {
    mode: Mode,
}

enum Mode {
    Fixture(HashMap<String, String>),
    Http { client: reqwest::Client },
}

impl RssFetcher {
    /// HTTP fetcher; `timeout` bounds the whole request including the body.
    pub fn http(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS).min(timeout))
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()?;
        Ok(Self {
            mode: Mode::Http { client },
        })
    }

    /// Serve documents from memory, keyed by feed URL.
    pub fn from_fixtures<I, K, V>(fixtures: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            mode: Mode::Fixture(
                fixtures
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    async fn fetch_http(
        client: &reqwest::Client,
        url: &str,
    ) -> Result<Vec<RawItem>, FetchError> {
        let mut resp = client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        if let Some(len) = resp.content_length() {
            if len > MAX_FEED_BYTES {
                return Err(FetchError::TooLarge {
                    size: len,
                    max: MAX_FEED_BYTES,
                });
            }
        }
        // Content-Length is absent for chunked bodies; enforce the cap while reading.
        let mut body = Vec::new();
        while let Some(chunk) = resp.chunk().await? {
            let size = (body.len() + chunk.len()) as u64;
            if size > MAX_FEED_BYTES {
                return Err(FetchError::TooLarge {
                    size,
                    max: MAX_FEED_BYTES,
                });
            }
            body.extend_from_slice(&chunk);
        }
        parse_feed(&String::from_utf8_lossy(&body))
    }
}

#[async_trait]
impl FeedFetcher for RssFetcher {
    async fn fetch(&self, source: &FeedSource) -> Result<Vec<RawItem>, FetchError> {
        match &self.mode {
            Mode::Fixture(docs) => {
                let xml = docs
                    .get(&source.url)
                    .ok_or_else(|| FetchError::MissingFixture(source.url.clone()))?;
                parse_feed(xml)
            }
            Mode::Http { client } => Self::fetch_http(client, &source.url).await,
        }
    }

    fn name(&self) -> &'static str {
        match self.mode {
            Mode::Fixture(_) => "fixture",
            Mode::Http { .. } => "http",
        }
    }
}

/// HTML named entities are not valid XML; fold the common ones before parsing.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&hellip;", "...")
}
