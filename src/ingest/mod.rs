// src/ingest/mod.rs
pub mod providers;
pub mod registry;
pub mod types;

use once_cell::sync::OnceCell;

pub use providers::{parse_feed, RssFetcher};
pub use types::{FeedFetcher, FeedSource, FetchError, RawItem};

/// Maximum length (in chars) of a normalized title/description.
pub const MAX_TEXT_CHARS: usize = 500;
const ELLIPSIS: &str = "...";

/// Normalize feed text: decode entities, strip tags, collapse whitespace, cap length.
///
/// Pure and idempotent on its own output; never fails.
pub fn normalize_text(s: &str) -> String {
    // 1) Decode entities and strip tags until stable. Feeds often double-escape
    //    (`&amp;amp;`, `&amp;lt;p&amp;gt;`). Every changing pass shrinks the text.
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    let mut stripped = s.to_string();
    loop {
        let decoded = html_escape::decode_html_entities(&stripped);
        let next = re_tags.replace_all(&decoded, "").into_owned();
        if next == stripped {
            break;
        }
        stripped = next;
    }

    // 2) Collapse whitespace (\s covers NBSP in Unicode mode)
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    let out = re_ws.replace_all(&stripped, " ");
    let out = out.trim();

    // 3) Length cap
    truncate_chars(out, MAX_TEXT_CHARS)
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let keep = max - ELLIPSIS.len();
    let mut out: String = s.chars().take(keep).collect();
    // Never end on a space before the ellipsis; the next pass would not collapse it.
    while out.ends_with(' ') {
        out.pop();
    }
    out.push_str(ELLIPSIS);
    out
}
