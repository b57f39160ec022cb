//! Plain-text digest of stored items for terminal use (`--show`).

use std::fmt::Write as _;

use chrono::{DateTime, Utc};

use crate::store::NewsItem;

const RULE_WIDTH: usize = 70;

fn fmt_date(ts: &DateTime<Utc>) -> String {
    ts.format("%d/%m/%Y %H:%M").to_string()
}

/// Items are printed in the order given (the store returns newest first).
pub fn render(items: &[NewsItem], max_age_hours: u64) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let mut out = String::new();
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "NEWS (last {max_age_hours} hours)");
    let _ = writeln!(out, "Total: {} item(s)", items.len());
    let _ = writeln!(out, "{rule}");

    if items.is_empty() {
        let _ = writeln!(out, "No news available right now.");
        return out;
    }

    for item in items {
        let _ = writeln!(out, "[{}] {}", item.source_name, fmt_date(&item.published_at));
        let _ = writeln!(out, "  {}", item.title);
        if let Some(t) = &item.title_translated {
            let _ = writeln!(out, "  > {t}");
        }
        let _ = writeln!(out, "  {}", item.link);
        let description = item
            .description_translated
            .as_deref()
            .unwrap_or(&item.description);
        if !description.is_empty() {
            let _ = writeln!(out, "  {description}");
        }
        let _ = writeln!(out, "{}", "-".repeat(RULE_WIDTH));
    }
    out
}
