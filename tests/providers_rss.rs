// tests/providers_rss.rs
use chrono::{TimeZone, Utc};
use news_collector::ingest::{
    normalize_text, parse_feed, FeedFetcher, FeedSource, FetchError, RssFetcher,
};

const MARKETS_XML: &str = include_str!("fixtures/markets_rss.xml");
const INFOMONEY_XML: &str = include_str!("fixtures/infomoney_rss.xml");
const ATOM_XML: &str = include_str!("fixtures/coindesk_atom.xml");
const MESSY_XML: &str = include_str!("fixtures/messy_rss.xml");
const XHTML_ATOM_XML: &str = include_str!("fixtures/xhtml_atom.xml");

#[test]
fn rss_fixture_yields_items_in_feed_order() {
    let items = parse_feed(MARKETS_XML).expect("rss parse ok");
    assert_eq!(items.len(), 3);

    assert_eq!(
        items[0].title.as_deref(),
        Some("Stocks climb as investors weigh fresh inflation data")
    );
    assert_eq!(
        items[0].link.as_deref(),
        Some("https://markets.example.test/articles/stocks-climb")
    );
    assert!(items[0]
        .description
        .as_deref()
        .unwrap()
        .contains("<b>consumer prices</b>"));
    assert_eq!(
        items[0].published_at,
        Some(Utc.with_ymd_and_hms(2025, 10, 14, 16, 0, 0).unwrap())
    );

    // dc:date is used when pubDate is absent; XML entities are already decoded.
    assert_eq!(
        items[1].title.as_deref(),
        Some("Oil prices slip on demand worries & rising stockpiles")
    );
    assert_eq!(
        items[1].published_at,
        Some(Utc.with_ymd_and_hms(2025, 10, 14, 15, 30, 0).unwrap())
    );

    assert!(items[2].link.is_none());
}

#[test]
fn unparseable_pub_date_is_absent() {
    let items = parse_feed(INFOMONEY_XML).unwrap();
    assert_eq!(items.len(), 1);
    assert!(items[0].published_at.is_none());
    assert!(items[0].title.as_deref().unwrap().starts_with("Ibovespa"));
}

#[test]
fn atom_prefers_alternate_link_and_summary() {
    let items = parse_feed(ATOM_XML).unwrap();
    assert_eq!(items.len(), 2);

    assert_eq!(
        items[0].link.as_deref(),
        Some("https://crypto.example.test/markets/bitcoin-rally")
    );
    assert_eq!(
        items[0].description.as_deref(),
        Some("<p>The largest cryptocurrency gained 4% in Asian trading.</p>")
    );
    assert_eq!(
        items[0].published_at,
        Some(Utc.with_ymd_and_hms(2025, 10, 14, 12, 0, 0).unwrap())
    );

    // No rel attribute means alternate; content backs up a missing summary.
    assert_eq!(
        items[1].link.as_deref(),
        Some("https://crypto.example.test/markets/ether-expiry")
    );
    assert_eq!(
        items[1].description.as_deref(),
        Some("Traders brace for volatility.")
    );
    assert_eq!(
        items[1].published_at,
        Some(Utc.with_ymd_and_hms(2025, 10, 14, 7, 15, 0).unwrap())
    );
}

#[test]
fn odd_entries_do_not_cost_their_siblings() {
    let items = parse_feed(MESSY_XML).expect("one odd item must not fail the feed");
    let links: Vec<_> = items.iter().map(|i| i.link.as_deref().unwrap()).collect();
    assert_eq!(
        links,
        [
            "https://messy.example.test/a",
            "https://messy.example.test/b",
            "https://messy.example.test/c",
            "https://messy.example.test/d",
        ]
    );

    // Repeated fields: first parseable date, first non-empty body.
    assert_eq!(
        items[1].published_at,
        Some(Utc.with_ymd_and_hms(2025, 10, 14, 11, 0, 0).unwrap())
    );
    assert_eq!(items[1].description.as_deref(), Some("First body"));

    // Stray end tag is ignored; an HTML entity is kept for normalization.
    assert_eq!(items[2].title.as_deref(), Some("Stray close tag inside"));
    assert_eq!(items[2].description.as_deref(), Some("Caf&eacute; exports rise"));

    assert_eq!(items[3].title.as_deref(), Some("Gold steadies"));
}

#[test]
fn atom_xhtml_title_keeps_its_text() {
    let items = parse_feed(XHTML_ATOM_XML).unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].title.as_deref(), Some("Good"));
    assert_eq!(
        normalize_text(items[1].title.as_deref().unwrap()),
        "Central bank holds rates"
    );
    assert_eq!(
        items[1].published_at,
        Some(Utc.with_ymd_and_hms(2025, 10, 14, 9, 0, 0).unwrap())
    );
}

#[test]
fn broken_xml_is_a_feed_level_error() {
    let truncated = MARKETS_XML.split("</channel>").next().unwrap();
    assert!(matches!(
        parse_feed(truncated),
        Err(FetchError::Malformed(_))
    ));
}

#[tokio::test]
async fn fixture_fetcher_serves_by_url() {
    let fetcher = RssFetcher::from_fixtures([("https://a.test/rss", MARKETS_XML)]);
    let ok = fetcher
        .fetch(&FeedSource::new("A", "https://a.test/rss"))
        .await
        .unwrap();
    assert_eq!(ok.len(), 3);

    let missing = fetcher
        .fetch(&FeedSource::new("B", "https://b.test/rss"))
        .await;
    assert!(matches!(missing, Err(FetchError::MissingFixture(_))));
}
