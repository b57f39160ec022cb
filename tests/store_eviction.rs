// tests/store_eviction.rs
use std::time::Duration as StdDuration;

use chrono::{Duration, TimeZone, Utc};
use news_collector::store::{ListQuery, NewItem, NewsStore};

const DAY: StdDuration = StdDuration::from_secs(24 * 3600);

fn item(link: &str) -> NewItem {
    NewItem {
        title: "t".into(),
        link: link.into(),
        source_name: "S".into(),
        ..Default::default()
    }
}

#[tokio::test]
async fn only_strictly_older_items_are_evicted() {
    let store = NewsStore::open_in_memory().await.unwrap();
    let now = Utc.with_ymd_and_hms(2025, 10, 15, 12, 0, 0).unwrap();
    let threshold = now - Duration::hours(24);

    store
        .insert_if_absent_at(item("https://e/older"), threshold - Duration::microseconds(1))
        .await
        .unwrap();
    store
        .insert_if_absent_at(item("https://e/exact"), threshold)
        .await
        .unwrap();
    store
        .insert_if_absent_at(item("https://e/fresh"), now - Duration::hours(1))
        .await
        .unwrap();

    let evicted = store.evict_older_than_at(now, DAY).await.unwrap();
    assert_eq!(evicted, 1);

    let left: Vec<String> = store
        .list(&ListQuery::default())
        .await
        .unwrap()
        .into_iter()
        .map(|i| i.link)
        .collect();
    assert_eq!(left, ["https://e/fresh", "https://e/exact"]);

    // Idempotent at the same instant.
    assert_eq!(store.evict_older_than_at(now, DAY).await.unwrap(), 0);
}

#[tokio::test]
async fn evicted_link_can_be_collected_again() {
    let store = NewsStore::open_in_memory().await.unwrap();
    let t0 = Utc.with_ymd_and_hms(2025, 10, 1, 0, 0, 0).unwrap();

    store.insert_if_absent_at(item("https://e/1"), t0).await.unwrap();
    let later = t0 + Duration::days(2);
    assert_eq!(store.evict_older_than_at(later, DAY).await.unwrap(), 1);
    assert!(!store.contains_link("https://e/1").await.unwrap());

    let again = store.insert_if_absent_at(item("https://e/1"), later).await.unwrap();
    assert!(matches!(again, news_collector::store::InsertOutcome::Inserted(_)));
}

#[tokio::test]
async fn empty_store_evicts_nothing() {
    let store = NewsStore::open_in_memory().await.unwrap();
    assert_eq!(store.evict_older_than(DAY).await.unwrap(), 0);
}

#[tokio::test]
async fn unbounded_max_age_keeps_everything() {
    let store = NewsStore::open_in_memory().await.unwrap();
    let now = Utc.with_ymd_and_hms(2025, 10, 15, 12, 0, 0).unwrap();
    store
        .insert_if_absent_at(item("https://e/ancient"), now - Duration::days(3650))
        .await
        .unwrap();

    let cfg_age = StdDuration::from_secs(u64::MAX);
    assert_eq!(store.evict_older_than_at(now, cfg_age).await.unwrap(), 0);
    assert_eq!(store.evict_older_than(cfg_age).await.unwrap(), 0);
    assert_eq!(store.list(&ListQuery::default()).await.unwrap().len(), 1);
}
