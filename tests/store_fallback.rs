// tests/store_fallback.rs
use std::fs;

use news_collector::store::{LocationKind, NewItem, NewsStore, StoreError};

#[tokio::test]
async fn unusable_primary_path_falls_back_and_reports_degraded() {
    let dir = tempfile::tempdir().unwrap();
    // A regular file where the primary's parent directory should be.
    let blocker = dir.path().join("not-a-dir");
    fs::write(&blocker, b"x").unwrap();
    let primary = blocker.join("news.db");
    let fallback = dir.path().join("fallback").join("news.db");

    let store = NewsStore::open_with_fallback(&primary, &fallback)
        .await
        .expect("fallback should open");
    assert_eq!(store.location().kind, LocationKind::Fallback);

    store
        .insert_if_absent(NewItem {
            title: "t".into(),
            link: "https://f/1".into(),
            source_name: "F".into(),
            ..Default::default()
        })
        .await
        .unwrap();

    let status = store.status().await.unwrap();
    assert!(status.degraded);
    assert_eq!(status.location, LocationKind::Fallback);
    assert_eq!(status.path.as_deref(), Some(fallback.as_path()));
    assert_eq!(status.total_items, 1);
    assert!(fallback.exists());
}

#[tokio::test]
async fn healthy_primary_is_not_degraded() {
    let dir = tempfile::tempdir().unwrap();
    let primary = dir.path().join("news.db");
    let fallback = dir.path().join("fallback.db");

    let store = NewsStore::open_with_fallback(&primary, &fallback).await.unwrap();
    assert_eq!(store.location().kind, LocationKind::Persistent);
    assert!(!store.status().await.unwrap().degraded);
    assert!(!fallback.exists());
}

#[tokio::test]
async fn both_paths_unusable_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, b"x").unwrap();

    let err = NewsStore::open_with_fallback(blocker.join("a.db"), blocker.join("b.db"))
        .await
        .err()
        .expect("both paths are under a regular file");
    assert!(matches!(err, StoreError::Unavailable { .. }), "{err}");
}
