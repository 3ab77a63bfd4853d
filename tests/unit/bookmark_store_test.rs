//! Unit tests for the SQLite-backed `LocalBookmarkStore`.
//!
//! These tests exercise the store contract (`BookmarkStoreTrait`) against an
//! in-memory database: owner scoping, newest-first ordering, idempotent
//! deletes and change notification fan-out.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use smartmark::database::Database;
use smartmark::managers::bookmark_store::{BookmarkStoreTrait, LocalBookmarkStore};
use smartmark::types::bookmark::NewBookmark;
use smartmark::types::errors::StoreError;
use smartmark::types::subscription::ChangeCallback;

/// Helper: create a LocalBookmarkStore backed by a fresh in-memory database.
fn setup() -> LocalBookmarkStore {
    let db = Database::open_in_memory().expect("Failed to open in-memory database");
    LocalBookmarkStore::new(Arc::new(db))
}

fn new_bookmark(url: &str, title: &str, owner: &str) -> NewBookmark {
    NewBookmark {
        url: url.to_string(),
        title: title.to_string(),
        tags: vec!["t1".to_string(), "t2".to_string()],
        owner: owner.to_string(),
    }
}

fn counter() -> (Arc<AtomicUsize>, ChangeCallback) {
    let count = Arc::new(AtomicUsize::new(0));
    let c = count.clone();
    let callback: ChangeCallback = Arc::new(move || {
        c.fetch_add(1, Ordering::SeqCst);
    });
    (count, callback)
}

#[tokio::test]
async fn test_insert_assigns_id_and_timestamp() {
    let store = setup();
    let created = store
        .insert(new_bookmark("https://github.com", "GitHub", "u1"))
        .await
        .unwrap();

    assert!(!created.id.is_empty());
    assert_eq!(created.url, "https://github.com");
    assert_eq!(created.title, "GitHub");
    assert_eq!(created.tags, vec!["t1", "t2"]);
    assert_eq!(created.owner, "u1");

    let listed = store.list_by_owner("u1").await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, created.id);
    assert_eq!(listed[0].tags, created.tags);
    assert_eq!(
        listed[0].created_at.timestamp_micros(),
        created.created_at.timestamp_micros()
    );
}

#[tokio::test]
async fn test_list_is_owner_scoped() {
    let store = setup();
    store.insert(new_bookmark("https://a.io", "A", "alice")).await.unwrap();
    store.insert(new_bookmark("https://b.io", "B", "bob")).await.unwrap();
    store.insert(new_bookmark("https://c.io", "C", "alice")).await.unwrap();

    let alice = store.list_by_owner("alice").await.unwrap();
    assert_eq!(alice.len(), 2);
    assert!(alice.iter().all(|b| b.owner == "alice"));

    let bob = store.list_by_owner("bob").await.unwrap();
    assert_eq!(bob.len(), 1);
    assert!(store.list_by_owner("nobody").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_list_is_newest_first() {
    let store = setup();
    for i in 0..5 {
        store
            .insert(new_bookmark(&format!("https://{}.io", i), &i.to_string(), "u"))
            .await
            .unwrap();
    }

    let listed = store.list_by_owner("u").await.unwrap();
    let titles: Vec<&str> = listed.iter().map(|b| b.title.as_str()).collect();
    assert_eq!(titles, vec!["4", "3", "2", "1", "0"]);
    assert!(listed
        .windows(2)
        .all(|w| w[0].created_at >= w[1].created_at));
}

#[tokio::test]
async fn test_delete_removes_row() {
    let store = setup();
    let a = store.insert(new_bookmark("https://a.io", "A", "u")).await.unwrap();
    let b = store.insert(new_bookmark("https://b.io", "B", "u")).await.unwrap();

    store.delete(&a.id).await.unwrap();

    let listed = store.list_by_owner("u").await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, b.id);
}

#[tokio::test]
async fn test_delete_absent_id_is_ok_and_silent() {
    let store = setup();
    let (count, callback) = counter();
    let _sub = store.subscribe_to_changes(callback);

    assert!(store.delete("does-not-exist").await.is_ok());
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_every_subscriber_notified_for_any_owner() {
    let store = setup();
    let (first, cb1) = counter();
    let (second, cb2) = counter();
    let _s1 = store.subscribe_to_changes(cb1);
    let _s2 = store.subscribe_to_changes(cb2);
    assert_eq!(store.subscriber_count(), 2);

    let created = store.insert(new_bookmark("https://a.io", "A", "alice")).await.unwrap();
    store.insert(new_bookmark("https://b.io", "B", "bob")).await.unwrap();
    store.delete(&created.id).await.unwrap();

    assert_eq!(first.load(Ordering::SeqCst), 3);
    assert_eq!(second.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_unsubscribe_stops_notifications() {
    let store = setup();
    let (count, callback) = counter();
    let mut sub = store.subscribe_to_changes(callback);

    store.insert(new_bookmark("https://a.io", "A", "u")).await.unwrap();
    sub.unsubscribe();
    assert!(!sub.is_active());
    assert_eq!(store.subscriber_count(), 0);

    store.insert(new_bookmark("https://b.io", "B", "u")).await.unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 1);

    // Releasing twice is harmless.
    sub.unsubscribe();
}

#[tokio::test]
async fn test_dropping_subscription_releases_it() {
    let store = setup();
    let (count, callback) = counter();
    {
        let _sub = store.subscribe_to_changes(callback);
        assert_eq!(store.subscriber_count(), 1);
    }
    assert_eq!(store.subscriber_count(), 0);

    store.insert(new_bookmark("https://a.io", "A", "u")).await.unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_corrupt_tags_column_is_a_database_error() {
    let db = Arc::new(Database::open_in_memory().expect("Failed to open in-memory database"));
    let store = LocalBookmarkStore::new(db.clone());
    let created = store.insert(new_bookmark("https://a.io", "A", "u")).await.unwrap();

    db.connection()
        .execute(
            "UPDATE bookmarks SET tags = 'not json' WHERE id = ?1",
            [created.id.as_str()],
        )
        .unwrap();

    let result = store.list_by_owner("u").await;
    assert!(matches!(result, Err(StoreError::Database(_))));
}
