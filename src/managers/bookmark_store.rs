//! Bookmark store contract and the SQLite-backed local store.
//!
//! `BookmarkStoreTrait` is the seam between the synchronization controller
//! and whichever backend holds the bookmarks table. `LocalBookmarkStore`
//! implements it over `rusqlite`, broadcasting a change notification to every
//! subscriber after each successful write.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::params;
use rusqlite::types::Type;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::database::connection::Database;
use crate::types::bookmark::{Bookmark, NewBookmark};
use crate::types::errors::StoreError;
use crate::types::subscription::{ChangeCallback, Subscription};

/// Operations the synchronization controller needs from a bookmark store.
#[async_trait]
pub trait BookmarkStoreTrait: Send + Sync {
    /// Lists the owner's bookmarks, most recent first.
    async fn list_by_owner(&self, owner: &str) -> Result<Vec<Bookmark>, StoreError>;
    /// Inserts a bookmark; the store assigns `id` and `created_at`.
    async fn insert(&self, bookmark: NewBookmark) -> Result<Bookmark, StoreError>;
    /// Deletes a bookmark by id.
    async fn delete(&self, id: &str) -> Result<(), StoreError>;
    /// Registers `on_change` for every change to any row in the table.
    fn subscribe_to_changes(&self, on_change: ChangeCallback) -> Subscription;
}

type Listeners = Arc<Mutex<HashMap<u64, ChangeCallback>>>;

/// Bookmark store backed by a local SQLite database.
pub struct LocalBookmarkStore {
    db: Arc<Database>,
    listeners: Listeners,
    next_listener_id: AtomicU64,
}

impl LocalBookmarkStore {
    /// Creates a new `LocalBookmarkStore` using the provided database.
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            db,
            listeners: Arc::new(Mutex::new(HashMap::new())),
            next_listener_id: AtomicU64::new(1),
        }
    }

    /// Number of live change subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.listeners.lock().map(|l| l.len()).unwrap_or(0)
    }

    /// Invokes every registered listener. The lock is released before the
    /// callbacks run so a listener may subscribe or unsubscribe.
    fn notify(&self) {
        let callbacks: Vec<ChangeCallback> = match self.listeners.lock() {
            Ok(listeners) => listeners.values().cloned().collect(),
            Err(_) => {
                warn!("bookmark listener registry poisoned, skipping notification");
                return;
            }
        };
        debug!(subscribers = callbacks.len(), "notifying bookmark subscribers");
        for callback in callbacks {
            callback();
        }
    }

    /// Reads a single `Bookmark` row into a struct.
    fn row_to_bookmark(row: &rusqlite::Row) -> rusqlite::Result<Bookmark> {
        let tags_json: String = row.get(3)?;
        let created_micros: i64 = row.get(5)?;
        Ok(Bookmark {
            id: row.get(0)?,
            url: row.get(1)?,
            title: row.get(2)?,
            tags: serde_json::from_str(&tags_json).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e))
            })?,
            owner: row.get(4)?,
            created_at: DateTime::<Utc>::from_timestamp_micros(created_micros)
                .unwrap_or_default(),
        })
    }
}

#[async_trait]
impl BookmarkStoreTrait for LocalBookmarkStore {
    async fn list_by_owner(&self, owner: &str) -> Result<Vec<Bookmark>, StoreError> {
        let conn = self.db.connection();
        let mut stmt = conn.prepare(
            "SELECT id, url, title, tags, user_id, created_at FROM bookmarks \
             WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC",
        )?;
        let rows = stmt.query_map(params![owner], Self::row_to_bookmark)?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    async fn insert(&self, bookmark: NewBookmark) -> Result<Bookmark, StoreError> {
        let created = Bookmark {
            id: Uuid::new_v4().to_string(),
            url: bookmark.url,
            title: bookmark.title,
            tags: bookmark.tags,
            owner: bookmark.owner,
            created_at: Utc::now(),
        };
        let tags_json =
            serde_json::to_string(&created.tags).map_err(|e| StoreError::Decode(e.to_string()))?;

        self.db.connection().execute(
            "INSERT INTO bookmarks (id, url, title, tags, user_id, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                created.id,
                created.url,
                created.title,
                tags_json,
                created.owner,
                created.created_at.timestamp_micros()
            ],
        )?;

        self.notify();
        Ok(created)
    }

    /// Deleting an id that does not exist succeeds without notifying.
    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let affected = self
            .db
            .connection()
            .execute("DELETE FROM bookmarks WHERE id = ?1", params![id])?;

        if affected > 0 {
            self.notify();
        }
        Ok(())
    }

    fn subscribe_to_changes(&self, on_change: ChangeCallback) -> Subscription {
        let id = self.next_listener_id.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.insert(id, on_change);
        }
        let listeners = Arc::downgrade(&self.listeners);
        Subscription::new(move || {
            if let Some(listeners) = listeners.upgrade() {
                if let Ok(mut listeners) = listeners.lock() {
                    listeners.remove(&id);
                }
            }
        })
    }
}
