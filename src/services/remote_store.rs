//! Bookmark store over the hosted REST interface.
//!
//! Reads are owner-scoped and ordered newest first on the server. Change
//! notifications come from the realtime channel.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Response;
use tracing::debug;

use crate::managers::bookmark_store::BookmarkStoreTrait;
use crate::services::backend_client::BackendClient;
use crate::services::realtime::RealtimeChannel;
use crate::types::bookmark::{Bookmark, NewBookmark};
use crate::types::errors::StoreError;
use crate::types::subscription::{ChangeCallback, Subscription};

/// Query string for an owner's bookmarks, newest first.
pub fn list_query(owner: &str) -> Vec<(&'static str, String)> {
    vec![
        ("select", "*".to_string()),
        ("user_id", format!("eq.{}", owner)),
        ("order", "created_at.desc".to_string()),
    ]
}

/// Query string selecting one bookmark by id.
pub fn id_query(id: &str) -> Vec<(&'static str, String)> {
    vec![("id", format!("eq.{}", id))]
}

fn transport_error(e: reqwest::Error) -> StoreError {
    if e.is_decode() {
        StoreError::Decode(e.to_string())
    } else {
        StoreError::Unavailable(e.to_string())
    }
}

/// Turns non-2xx responses into `StoreError::Rejected`.
async fn check_status(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(StoreError::Rejected {
        status: status.as_u16(),
        message,
    })
}

/// Bookmark store backed by the hosted table store.
pub struct RemoteBookmarkStore {
    client: Arc<BackendClient>,
    realtime: RealtimeChannel,
}

impl RemoteBookmarkStore {
    pub fn new(client: Arc<BackendClient>, realtime: RealtimeChannel) -> Self {
        Self { client, realtime }
    }

    fn table_url(&self) -> String {
        self.client.rest_url(self.client.table())
    }
}

#[async_trait]
impl BookmarkStoreTrait for RemoteBookmarkStore {
    async fn list_by_owner(&self, owner: &str) -> Result<Vec<Bookmark>, StoreError> {
        let request = self
            .client
            .authorize(self.client.http().get(self.table_url()))
            .query(&list_query(owner));
        let response = check_status(request.send().await.map_err(transport_error)?).await?;
        let bookmarks: Vec<Bookmark> = response.json().await.map_err(transport_error)?;
        debug!(owner, count = bookmarks.len(), "listed bookmarks");
        Ok(bookmarks)
    }

    async fn insert(&self, bookmark: NewBookmark) -> Result<Bookmark, StoreError> {
        let request = self
            .client
            .authorize(self.client.http().post(self.table_url()))
            .header("Prefer", "return=representation")
            .json(&[bookmark]);
        let response = check_status(request.send().await.map_err(transport_error)?).await?;
        let mut rows: Vec<Bookmark> = response.json().await.map_err(transport_error)?;
        if rows.is_empty() {
            return Err(StoreError::Decode("insert returned no rows".to_string()));
        }
        Ok(rows.swap_remove(0))
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let request = self
            .client
            .authorize(self.client.http().delete(self.table_url()))
            .query(&id_query(id));
        check_status(request.send().await.map_err(transport_error)?).await?;
        Ok(())
    }

    fn subscribe_to_changes(&self, on_change: ChangeCallback) -> Subscription {
        self.realtime.subscribe(on_change)
    }
}
