//! Synchronization controller for SmartMark.
//!
//! Owns the in-memory bookmark collection for one signed-in principal:
//! fetches it on activation, refetches it in full on every change
//! notification, applies submit/delete mutations, and exposes the filtered
//! view the presentation layer renders.
//!
//! All operations take `&self`. State sits behind a mutex that is never held
//! across an `.await`, so store round trips and change notifications may
//! interleave freely; whichever full replacement completes last is what the
//! user sees.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::managers::bookmark_store::BookmarkStoreTrait;
use crate::managers::session_accessor::SessionAccessorTrait;
use crate::services::bookmark_input::{build_new_bookmark, validate_draft};
use crate::services::search::filter_bookmarks;
use crate::types::bookmark::{Bookmark, BookmarkDraft};
use crate::types::errors::{ErrorKind, StoreError};
use crate::types::principal::Principal;
use crate::types::subscription::{ChangeCallback, Subscription};

/// Mutable controller state.
#[derive(Debug, Default)]
struct ControllerState {
    bookmarks: Vec<Bookmark>,
    search_term: String,
    pending_delete_id: Option<String>,
    /// Number of submits in flight; `is_submitting` is `submitting > 0`.
    submitting: usize,
    last_error: Option<ErrorKind>,
    draft: BookmarkDraft,
}

/// Point-in-time view handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControllerSnapshot {
    /// Filtered view under `search_term`.
    pub bookmarks: Vec<Bookmark>,
    /// Size of the unfiltered collection.
    pub total: usize,
    pub search_term: String,
    pub pending_delete_id: Option<String>,
    pub is_submitting: bool,
    pub last_error: Option<ErrorKind>,
    pub draft: BookmarkDraft,
}

struct Shared {
    store: Arc<dyn BookmarkStoreTrait>,
    session: Arc<dyn SessionAccessorTrait>,
    state: Mutex<ControllerState>,
    active: AtomicBool,
    /// Bumped on every activate/deactivate; reads started under an older
    /// generation are discarded.
    generation: AtomicU64,
    changes: watch::Sender<u64>,
}

impl Shared {
    fn with_state<R>(&self, f: impl FnOnce(&mut ControllerState) -> R) -> R {
        let result = {
            let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
            f(&mut state)
        };
        self.changes.send_modify(|version| *version = version.wrapping_add(1));
        result
    }

    fn read_state<R>(&self, f: impl FnOnce(&ControllerState) -> R) -> R {
        let state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        f(&state)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.active.load(Ordering::SeqCst) && self.generation.load(Ordering::SeqCst) == generation
    }

    /// Re-resolves the principal and replaces the collection.
    async fn refresh(&self) {
        let generation = self.generation.load(Ordering::SeqCst);
        let principal = self.session.current_user().await;
        self.load(principal, generation).await;
    }

    /// Full-replace reconciliation for `principal`. No principal clears the
    /// collection. A failed read degrades to an empty list.
    async fn load(&self, principal: Option<Principal>, generation: u64) {
        let result: Result<Vec<Bookmark>, StoreError> = match &principal {
            Some(p) => self.store.list_by_owner(&p.id).await,
            None => Ok(Vec::new()),
        };

        if !self.is_current(generation) {
            debug!(generation, "discarding bookmark list for stale activation");
            return;
        }

        match result {
            Ok(bookmarks) => {
                debug!(count = bookmarks.len(), "bookmark list replaced");
                self.with_state(|s| {
                    s.bookmarks = bookmarks;
                    if s.last_error == Some(ErrorKind::StoreUnavailable) {
                        s.last_error = None;
                    }
                });
            }
            Err(e) => {
                warn!(error = %e, "failed to list bookmarks, showing empty list");
                let kind = e.kind_for_read();
                self.with_state(|s| {
                    s.bookmarks.clear();
                    s.last_error = Some(kind);
                });
            }
        }
    }
}

/// Holds `is_submitting` up for as long as it lives.
struct SubmittingGuard<'a> {
    shared: &'a Shared,
}

impl<'a> SubmittingGuard<'a> {
    fn engage(shared: &'a Shared) -> Self {
        shared.with_state(|s| {
            s.submitting += 1;
            s.last_error = None;
        });
        Self { shared }
    }
}

impl Drop for SubmittingGuard<'_> {
    fn drop(&mut self) {
        self.shared
            .with_state(|s| s.submitting = s.submitting.saturating_sub(1));
    }
}

/// Removes `id` from `bookmarks`. Returns whether anything was removed;
/// an absent id is not an error.
pub fn remove_bookmark(bookmarks: &mut Vec<Bookmark>, id: &str) -> bool {
    let before = bookmarks.len();
    bookmarks.retain(|b| b.id != id);
    bookmarks.len() != before
}

/// Inserts `bookmark` at its `created_at` position (newest first) unless a
/// bookmark with the same id is already present.
fn insert_sorted(bookmarks: &mut Vec<Bookmark>, bookmark: Bookmark) {
    if bookmarks.iter().any(|b| b.id == bookmark.id) {
        return;
    }
    let pos = bookmarks.partition_point(|b| b.created_at > bookmark.created_at);
    bookmarks.insert(pos, bookmark);
}

/// Client-side bookmark synchronization for one session.
pub struct SyncController {
    shared: Arc<Shared>,
    subscription: Mutex<Option<Subscription>>,
}

impl SyncController {
    pub fn new(store: Arc<dyn BookmarkStoreTrait>, session: Arc<dyn SessionAccessorTrait>) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            shared: Arc::new(Shared {
                store,
                session,
                state: Mutex::new(ControllerState::default()),
                active: AtomicBool::new(false),
                generation: AtomicU64::new(0),
                changes,
            }),
            subscription: Mutex::new(None),
        }
    }

    pub fn is_active(&self) -> bool {
        self.shared.active.load(Ordering::SeqCst)
    }

    /// Returns true while a change subscription is held.
    pub fn is_subscribed(&self) -> bool {
        self.subscription
            .lock()
            .map(|s| s.as_ref().is_some_and(Subscription::is_active))
            .unwrap_or(false)
    }

    /// Resolves the principal, subscribes to changes and loads the owner's
    /// bookmarks. Without a principal the collection stays empty and no
    /// subscription is taken. Calling this on an active controller is a no-op.
    pub async fn activate(&self) {
        if self.shared.active.swap(true, Ordering::SeqCst) {
            return;
        }
        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let Some(principal) = self.shared.session.current_user().await else {
            info!("no signed-in principal, bookmark list left empty");
            if self.shared.is_current(generation) {
                self.shared.with_state(|s| s.bookmarks.clear());
            }
            return;
        };
        if !self.shared.is_current(generation) {
            return;
        }

        info!(owner = %principal.id, "activating bookmark sync");
        let subscription = self.subscribe();
        {
            let mut slot = self.subscription.lock().unwrap_or_else(|p| p.into_inner());
            // Checked under the slot lock: a deactivate that already bumped the
            // generation will never see this subscription.
            if !self.shared.is_current(generation) {
                drop(slot);
                drop(subscription);
                debug!(generation, "activation superseded, subscription released");
                return;
            }
            *slot = Some(subscription);
        }

        self.shared.load(Some(principal), generation).await;
    }

    /// Establishes the change subscription and the task that turns each
    /// notification into a full refresh. Notifications that arrive while a
    /// refresh runs coalesce into one further refresh.
    fn subscribe(&self) -> Subscription {
        let (tx, mut rx) = mpsc::unbounded_channel::<()>();
        let on_change: ChangeCallback = Arc::new(move || {
            let _ = tx.send(());
        });
        let subscription = self.shared.store.subscribe_to_changes(on_change);

        let weak = Arc::downgrade(&self.shared);
        tokio::spawn(async move {
            while rx.recv().await.is_some() {
                while rx.try_recv().is_ok() {}
                let Some(shared) = weak.upgrade() else { break };
                if !shared.active.load(Ordering::SeqCst) {
                    break;
                }
                debug!("change notification, refreshing bookmarks");
                shared.refresh().await;
            }
            debug!("bookmark change listener finished");
        });

        subscription
    }

    /// Releases the change subscription. In-flight store calls are not
    /// aborted; their results are discarded when they complete.
    pub fn deactivate(&self) {
        if !self.shared.active.swap(false, Ordering::SeqCst) {
            return;
        }
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        self.release_subscription();
        info!("bookmark sync deactivated");
    }

    fn release_subscription(&self) {
        let released = match self.subscription.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(mut subscription) = released {
            subscription.unsubscribe();
        }
    }

    /// Re-resolves the principal and replaces the collection. Does nothing
    /// while the controller is inactive.
    pub async fn refresh(&self) {
        if !self.is_active() {
            return;
        }
        self.shared.refresh().await;
    }

    // ─── Draft input ───

    pub fn set_draft(&self, draft: BookmarkDraft) {
        self.shared.with_state(|s| s.draft = draft);
    }

    pub fn set_draft_url(&self, url: &str) {
        self.shared.with_state(|s| s.draft.url = url.to_string());
    }

    pub fn set_draft_title(&self, title: &str) {
        self.shared.with_state(|s| s.draft.title = title.to_string());
    }

    pub fn set_draft_tags(&self, tags: &str) {
        self.shared.with_state(|s| s.draft.tags = tags.to_string());
    }

    pub fn draft(&self) -> BookmarkDraft {
        self.shared.read_state(|s| s.draft.clone())
    }

    // ─── Mutations ───

    /// Sets the draft from raw input and submits it.
    pub async fn submit_input(&self, url: &str, title: &str, tags: &str) -> Option<Bookmark> {
        self.set_draft(BookmarkDraft::new(url, title, tags));
        self.submit().await
    }

    /// Validates the draft and inserts it for the current principal.
    ///
    /// On success the draft is cleared and the created bookmark is placed
    /// in the collection; the next change notification reconciles it with
    /// the store. On any failure `last_error` is set, the draft is kept and
    /// `None` is returned.
    pub async fn submit(&self) -> Option<Bookmark> {
        let _submitting = SubmittingGuard::engage(&self.shared);
        let draft = self.draft();

        let url = match validate_draft(&draft) {
            Ok(url) => url,
            Err(kind) => {
                debug!(input = %draft.url, "rejected bookmark url");
                self.shared.with_state(|s| s.last_error = Some(kind));
                return None;
            }
        };

        let Some(principal) = self.shared.session.current_user().await else {
            warn!("submit without a signed-in principal");
            self.shared
                .with_state(|s| s.last_error = Some(ErrorKind::Unauthenticated));
            return None;
        };

        let new_bookmark = build_new_bookmark(url, &draft, &principal.id);
        match self.shared.store.insert(new_bookmark).await {
            Ok(created) => {
                info!(id = %created.id, url = %created.url, "bookmark created");
                if self.is_active() {
                    let local = created.clone();
                    self.shared.with_state(|s| {
                        s.draft = BookmarkDraft::default();
                        insert_sorted(&mut s.bookmarks, local);
                    });
                }
                Some(created)
            }
            Err(e) => {
                warn!(error = %e, "failed to insert bookmark");
                let kind = e.kind_for_write();
                self.shared.with_state(|s| s.last_error = Some(kind));
                None
            }
        }
    }

    /// Marks `id` for deletion. No store call is made.
    pub fn request_delete(&self, id: &str) {
        self.shared
            .with_state(|s| s.pending_delete_id = Some(id.to_string()));
    }

    /// Clears the pending deletion. No store call is made.
    pub fn cancel_delete(&self) {
        self.shared.with_state(|s| s.pending_delete_id = None);
    }

    /// Deletes the pending bookmark.
    ///
    /// The pending id is cleared before the store call. The bookmark leaves
    /// the collection only once the store confirms; on failure the collection
    /// is untouched and `last_error` is set. Returns whether the store
    /// confirmed a deletion.
    pub async fn confirm_delete(&self) -> bool {
        let Some(id) = self.shared.with_state(|s| s.pending_delete_id.take()) else {
            return false;
        };

        match self.shared.store.delete(&id).await {
            Ok(()) => {
                info!(id = %id, "bookmark deleted");
                if self.is_active() {
                    self.shared.with_state(|s| {
                        remove_bookmark(&mut s.bookmarks, &id);
                    });
                }
                true
            }
            Err(e) => {
                warn!(id = %id, error = %e, "failed to delete bookmark");
                if self.is_active() {
                    let kind = e.kind_for_write();
                    self.shared.with_state(|s| s.last_error = Some(kind));
                }
                false
            }
        }
    }

    // ─── Views ───

    pub fn set_search_term(&self, term: &str) {
        self.shared.with_state(|s| s.search_term = term.to_string());
    }

    pub fn search_term(&self) -> String {
        self.shared.read_state(|s| s.search_term.clone())
    }

    /// Bookmarks matching the current search term, most recent first.
    pub fn filtered(&self) -> Vec<Bookmark> {
        self.shared
            .read_state(|s| filter_bookmarks(&s.bookmarks, &s.search_term))
    }

    /// The unfiltered collection, most recent first.
    pub fn bookmarks(&self) -> Vec<Bookmark> {
        self.shared.read_state(|s| s.bookmarks.clone())
    }

    pub fn pending_delete_id(&self) -> Option<String> {
        self.shared.read_state(|s| s.pending_delete_id.clone())
    }

    pub fn is_submitting(&self) -> bool {
        self.shared.read_state(|s| s.submitting > 0)
    }

    pub fn last_error(&self) -> Option<ErrorKind> {
        self.shared.read_state(|s| s.last_error)
    }

    pub fn clear_error(&self) {
        self.shared.with_state(|s| s.last_error = None);
    }

    pub fn snapshot(&self) -> ControllerSnapshot {
        self.shared.read_state(|s| ControllerSnapshot {
            bookmarks: filter_bookmarks(&s.bookmarks, &s.search_term),
            total: s.bookmarks.len(),
            search_term: s.search_term.clone(),
            pending_delete_id: s.pending_delete_id.clone(),
            is_submitting: s.submitting > 0,
            last_error: s.last_error,
            draft: s.draft.clone(),
        })
    }

    /// Receiver whose value changes after every state mutation.
    pub fn watch(&self) -> watch::Receiver<u64> {
        self.shared.changes.subscribe()
    }
}

impl Drop for SyncController {
    fn drop(&mut self) {
        self.deactivate();
    }
}
