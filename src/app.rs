//! App Core for SmartMark.
//!
//! Central struct wiring configuration, the chosen backend (local SQLite or
//! the hosted service), the session accessor and the synchronization
//! controller, and managing the sync lifecycle.

use std::sync::Arc;

use tracing::info;

use crate::database::connection::Database;
use crate::managers::bookmark_store::{BookmarkStoreTrait, LocalBookmarkStore};
use crate::managers::session_accessor::{FixedSession, SessionAccessorTrait};
use crate::managers::sync_controller::SyncController;
use crate::platform;
use crate::services::backend_client::BackendClient;
use crate::services::config_engine::ENV_ACCESS_TOKEN;
use crate::services::realtime::RealtimeChannel;
use crate::services::remote_store::RemoteBookmarkStore;
use crate::services::supabase_auth::SupabaseAuth;
use crate::types::config::{BackendKind, SmartMarkConfig};
use crate::types::errors::AuthError;
use crate::types::principal::Principal;

/// Central application struct.
pub struct App {
    pub config: SmartMarkConfig,
    pub controller: SyncController,
    session: Arc<dyn SessionAccessorTrait>,
    /// Present only with the hosted backend.
    auth: Option<Arc<SupabaseAuth>>,
}

impl App {
    /// Creates the App for the configured backend. Must be called inside a
    /// Tokio runtime when the hosted backend is selected, since realtime
    /// subscriptions spawn tasks.
    pub fn new(config: SmartMarkConfig) -> Result<Self, Box<dyn std::error::Error>> {
        match config.backend.kind {
            BackendKind::Local => {
                let path = config
                    .local
                    .database_path
                    .clone()
                    .map(std::path::PathBuf::from)
                    .unwrap_or_else(platform::default_database_path);
                let db = Arc::new(Database::open(&path)?);
                info!(path = %path.display(), "using local bookmark database");
                Ok(Self::local(config, db))
            }
            BackendKind::Supabase => {
                let client = Arc::new(BackendClient::new(&config.backend)?);
                if let Ok(token) = std::env::var(ENV_ACCESS_TOKEN) {
                    if !token.trim().is_empty() {
                        client.set_access_token(token.trim());
                    }
                }
                info!(url = %config.backend.url, table = %config.backend.table, "using hosted backend");
                Ok(Self::hosted(config, client))
            }
        }
    }

    /// Local backend over `db`, signed in as the configured local user.
    pub fn local(config: SmartMarkConfig, db: Arc<Database>) -> Self {
        let principal = Principal::new(&config.local.user_id, config.local.email.as_deref());
        let store: Arc<dyn BookmarkStoreTrait> = Arc::new(LocalBookmarkStore::new(db));
        let session: Arc<dyn SessionAccessorTrait> = Arc::new(FixedSession::new(Some(principal)));
        Self::with_backend(config, store, session)
    }

    /// Hosted backend through `client`.
    pub fn hosted(config: SmartMarkConfig, client: Arc<BackendClient>) -> Self {
        let auth = Arc::new(SupabaseAuth::new(client.clone(), config.auth.clone()));
        let realtime = RealtimeChannel::new(client.clone(), config.realtime.clone());
        let store: Arc<dyn BookmarkStoreTrait> = Arc::new(RemoteBookmarkStore::new(client, realtime));
        let session: Arc<dyn SessionAccessorTrait> = auth.clone();
        let mut app = Self::with_backend(config, store, session);
        app.auth = Some(auth);
        app
    }

    /// Any store and session; used by tests and embedders.
    pub fn with_backend(
        config: SmartMarkConfig,
        store: Arc<dyn BookmarkStoreTrait>,
        session: Arc<dyn SessionAccessorTrait>,
    ) -> Self {
        let controller = SyncController::new(store, session.clone());
        Self {
            config,
            controller,
            session,
            auth: None,
        }
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.config.backend.kind
    }

    /// Startup sequence: activate bookmark sync for the current principal.
    pub async fn startup(&self) {
        self.controller.activate().await;
    }

    /// Shutdown sequence: release the change subscription.
    pub fn shutdown(&self) {
        self.controller.deactivate();
    }

    pub async fn current_user(&self) -> Option<Principal> {
        self.session.current_user().await
    }

    /// OAuth sign-in URL. Only the hosted backend has one.
    pub fn sign_in_url(&self, origin: &str) -> Result<String, AuthError> {
        match &self.auth {
            Some(auth) => auth.sign_in_url(origin),
            None => Err(AuthError::Rejected(
                "sign-in requires the hosted backend".to_string(),
            )),
        }
    }

    /// Installs the token from the OAuth callback and restarts sync under
    /// the new principal.
    pub async fn set_access_token(&self, token: &str) -> Result<(), AuthError> {
        let auth = self.auth.as_ref().ok_or_else(|| {
            AuthError::Rejected("access tokens require the hosted backend".to_string())
        })?;
        auth.set_access_token(token);
        self.restart_sync().await;
        Ok(())
    }

    /// Signs out and restarts sync, which leaves the collection empty.
    /// The local session is cleared even if the remote sign-out failed.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let result = self.session.sign_out().await;
        self.restart_sync().await;
        result
    }

    async fn restart_sync(&self) {
        self.controller.deactivate();
        self.controller.activate().await;
    }
}
