//! Handle to the hosted backend service.
//!
//! Carries the project URL, the public API key and the current access token,
//! and knows how to address the REST, auth and realtime endpoints.

use std::sync::RwLock;
use std::time::Duration;

use reqwest::{Client, RequestBuilder, Url};
use zeroize::Zeroizing;

use crate::types::config::BackendConfig;
use crate::types::errors::ConfigError;

/// Realtime protocol version requested on connect.
pub const REALTIME_PROTOCOL_VERSION: &str = "1.0.0";

/// Configured client for the hosted table store, auth and realtime services.
pub struct BackendClient {
    http: Client,
    base_url: Url,
    anon_key: Zeroizing<String>,
    table: String,
    access_token: RwLock<Option<Zeroizing<String>>>,
}

impl BackendClient {
    /// Builds a client from configuration.
    ///
    /// # Errors
    /// `ConfigError::MissingValue` if the URL or key is empty,
    /// `ConfigError::InvalidValue` if the URL does not parse or the HTTP
    /// client cannot be built.
    pub fn new(config: &BackendConfig) -> Result<Self, ConfigError> {
        if config.url.trim().is_empty() {
            return Err(ConfigError::MissingValue("backend.url".to_string()));
        }
        if config.anon_key.trim().is_empty() {
            return Err(ConfigError::MissingValue("backend.anon_key".to_string()));
        }

        let base_url = Url::parse(config.url.trim().trim_end_matches('/'))
            .map_err(|e| ConfigError::InvalidValue(format!("backend.url: {}", e)))?;

        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs.max(1)))
            .build()
            .map_err(|e| ConfigError::InvalidValue(format!("http client: {}", e)))?;

        Ok(Self {
            http,
            base_url,
            anon_key: Zeroizing::new(config.anon_key.trim().to_string()),
            table: config.table.clone(),
            access_token: RwLock::new(None),
        })
    }

    pub fn http(&self) -> &Client {
        &self.http
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn anon_key(&self) -> &str {
        &self.anon_key
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.as_str().trim_end_matches('/'), path)
    }

    /// `{base}/rest/v1/{table}`
    pub fn rest_url(&self, table: &str) -> String {
        self.endpoint(&format!("rest/v1/{}", table))
    }

    /// `{base}/auth/v1/{path}`
    pub fn auth_url(&self, path: &str) -> String {
        self.endpoint(&format!("auth/v1/{}", path.trim_start_matches('/')))
    }

    /// Websocket endpoint of the realtime service.
    pub fn realtime_url(&self) -> String {
        let mut url = self.base_url.clone();
        let scheme = if url.scheme() == "http" { "ws" } else { "wss" };
        let _ = url.set_scheme(scheme);
        let base = url.as_str().trim_end_matches('/').to_string();
        format!(
            "{}/realtime/v1/websocket?apikey={}&vsn={}",
            base,
            self.anon_key.as_str(),
            REALTIME_PROTOCOL_VERSION
        )
    }

    /// Installs the access token obtained from the OAuth callback.
    pub fn set_access_token(&self, token: &str) {
        if let Ok(mut slot) = self.access_token.write() {
            *slot = Some(Zeroizing::new(token.to_string()));
        }
    }

    /// Drops (and wipes) the current access token.
    pub fn clear_access_token(&self) {
        if let Ok(mut slot) = self.access_token.write() {
            *slot = None;
        }
    }

    pub fn access_token(&self) -> Option<Zeroizing<String>> {
        self.access_token.read().ok().and_then(|t| t.clone())
    }

    /// Adds the API key and bearer token headers. Without an access token
    /// the anon key doubles as bearer, as the hosted service expects.
    pub fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        let bearer = self
            .access_token()
            .unwrap_or_else(|| self.anon_key.clone());
        builder
            .header("apikey", self.anon_key.as_str())
            .header("Authorization", format!("Bearer {}", bearer.as_str()))
    }
}
