//! Hosted authentication for SmartMark.
//!
//! Resolves the signed-in principal from the access token held by the
//! [`BackendClient`], builds the OAuth sign-in URL, and signs out.

use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::Utc;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::managers::session_accessor::SessionAccessorTrait;
use crate::services::backend_client::BackendClient;
use crate::types::config::AuthConfig;
use crate::types::errors::AuthError;
use crate::types::principal::Principal;

/// Claims read from the access token without verifying it. Used only to
/// skip a round trip for tokens that have visibly expired.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TokenClaims {
    pub sub: String,
    #[serde(default)]
    pub exp: Option<i64>,
    #[serde(default)]
    pub email: Option<String>,
}

impl TokenClaims {
    pub fn is_expired(&self, now_secs: i64) -> bool {
        self.exp.is_some_and(|exp| exp <= now_secs)
    }
}

/// Decodes the payload segment of a JWT. Returns `None` for anything that
/// is not a three-part token with a JSON payload.
pub fn decode_claims(token: &str) -> Option<TokenClaims> {
    let mut parts = token.split('.');
    let (_header, payload, _signature) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    serde_json::from_slice(&bytes).ok()
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

/// Session accessor backed by the hosted auth service.
pub struct SupabaseAuth {
    client: Arc<BackendClient>,
    config: AuthConfig,
}

impl SupabaseAuth {
    pub fn new(client: Arc<BackendClient>, config: AuthConfig) -> Self {
        Self { client, config }
    }

    /// URL that starts the OAuth flow; the provider redirects back to
    /// `origin` + the configured callback path.
    pub fn sign_in_url(&self, origin: &str) -> Result<String, AuthError> {
        let redirect_to = format!(
            "{}{}",
            origin.trim_end_matches('/'),
            self.config.callback_path
        );
        let mut url = Url::parse(&self.client.auth_url("authorize"))
            .map_err(|e| AuthError::Rejected(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("provider", &self.config.provider)
            .append_pair("redirect_to", &redirect_to);
        Ok(url.to_string())
    }

    /// Installs the access token delivered to the callback.
    pub fn set_access_token(&self, token: &str) {
        self.client.set_access_token(token);
    }
}

#[async_trait]
impl SessionAccessorTrait for SupabaseAuth {
    async fn current_user(&self) -> Option<Principal> {
        let token = self.client.access_token()?;

        if let Some(claims) = decode_claims(&token) {
            if claims.is_expired(Utc::now().timestamp()) {
                debug!(sub = %claims.sub, "access token expired");
                return None;
            }
        }

        let request = self.client.authorize(self.client.http().get(self.client.auth_url("user")));
        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "could not reach auth service");
                return None;
            }
        };

        match response.status() {
            s if s.is_success() => match response.json::<UserResponse>().await {
                Ok(user) => Some(Principal {
                    id: user.id,
                    email: user.email,
                }),
                Err(e) => {
                    warn!(error = %e, "unreadable user response");
                    None
                }
            },
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => None,
            status => {
                warn!(%status, "auth service refused user lookup");
                None
            }
        }
    }

    /// Revokes the session remotely when possible; the local token is wiped
    /// either way.
    async fn sign_out(&self) -> Result<(), AuthError> {
        let result = if self.client.access_token().is_some() {
            let request = self
                .client
                .authorize(self.client.http().post(self.client.auth_url("logout")));
            match request.send().await {
                Ok(r) if r.status().is_success() => Ok(()),
                Ok(r) => Err(AuthError::Rejected(format!("logout returned {}", r.status()))),
                Err(e) => Err(AuthError::Network(e.to_string())),
            }
        } else {
            Ok(())
        };
        self.client.clear_access_token();
        if let Err(e) = &result {
            warn!(error = %e, "remote sign-out failed, local session cleared");
        }
        result
    }
}
