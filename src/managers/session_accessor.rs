//! Session accessor contract and the fixed local session.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::types::errors::AuthError;
use crate::types::principal::Principal;

/// Resolves the currently authenticated principal on demand.
///
/// Implementations may perform a round trip on every call. `None` means
/// "not signed in" and is never an error.
#[async_trait]
pub trait SessionAccessorTrait: Send + Sync {
    async fn current_user(&self) -> Option<Principal>;
    async fn sign_out(&self) -> Result<(), AuthError>;
}

/// A session whose principal is set directly, used with the local backend.
#[derive(Debug, Default)]
pub struct FixedSession {
    principal: Mutex<Option<Principal>>,
}

impl FixedSession {
    pub fn new(principal: Option<Principal>) -> Self {
        Self {
            principal: Mutex::new(principal),
        }
    }

    pub fn signed_in(id: &str) -> Self {
        Self::new(Some(Principal::new(id, None)))
    }

    pub fn sign_in(&self, principal: Principal) {
        if let Ok(mut current) = self.principal.lock() {
            *current = Some(principal);
        }
    }
}

#[async_trait]
impl SessionAccessorTrait for FixedSession {
    async fn current_user(&self) -> Option<Principal> {
        self.principal.lock().ok().and_then(|p| p.clone())
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        if let Ok(mut current) = self.principal.lock() {
            *current = None;
        }
        Ok(())
    }
}
