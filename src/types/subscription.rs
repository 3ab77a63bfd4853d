use std::fmt;
use std::sync::Arc;

/// Callback invoked on every change notification. Carries no payload.
pub type ChangeCallback = Arc<dyn Fn() + Send + Sync>;

/// Handle to an active change subscription.
///
/// The subscription is released by `unsubscribe()` or when the handle is
/// dropped, whichever comes first. Releasing more than once is a no-op.
pub struct Subscription {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Creates a subscription that runs `release` exactly once when released.
    pub fn new<F>(release: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// Returns true until the subscription has been released.
    pub fn is_active(&self) -> bool {
        self.release.is_some()
    }

    pub fn unsubscribe(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}
