//! Session Provider.
//!
//! Holds the current identity (or none) and notifies subscribers when it
//! changes. The cart and favorites containers subscribe through
//! [`crate::state::AppState::spawn_session_listener`] and re-run their
//! `load()` on every change, plus the one-shot reconciliation on the
//! anonymous-to-authenticated edge.
//!
//! Authentication internals are delegated to the hosted backend; this type
//! only carries the resulting identity.

use std::sync::Arc;

use tokio::sync::watch;

use keyiflibox_core::OwnerId;

use crate::models::CurrentUser;

/// The current session identity, shared across the application.
#[derive(Clone)]
pub struct SessionProvider {
    tx: Arc<watch::Sender<Option<CurrentUser>>>,
}

impl SessionProvider {
    /// Create a provider starting in the anonymous state.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// The current identity, if signed in.
    #[must_use]
    pub fn current(&self) -> Option<CurrentUser> {
        self.tx.borrow().clone()
    }

    /// The owner identity for store operations: the signed-in identity, or
    /// the anonymous sentinel.
    #[must_use]
    pub fn owner(&self) -> OwnerId {
        self.current()
            .map_or_else(OwnerId::anonymous, |user| user.owner)
    }

    /// Establish an authenticated identity.
    pub fn sign_in(&self, user: CurrentUser) {
        self.tx.send_replace(Some(user));
    }

    /// Return to the anonymous state.
    pub fn sign_out(&self) {
        self.tx.send_replace(None);
    }

    /// Subscribe to identity changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<CurrentUser>> {
        self.tx.subscribe()
    }
}

impl Default for SessionProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use keyiflibox_core::Email;

    #[test]
    fn test_starts_anonymous() {
        let session = SessionProvider::new();
        assert!(session.current().is_none());
        assert!(session.owner().is_anonymous());
    }

    #[test]
    fn test_sign_in_and_out() {
        let session = SessionProvider::new();
        let email = Email::parse("ayse@example.com").unwrap();
        session.sign_in(CurrentUser::from_email(email));

        assert_eq!(session.owner().as_str(), "ayse@example.com");

        session.sign_out();
        assert!(session.owner().is_anonymous());
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let session = SessionProvider::new();
        let mut rx = session.subscribe();

        let email = Email::parse("ayse@example.com").unwrap();
        session.sign_in(CurrentUser::from_email(email));

        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_some());
    }
}
