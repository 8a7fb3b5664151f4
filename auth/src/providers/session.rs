//! Session provider trait and scoped subscriptions.

use crate::error::ProviderError;
use crate::state::{Session, SessionEvent, UserMetadata};
use futures::Stream;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::task::{Context, Poll};
use tokio::sync::mpsc;

/// Session provider.
///
/// This trait abstracts over the identity provider's client library: it owns
/// credential storage, token refresh and change notification. The auth
/// context is the only caller.
///
/// # Implementation Notes
///
/// - Rejections (bad credentials, duplicate account) are
///   [`ProviderError::Rejected`] with the provider's message
/// - Every change to the current session is announced to all live
///   subscriptions, in order
/// - `sign_out` announces `SignedOut` even when the remote call fails
pub trait SessionProvider: Send + Sync {
    /// Prepare the provider (restore state, warm connections).
    ///
    /// # Errors
    ///
    /// Returns error if the provider cannot be used.
    fn init(&self) -> impl Future<Output = Result<(), ProviderError>> + Send;

    /// Release provider resources and close all subscriptions.
    fn dispose(&self) -> impl Future<Output = ()> + Send;

    /// Get the current session, if any.
    ///
    /// # Errors
    ///
    /// Returns error if the session cannot be determined.
    fn current_session(
        &self,
    ) -> impl Future<Output = Result<Option<Session>, ProviderError>> + Send;

    /// Subscribe to session change notifications.
    ///
    /// Notifications emitted after this call are buffered in the returned
    /// subscription. Dropping it unsubscribes.
    fn subscribe(&self) -> SessionSubscription;

    /// Register a new account.
    ///
    /// # Errors
    ///
    /// Returns error if the provider rejects the registration or the request fails.
    fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: UserMetadata,
    ) -> impl Future<Output = Result<(), ProviderError>> + Send;

    /// Authenticate with email and password.
    ///
    /// # Errors
    ///
    /// Returns error if the credentials are rejected or the request fails.
    fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<(), ProviderError>> + Send;

    /// End the current session.
    ///
    /// # Errors
    ///
    /// Returns error if the remote call fails. The local session is cleared regardless.
    fn sign_out(&self) -> impl Future<Output = Result<(), ProviderError>> + Send;

    /// Send a password reset email linking back to `redirect_to`.
    ///
    /// # Errors
    ///
    /// Returns error if the provider rejects the request or it fails.
    fn send_password_reset(
        &self,
        email: &str,
        redirect_to: &str,
    ) -> impl Future<Output = Result<(), ProviderError>> + Send;
}

#[derive(Default)]
struct Subscribers {
    next_id: u64,
    senders: HashMap<u64, mpsc::UnboundedSender<SessionEvent>>,
}

/// Fan-out of session change notifications to subscriptions.
///
/// Shared by provider implementations. Cloning shares the subscriber set.
#[derive(Clone, Default)]
pub struct SessionBroadcaster {
    subscribers: Arc<Mutex<Subscribers>>,
}

impl SessionBroadcaster {
    /// Create an empty broadcaster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new subscription.
    #[must_use]
    pub fn subscribe(&self) -> SessionSubscription {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let id = subscribers.next_id;
        subscribers.next_id += 1;
        subscribers.senders.insert(id, sender);

        SessionSubscription {
            id,
            receiver,
            subscribers: Arc::downgrade(&self.subscribers),
        }
    }

    /// Deliver `event` to every live subscription.
    pub fn emit(&self, event: &SessionEvent) {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers
            .senders
            .retain(|_, sender| sender.send(event.clone()).is_ok());
        tracing::debug!(
            kind = ?event.kind,
            signed_in = event.session.is_some(),
            subscribers = subscribers.senders.len(),
            "Session change emitted"
        );
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .senders
            .len()
    }

    /// End every subscription. Their streams finish after buffered items.
    pub fn close_all(&self) {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .senders
            .clear();
    }
}

/// Scoped subscription to session change notifications.
///
/// A [`Stream`] of [`SessionEvent`]s in delivery order. Dropping the
/// subscription unsubscribes, so releasing it on every exit path is the
/// owner's scope ending.
pub struct SessionSubscription {
    id: u64,
    receiver: mpsc::UnboundedReceiver<SessionEvent>,
    subscribers: Weak<Mutex<Subscribers>>,
}

impl SessionSubscription {
    /// Stop receiving notifications. Equivalent to dropping.
    pub fn unsubscribe(self) {}
}

impl Stream for SessionSubscription {
    type Item = SessionEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<SessionEvent>> {
        self.get_mut().receiver.poll_recv(cx)
    }
}

impl Drop for SessionSubscription {
    fn drop(&mut self) {
        if let Some(subscribers) = self.subscribers.upgrade() {
            subscribers
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .senders
                .remove(&self.id);
            tracing::debug!(subscription = self.id, "Session subscription released");
        }
    }
}

impl std::fmt::Debug for SessionSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionSubscription")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}
