//! Mock session provider for testing.

use crate::error::ProviderError;
use crate::providers::{SessionBroadcaster, SessionProvider, SessionSubscription};
use crate::state::{ProviderUser, Session, SessionEvent, SessionEventKind, UserMetadata};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

/// Provider method, for scripting and call counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockMethod {
    /// [`SessionProvider::init`]
    Init,
    /// [`SessionProvider::current_session`]
    CurrentSession,
    /// [`SessionProvider::sign_up`]
    SignUp,
    /// [`SessionProvider::sign_in_with_password`]
    SignIn,
    /// [`SessionProvider::sign_out`]
    SignOut,
    /// [`SessionProvider::send_password_reset`]
    PasswordReset,
}

/// Scripted outcome of a provider method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockBehavior {
    /// Succeed (the default).
    Succeed,
    /// Fail with [`ProviderError::Rejected`] carrying this message.
    Reject(String),
    /// Fail with [`ProviderError::Transport`].
    TransportFailure,
    /// Panic inside the returned future.
    Panic,
}

/// A recorded provider call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCall {
    /// `init()`
    Init,
    /// `dispose()`
    Dispose,
    /// `current_session()`
    CurrentSession,
    /// `sign_up(email, _, metadata)`
    SignUp {
        /// Email
        email: String,
        /// Attached profile metadata
        metadata: UserMetadata,
    },
    /// `sign_in_with_password(email, _)`
    SignIn {
        /// Email
        email: String,
    },
    /// `sign_out()`
    SignOut,
    /// `send_password_reset(email, redirect_to)`
    PasswordReset {
        /// Email
        email: String,
        /// Redirect target
        redirect_to: String,
    },
}

#[derive(Default)]
struct MockInner {
    session: Option<Session>,
    behaviors: HashMap<MockMethod, MockBehavior>,
    calls: Vec<ProviderCall>,
    confirm_on_sign_up: bool,
}

/// Mock session provider.
///
/// In-memory provider with scripted failures and call recording:
///
/// - `sign_in_with_password` succeeds for any credentials, stores a session
///   for the email and announces `SignedIn`
/// - `sign_up` succeeds without a session (email confirmation pending)
///   unless [`MockSessionProvider::confirm_on_sign_up`] is set
/// - `sign_out` clears the session and announces `SignedOut` on success; a
///   scripted failure leaves the session and announces nothing
/// - [`MockSessionProvider::emit`] announces arbitrary notifications
///
/// Passwords are never recorded.
#[derive(Clone, Default)]
pub struct MockSessionProvider {
    inner: Arc<Mutex<MockInner>>,
    events: SessionBroadcaster,
}

impl MockSessionProvider {
    /// Create a provider with no session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a provider that already has `session`.
    #[must_use]
    pub fn with_session(session: Session) -> Self {
        let provider = Self::new();
        provider.lock().session = Some(session);
        provider
    }

    /// Script the outcome of `method` for all following calls.
    pub fn set_behavior(&self, method: MockMethod, behavior: MockBehavior) {
        self.lock().behaviors.insert(method, behavior);
    }

    /// Sign the user in immediately on sign-up (no email confirmation).
    pub fn confirm_on_sign_up(&self) {
        self.lock().confirm_on_sign_up = true;
    }

    /// Replace the session and announce it to all subscriptions.
    pub fn emit(&self, event: SessionEvent) {
        self.lock().session.clone_from(&event.session);
        self.events.emit(&event);
    }

    /// Recorded calls, oldest first.
    #[must_use]
    pub fn calls(&self) -> Vec<ProviderCall> {
        self.lock().calls.clone()
    }

    /// Number of recorded calls to `method`.
    #[must_use]
    pub fn call_count(&self, method: MockMethod) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| call.method() == Some(method))
            .count()
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.events.subscriber_count()
    }

    /// The session the provider currently holds.
    #[must_use]
    pub fn session(&self) -> Option<Session> {
        self.lock().session.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record `call` and return the scripted behavior for it.
    fn record(&self, call: ProviderCall) -> MockBehavior {
        let mut inner = self.lock();
        let behavior = call
            .method()
            .and_then(|method| inner.behaviors.get(&method).cloned())
            .unwrap_or(MockBehavior::Succeed);
        inner.calls.push(call);
        behavior
    }

    fn replace_session(&self, session: Option<Session>, kind: SessionEventKind) {
        self.emit(SessionEvent::new(kind, session));
    }
}

impl ProviderCall {
    const fn method(&self) -> Option<MockMethod> {
        match self {
            Self::Init => Some(MockMethod::Init),
            Self::Dispose => None,
            Self::CurrentSession => Some(MockMethod::CurrentSession),
            Self::SignUp { .. } => Some(MockMethod::SignUp),
            Self::SignIn { .. } => Some(MockMethod::SignIn),
            Self::SignOut => Some(MockMethod::SignOut),
            Self::PasswordReset { .. } => Some(MockMethod::PasswordReset),
        }
    }
}

/// Resolve a scripted failure, or `None` to proceed with success.
#[allow(clippy::panic)] // Scripted panics exercise the caller's unwind handling
fn scripted(behavior: MockBehavior) -> Option<ProviderError> {
    match behavior {
        MockBehavior::Succeed => None,
        MockBehavior::Reject(message) => Some(ProviderError::rejected(message)),
        MockBehavior::TransportFailure => {
            Some(ProviderError::Transport("connection refused".to_string()))
        },
        MockBehavior::Panic => panic!("scripted provider panic"),
    }
}

/// Session the mock issues for `email`.
#[must_use]
pub fn mock_session(email: &str, metadata: UserMetadata) -> Session {
    Session {
        access_token: format!("access-{email}"),
        refresh_token: format!("refresh-{email}"),
        expires_at: None,
        user: ProviderUser {
            id: format!("user-{email}"),
            email: Some(email.to_string()),
            user_metadata: metadata,
        },
    }
}

impl SessionProvider for MockSessionProvider {
    fn init(&self) -> impl Future<Output = Result<(), ProviderError>> + Send {
        let behavior = self.record(ProviderCall::Init);
        async move { scripted(behavior).map_or(Ok(()), Err) }
    }

    fn dispose(&self) -> impl Future<Output = ()> + Send {
        self.record(ProviderCall::Dispose);
        let events = self.events.clone();
        async move { events.close_all() }
    }

    fn current_session(
        &self,
    ) -> impl Future<Output = Result<Option<Session>, ProviderError>> + Send {
        let behavior = self.record(ProviderCall::CurrentSession);
        let provider = self.clone();
        async move {
            if let Some(error) = scripted(behavior) {
                return Err(error);
            }
            Ok(provider.session())
        }
    }

    fn subscribe(&self) -> SessionSubscription {
        self.events.subscribe()
    }

    fn sign_up(
        &self,
        email: &str,
        _password: &str,
        metadata: UserMetadata,
    ) -> impl Future<Output = Result<(), ProviderError>> + Send {
        let behavior = self.record(ProviderCall::SignUp {
            email: email.to_string(),
            metadata: metadata.clone(),
        });
        let provider = self.clone();
        let email = email.to_string();
        async move {
            if let Some(error) = scripted(behavior) {
                return Err(error);
            }
            if provider.lock().confirm_on_sign_up {
                provider.replace_session(
                    Some(mock_session(&email, metadata)),
                    SessionEventKind::SignedIn,
                );
            }
            Ok(())
        }
    }

    fn sign_in_with_password(
        &self,
        email: &str,
        _password: &str,
    ) -> impl Future<Output = Result<(), ProviderError>> + Send {
        let behavior = self.record(ProviderCall::SignIn {
            email: email.to_string(),
        });
        let provider = self.clone();
        let email = email.to_string();
        async move {
            if let Some(error) = scripted(behavior) {
                return Err(error);
            }
            provider.replace_session(
                Some(mock_session(&email, UserMetadata::default())),
                SessionEventKind::SignedIn,
            );
            Ok(())
        }
    }

    fn sign_out(&self) -> impl Future<Output = Result<(), ProviderError>> + Send {
        let behavior = self.record(ProviderCall::SignOut);
        let provider = self.clone();
        async move {
            if let Some(error) = scripted(behavior) {
                return Err(error);
            }
            provider.replace_session(None, SessionEventKind::SignedOut);
            Ok(())
        }
    }

    fn send_password_reset(
        &self,
        email: &str,
        redirect_to: &str,
    ) -> impl Future<Output = Result<(), ProviderError>> + Send {
        let behavior = self.record(ProviderCall::PasswordReset {
            email: email.to_string(),
            redirect_to: redirect_to.to_string(),
        });
        async move { scripted(behavior).map_or(Ok(()), Err) }
    }
}
