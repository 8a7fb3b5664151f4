//! Authentication state types.
//!
//! [`Session`] is owned by the provider and only observed here. [`LocalUser`]
//! is a pure projection of it, recomputed on every observed session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Profile metadata stored with the provider account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMetadata {
    /// Display name entered at sign-up.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,

    /// Avatar image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// User identity embedded in a provider session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderUser {
    /// Provider user id.
    pub id: String,

    /// Account email. Phone-only accounts have none.
    #[serde(default)]
    pub email: Option<String>,

    /// Profile metadata.
    #[serde(default)]
    pub user_metadata: UserMetadata,
}

/// Opaque credential bundle owned by the session provider.
///
/// The client never inspects the tokens; it only observes presence and the
/// embedded user.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Bearer token.
    pub access_token: String,

    /// Refresh token (refresh is the provider's job).
    #[serde(default)]
    pub refresh_token: String,

    /// Expiry, when the provider reported one.
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub expires_at: Option<DateTime<Utc>>,

    /// The signed-in user.
    pub user: ProviderUser,
}

impl Session {
    /// `true` once the reported expiry has passed.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("user", &self.user.id)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Kind of a session change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionEventKind {
    /// First notification after subscribing.
    InitialSession,
    /// A user signed in.
    SignedIn,
    /// The session ended.
    SignedOut,
    /// Tokens were refreshed.
    TokenRefreshed,
    /// Profile data changed.
    UserUpdated,
    /// The user followed a password recovery link.
    PasswordRecovery,
}

/// Session change notification delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEvent {
    /// What happened. Informational only.
    pub kind: SessionEventKind,

    /// The session after the change, if any.
    pub session: Option<Session>,
}

impl SessionEvent {
    /// Create a notification.
    #[must_use]
    pub const fn new(kind: SessionEventKind, session: Option<Session>) -> Self {
        Self { kind, session }
    }
}

/// Placeholder avatar URL for `email` at the given avatar service.
#[must_use]
pub fn placeholder_avatar(base_url: &str, email: &str) -> String {
    format!("{base_url}?seed={}", urlencoding::encode(email))
}

/// Local user projected from a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalUser {
    /// Provider user id.
    pub id: String,

    /// Account email (empty if the provider has none).
    pub email: String,

    /// Display name; empty string when the account has none.
    pub full_name: Option<String>,

    /// Avatar URL; the placeholder for `email` when the account has none.
    pub avatar_url: Option<String>,
}

impl LocalUser {
    /// Project `session` onto a local user.
    ///
    /// Missing or empty `full_name` becomes `""`; missing or empty
    /// `avatar_url` becomes the placeholder avatar keyed by email.
    #[must_use]
    pub fn from_session(session: &Session, avatar_base_url: &str) -> Self {
        let user = &session.user;
        let email = user.email.clone().unwrap_or_default();
        let metadata = &user.user_metadata;

        let full_name = metadata
            .full_name
            .clone()
            .filter(|name| !name.is_empty())
            .unwrap_or_default();
        let avatar_url = metadata
            .avatar_url
            .clone()
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| placeholder_avatar(avatar_base_url, &email));

        Self {
            id: user.id.clone(),
            email,
            full_name: Some(full_name),
            avatar_url: Some(avatar_url),
        }
    }
}

/// Auth context state.
///
/// `loading` starts `true` and becomes `false` once the initial session
/// fetch resolves or the first change notification arrives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthState {
    /// Current local user.
    pub user: Option<LocalUser>,

    /// Current provider session.
    pub session: Option<Session>,

    /// `true` until the session state is known.
    pub loading: bool,

    /// `true` between mount and unmount.
    pub mounted: bool,

    /// Change notifications applied since mount.
    pub events_applied: u64,
}

impl AuthState {
    /// `true` when a user is signed in.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Replace session and user with the projection of `session`.
    ///
    /// Last write wins; nothing is merged with the previous state.
    pub fn apply_session(&mut self, session: Option<Session>, avatar_base_url: &str) {
        self.user = session
            .as_ref()
            .map(|session| LocalUser::from_session(session, avatar_base_url));
        self.session = session;
        self.loading = false;
    }
}

impl Default for AuthState {
    fn default() -> Self {
        Self {
            user: None,
            session: None,
            loading: true,
            mounted: false,
            events_applied: 0,
        }
    }
}
