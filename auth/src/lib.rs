//! # ChatAI Authentication
//!
//! Session state for the ChatAI client: who is logged in, and the only
//! gateway to the identity provider.
//!
//! ## Features
//!
//! - **Injectable provider**: [`SessionProvider`] with an HTTP implementation
//!   ([`providers::GoTrueProvider`]) and an in-memory fake (`mocks`)
//! - **Scoped subscriptions**: dropping a [`SessionSubscription`] unsubscribes
//! - **Errors as values**: every operation returns an [`AuthResult`];
//!   provider panics are caught at the context boundary
//! - **Disabled mode**: without configuration every operation reports
//!   [`AuthError::Configuration`] and no network call is made
//!
//! ## Architecture
//!
//! The session listener is a reducer whose environment is the [`AuthContext`]:
//!
//! ```text
//! Mount → (fetch current session ∥ subscribe) → SessionLoaded / SessionChanged → AuthState
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use chatai_auth::*;
//!
//! let context = AuthContext::new(provider, AuthSettings::default());
//! let store = Store::new(AuthState::default(), AuthReducer::new(), context);
//!
//! store.send(AuthAction::Mount).await?;
//! // ... provider announces SignedIn ...
//! assert!(store.state(|s| s.is_authenticated()).await);
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]

// Public modules
pub mod actions;
pub mod config;
pub mod constants;
pub mod context;
pub mod error;
pub mod providers;
pub mod reducers;
pub mod state;

// Mock providers for testing
#[cfg(feature = "test-utils")]
pub mod mocks;

// Re-export main types for convenience
pub use actions::AuthAction;
pub use config::{AuthSettings, ConfigError, ProviderConfig};
pub use context::AuthContext;
pub use error::{auth_error_message, AuthError, AuthResult, Operation, ProviderError, ValidationError};
pub use providers::{SessionProvider, SessionSubscription};
pub use reducers::{AuthReducer, SESSION_FETCH, SESSION_LISTENER};
pub use state::{
    placeholder_avatar, AuthState, LocalUser, ProviderUser, Session, SessionEvent,
    SessionEventKind, UserMetadata,
};
