//! Provider traits and implementations.
//!
//! The auth context talks to the identity provider only through
//! [`SessionProvider`]. Implementations:
//!
//! - [`GoTrueProvider`]: HTTP client for GoTrue-compatible servers
//! - `MockSessionProvider` (`mocks` module): in-memory fake for tests

pub mod gotrue;
pub mod session;

pub use gotrue::GoTrueProvider;
pub use session::{SessionBroadcaster, SessionProvider, SessionSubscription};
