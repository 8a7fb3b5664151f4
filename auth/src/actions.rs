//! Authentication actions.
//!
//! Inputs to the session listener: lifecycle commands from the application
//! and the results the provider delivers back.

use crate::error::AuthError;
use crate::state::{Session, SessionEvent};

/// Auth context action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthAction {
    // ═══════════════════════════════════════════════════════════
    // Lifecycle
    // ═══════════════════════════════════════════════════════════

    /// Start the context: fetch the current session and subscribe to changes.
    Mount,

    /// Tear the context down, releasing the subscription.
    Unmount,

    // ═══════════════════════════════════════════════════════════
    // Provider results
    // ═══════════════════════════════════════════════════════════

    /// The one-shot current session fetch resolved.
    SessionLoaded {
        /// Session found, or why the fetch failed
        result: Result<Option<Session>, AuthError>,
    },

    /// The provider announced a session change.
    SessionChanged {
        /// The notification
        event: SessionEvent,
    },
}
