//! # ChatAI Client
//!
//! View router, auth form and chat handoff for the ChatAI client.
//!
//! The application is one [`AppReducer`] composed from three features that
//! share the [`chatai_auth::AuthContext`] as their environment:
//!
//! - **Auth**: session listener ([`chatai_auth::AuthReducer`])
//! - **Router**: `landing | auth | chat`, driven by user presence
//!   ([`router::RouterReducer`])
//! - **Form**: validation, submits and notifications ([`form::FormReducer`])
//!
//! ```rust,ignore
//! let store = Store::new(AppState::default(), AppReducer::new(), context);
//! store.send(AppAction::Auth(AuthAction::Mount)).await?;
//! match store.state(AppState::screen).await {
//!     Screen::Chat(identity) => connect_chat(identity),
//!     _ => {},
//! }
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]

pub mod app;
pub mod form;
pub mod identity;
pub mod notification;
pub mod router;

pub use app::{AppAction, AppReducer, AppState, Screen};
pub use form::{AuthFormState, AuthTab, FormAction, FormReducer};
pub use identity::ChatIdentity;
pub use notification::{Notification, NotificationQueue, NotificationVariant};
pub use router::{RouterAction, RouterReducer, RouterState, ViewState};
