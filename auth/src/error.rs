//! Error types for authentication operations.
//!
//! Every failure an auth operation can produce is a value of [`AuthError`];
//! its `Display` output is the message shown to the user. Nothing the
//! provider does (rejection, transport failure, panic) escapes the auth
//! context as anything else.

use crate::constants::messages;
use std::fmt;
use thiserror::Error;

/// Outcome of sign-up, sign-in and password reset.
///
/// `Ok(())` is success; the error carries the user-facing message.
pub type AuthResult = std::result::Result<(), AuthError>;

/// Operation an unexpected failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Account registration.
    SignUp,
    /// Password sign-in.
    SignIn,
    /// Session termination.
    SignOut,
    /// Password reset email.
    ResetPassword,
    /// One-shot current session lookup.
    SessionFetch,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SignUp => "sign up",
            Self::SignIn => "sign in",
            Self::SignOut => "sign out",
            Self::ResetPassword => "password reset",
            Self::SessionFetch => "session fetch",
        })
    }
}

/// Error taxonomy for authentication.
///
/// Configuration and validation errors are detected before any provider
/// call is made.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    // ═══════════════════════════════════════════════════════════
    // Detected locally
    // ═══════════════════════════════════════════════════════════

    /// The session provider is not configured. Permanent for the process.
    #[error("{}", messages::NOT_CONFIGURED)]
    Configuration,

    /// A form constraint was violated.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    // ═══════════════════════════════════════════════════════════
    // Reported by the provider
    // ═══════════════════════════════════════════════════════════

    /// The provider rejected the request; the message is passed through verbatim.
    #[error("{0}")]
    Provider(String),

    /// Transport failure or exception during the provider call.
    #[error("An unexpected error occurred during {operation}.")]
    Unexpected {
        /// Operation that failed
        operation: Operation,
    },
}

impl AuthError {
    /// `true` for errors detected before the provider was contacted.
    #[must_use]
    pub const fn is_local(&self) -> bool {
        matches!(self, Self::Configuration | Self::Validation(_))
    }
}

/// Client-side form constraint violations.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is empty.
    #[error("{}", messages::FILL_ALL_FIELDS)]
    MissingFields,

    /// Password and confirmation differ.
    #[error("{}", messages::PASSWORDS_DO_NOT_MATCH)]
    PasswordMismatch,

    /// Password is shorter than the minimum length.
    #[error("{}", messages::PASSWORD_TOO_SHORT)]
    PasswordTooShort,

    /// Password reset requested without an email.
    #[error("{}", messages::EMAIL_REQUIRED)]
    MissingEmail,
}

/// Failure reported by a session provider implementation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The provider refused the request (bad credentials, duplicate account).
    #[error("{message}")]
    Rejected {
        /// Provider message, shown to the user as-is
        message: String,
    },

    /// The request did not complete.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The provider answered with something that could not be decoded.
    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Create a rejection carrying the provider's message.
    #[must_use]
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }

    /// Normalize into the user-facing taxonomy.
    ///
    /// Rejections keep their message; everything else becomes
    /// [`AuthError::Unexpected`] for `operation`.
    #[must_use]
    pub fn into_auth_error(self, operation: Operation) -> AuthError {
        match self {
            Self::Rejected { message } => AuthError::Provider(message),
            Self::Transport(_) | Self::InvalidResponse(_) => AuthError::Unexpected { operation },
        }
    }
}

/// The `{error}` view of an operation outcome: `None` on success.
#[must_use]
pub fn auth_error_message(result: &AuthResult) -> Option<String> {
    result.as_ref().err().map(ToString::to_string)
}
