//! Authentication configuration.
//!
//! Two layers:
//!
//! - [`ProviderConfig`]: the provider endpoint and public API key. Their joint
//!   presence in the environment decides whether authentication is enabled.
//! - [`AuthSettings`]: application values the auth context needs (origin for
//!   the password reset redirect, placeholder avatar service).
//!
//! Configuration values are provided by the application, not hardcoded.

use crate::constants::{
    ANON_KEY_VARIABLES, DEFAULT_AVATAR_BASE_URL, DEFAULT_ORIGIN, DEFAULT_RESET_PATH,
    ORIGIN_VARIABLE, URL_VARIABLES,
};
use crate::state::placeholder_avatar;
use reqwest::Url;
use std::fmt;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A configured URL could not be parsed or is not http(s).
    #[error("Invalid {name} URL `{value}`: {reason}")]
    InvalidUrl {
        /// Which setting was invalid
        name: &'static str,
        /// The rejected value
        value: String,
        /// Parser message
        reason: String,
    },
}

fn validate_url(name: &'static str, value: &str) -> Result<(), ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidUrl {
        name,
        value: value.to_string(),
        reason,
    };
    let url = Url::parse(value).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(invalid(format!("unsupported scheme `{other}`"))),
    }
}

/// Session provider endpoint configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Service endpoint, without trailing slash (e.g. `https://xyz.supabase.co`).
    pub url: String,

    /// Public (anon) API key sent with every request.
    pub anon_key: String,
}

impl ProviderConfig {
    /// Create a provider configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidUrl`] if `url` is not an http(s) URL.
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Result<Self, ConfigError> {
        let url = url.into();
        validate_url("provider", &url)?;
        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
        })
    }

    /// Load from the process environment.
    ///
    /// See [`ProviderConfig::from_lookup`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidUrl`] if the configured endpoint is malformed.
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load using `lookup` as the environment.
    ///
    /// Each value is taken from the first variable in
    /// [`URL_VARIABLES`] / [`ANON_KEY_VARIABLES`] that is set and non-empty.
    /// Returns `Ok(None)` (provider disabled) unless both are present.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidUrl`] if the configured endpoint is malformed.
    pub fn from_lookup<F>(lookup: F) -> Result<Option<Self>, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let first = |names: &[&str]| {
            names
                .iter()
                .filter_map(|name| lookup(name))
                .find(|value| !value.trim().is_empty())
        };

        match (first(&URL_VARIABLES), first(&ANON_KEY_VARIABLES)) {
            (Some(url), Some(anon_key)) => Self::new(url.trim(), anon_key.trim()).map(Some),
            _ => Ok(None),
        }
    }

    /// Absolute URL of a provider endpoint path (e.g. `/auth/v1/signup`).
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.url)
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("url", &self.url)
            .field("anon_key", &"<redacted>")
            .finish()
    }
}

/// Application settings used by the auth context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSettings {
    /// Application origin (e.g. `https://chat.example.com`).
    ///
    /// Default: `http://localhost:3000`
    pub origin: String,

    /// Path appended to the origin for the password reset redirect.
    ///
    /// Default: `/reset-password`
    pub reset_path: String,

    /// Placeholder avatar service; `?seed={email}` is appended.
    pub avatar_base_url: String,
}

impl AuthSettings {
    /// Settings with the given origin and default paths.
    #[must_use]
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            ..Self::default()
        }
    }

    /// Default settings, with the origin taken from `APP_ORIGIN` when set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidUrl`] if `APP_ORIGIN` is malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var(ORIGIN_VARIABLE) {
            Ok(origin) if !origin.trim().is_empty() => {
                validate_url("origin", origin.trim())?;
                Ok(Self::new(origin.trim()))
            },
            _ => Ok(Self::default()),
        }
    }

    /// Set the reset redirect path.
    #[must_use]
    pub fn with_reset_path(mut self, path: impl Into<String>) -> Self {
        self.reset_path = path.into();
        self
    }

    /// Set the placeholder avatar service.
    #[must_use]
    pub fn with_avatar_base_url(mut self, url: impl Into<String>) -> Self {
        self.avatar_base_url = url.into();
        self
    }

    /// Redirect target for password reset emails: `{origin}{reset_path}`.
    #[must_use]
    pub fn reset_redirect(&self) -> String {
        format!("{}{}", self.origin.trim_end_matches('/'), self.reset_path)
    }

    /// Placeholder avatar URL keyed by `email`.
    #[must_use]
    pub fn placeholder_avatar(&self, email: &str) -> String {
        placeholder_avatar(&self.avatar_base_url, email)
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            origin: DEFAULT_ORIGIN.to_string(),
            reset_path: DEFAULT_RESET_PATH.to_string(),
            avatar_base_url: DEFAULT_AVATAR_BASE_URL.to_string(),
        }
    }
}
