//! Auth context: the single gateway to the session provider.
//!
//! [`AuthContext`] is the environment of every reducer in the client. It
//! holds the configured provider (or none, when authentication is disabled)
//! and turns each provider call into a `'static` future whose output is a
//! plain value: configuration problems, provider rejections, transport
//! failures and provider panics all come back as [`AuthError`].

use crate::config::AuthSettings;
use crate::error::{AuthError, AuthResult, Operation, ProviderError};
use crate::providers::SessionProvider;
use crate::state::{Session, SessionEvent, UserMetadata};
use futures::{FutureExt, Stream, StreamExt};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::Instrument;

/// Auth context.
///
/// # Type Parameters
///
/// - `P`: Session provider
#[derive(Clone)]
pub struct AuthContext<P>
where
    P: SessionProvider + Clone,
{
    /// `None` when the provider is not configured.
    provider: Option<P>,

    /// Application settings.
    settings: Arc<AuthSettings>,
}

impl<P> AuthContext<P>
where
    P: SessionProvider + Clone + 'static,
{
    /// Create a context over a configured provider.
    #[must_use]
    pub fn new(provider: P, settings: AuthSettings) -> Self {
        Self {
            provider: Some(provider),
            settings: Arc::new(settings),
        }
    }

    /// Create a context with authentication disabled.
    ///
    /// Every operation short-circuits with [`AuthError::Configuration`].
    #[must_use]
    pub fn disabled(settings: AuthSettings) -> Self {
        Self {
            provider: None,
            settings: Arc::new(settings),
        }
    }

    /// Create a context from an optional provider.
    #[must_use]
    pub fn from_provider(provider: Option<P>, settings: AuthSettings) -> Self {
        match provider {
            Some(provider) => Self::new(provider, settings),
            None => Self::disabled(settings),
        }
    }

    /// `true` when a provider is configured.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.provider.is_some()
    }

    /// The configured provider.
    #[must_use]
    pub const fn provider(&self) -> Option<&P> {
        self.provider.as_ref()
    }

    /// Application settings.
    #[must_use]
    pub fn settings(&self) -> &AuthSettings {
        &self.settings
    }

    /// Initialize the provider. No-op when disabled.
    ///
    /// # Errors
    ///
    /// Returns the normalized provider error if initialization fails.
    pub async fn init(&self) -> Result<(), AuthError> {
        let Some(provider) = self.provider.clone() else {
            tracing::warn!("Authentication disabled: provider not configured");
            return Ok(());
        };
        guarded(Operation::SessionFetch, async move { provider.init().await }).await
    }

    /// Dispose the provider, closing all subscriptions. No-op when disabled.
    pub async fn dispose(&self) {
        if let Some(provider) = &self.provider {
            provider.dispose().await;
        }
    }

    /// Register an account.
    ///
    /// Attaches `full_name` (empty when not given) and the placeholder
    /// avatar for `email` as profile metadata.
    pub fn sign_up(
        &self,
        email: String,
        password: String,
        full_name: Option<String>,
    ) -> impl Future<Output = AuthResult> + Send + use<P> {
        let provider = self.provider.clone();
        let metadata = UserMetadata {
            full_name: Some(full_name.unwrap_or_default()),
            avatar_url: Some(self.settings.placeholder_avatar(&email)),
        };
        let span = tracing::info_span!("sign_up", %email);

        async move {
            let provider = provider.ok_or(AuthError::Configuration)?;
            tracing::info!("Signing up");
            guarded(Operation::SignUp, async move {
                provider.sign_up(&email, &password, metadata).await
            })
            .await
        }
        .instrument(span)
    }

    /// Sign in with email and password.
    pub fn sign_in(
        &self,
        email: String,
        password: String,
    ) -> impl Future<Output = AuthResult> + Send + use<P> {
        let provider = self.provider.clone();
        let span = tracing::info_span!("sign_in", %email);

        async move {
            let provider = provider.ok_or(AuthError::Configuration)?;
            tracing::info!("Signing in");
            guarded(Operation::SignIn, async move {
                provider.sign_in_with_password(&email, &password).await
            })
            .await
        }
        .instrument(span)
    }

    /// Sign out.
    ///
    /// Never fails: the session listener clears local state once the
    /// provider announces the sign-out, and failures are only logged.
    pub fn sign_out(&self) -> impl Future<Output = ()> + Send + use<P> {
        let provider = self.provider.clone();

        async move {
            let Some(provider) = provider else {
                return;
            };
            tracing::info!("Signing out");
            // Failures are already logged by `guarded`.
            let _ = guarded(Operation::SignOut, async move { provider.sign_out().await }).await;
        }
        .instrument(tracing::info_span!("sign_out"))
    }

    /// Send a password reset email redirecting to `{origin}/reset-password`.
    pub fn reset_password(
        &self,
        email: String,
    ) -> impl Future<Output = AuthResult> + Send + use<P> {
        let provider = self.provider.clone();
        let redirect_to = self.settings.reset_redirect();
        let span = tracing::info_span!("reset_password", %email);

        async move {
            let provider = provider.ok_or(AuthError::Configuration)?;
            tracing::info!(%redirect_to, "Requesting password reset");
            guarded(Operation::ResetPassword, async move {
                provider.send_password_reset(&email, &redirect_to).await
            })
            .await
        }
        .instrument(span)
    }

    /// One-shot lookup of the current session. `Ok(None)` when disabled.
    pub fn current_session(
        &self,
    ) -> impl Future<Output = Result<Option<Session>, AuthError>> + Send + use<P> {
        let provider = self.provider.clone();

        async move {
            let Some(provider) = provider else {
                return Ok(None);
            };
            match AssertUnwindSafe(provider.current_session()).catch_unwind().await {
                Ok(result) => result.map_err(|e| e.into_auth_error(Operation::SessionFetch)),
                Err(_) => {
                    tracing::error!("Session provider panicked during session fetch");
                    Err(AuthError::Unexpected {
                        operation: Operation::SessionFetch,
                    })
                },
            }
        }
    }

    /// Session change notifications.
    ///
    /// Subscribes when first polled; dropping the stream unsubscribes.
    /// Empty when disabled.
    pub fn session_changes(&self) -> impl Stream<Item = SessionEvent> + Send + use<P> {
        let provider = self.provider.clone();

        async_stream::stream! {
            if let Some(provider) = provider {
                let mut subscription = provider.subscribe();
                tracing::info!("Session listener subscribed");
                while let Some(event) = subscription.next().await {
                    yield event;
                }
            }
        }
    }
}

/// Run a provider call, normalizing rejections, failures and panics.
async fn guarded<F>(operation: Operation, call: F) -> AuthResult
where
    F: Future<Output = Result<(), ProviderError>>,
{
    match AssertUnwindSafe(call).catch_unwind().await {
        Ok(Ok(())) => {
            tracing::debug!(%operation, "Provider call succeeded");
            Ok(())
        },
        Ok(Err(error)) => {
            tracing::warn!(%operation, %error, "Provider call failed");
            Err(error.into_auth_error(operation))
        },
        Err(_) => {
            tracing::error!(%operation, "Session provider panicked");
            Err(AuthError::Unexpected { operation })
        },
    }
}

impl<P> std::fmt::Debug for AuthContext<P>
where
    P: SessionProvider + Clone,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthContext")
            .field("enabled", &self.provider.is_some())
            .field("settings", &self.settings)
            .finish()
    }
}

#[cfg(all(test, feature = "test-utils"))]
mod tests {
    use super::*;
    use crate::mocks::{MockBehavior, MockMethod, MockSessionProvider, ProviderCall};

    fn context(provider: &MockSessionProvider) -> AuthContext<MockSessionProvider> {
        AuthContext::new(provider.clone(), AuthSettings::default())
    }

    #[tokio::test]
    async fn test_sign_up_attaches_metadata() {
        let provider = MockSessionProvider::new();
        let result = context(&provider)
            .sign_up("a@b.com".into(), "secret1".into(), None)
            .await;

        assert_eq!(result, Ok(()));
        assert_eq!(
            provider.calls(),
            vec![ProviderCall::SignUp {
                email: "a@b.com".into(),
                metadata: UserMetadata {
                    full_name: Some(String::new()),
                    avatar_url: Some(
                        "https://api.dicebear.com/9.x/avataaars/svg?seed=a%40b.com".into()
                    ),
                },
            }]
        );
    }

    #[tokio::test]
    async fn test_reset_redirect_uses_origin() {
        let provider = MockSessionProvider::new();
        let context = AuthContext::new(provider.clone(), AuthSettings::new("https://chat.example.com"));

        assert_eq!(context.reset_password("a@b.com".into()).await, Ok(()));
        assert_eq!(
            provider.calls(),
            vec![ProviderCall::PasswordReset {
                email: "a@b.com".into(),
                redirect_to: "https://chat.example.com/reset-password".into(),
            }]
        );
    }

    #[tokio::test]
    async fn test_disabled_context_reports_configuration() {
        let context = AuthContext::<MockSessionProvider>::disabled(AuthSettings::default());
        assert!(!context.is_enabled());
        assert!(context.provider().is_none());

        assert_eq!(
            context.sign_up("a@b.com".into(), "secret1".into(), Some("Ada".into())).await,
            Err(AuthError::Configuration)
        );
        assert_eq!(
            context.sign_in("a@b.com".into(), "secret1".into()).await,
            Err(AuthError::Configuration)
        );
        assert_eq!(
            context.reset_password("a@b.com".into()).await,
            Err(AuthError::Configuration)
        );
    }

    #[tokio::test]
    async fn test_disabled_context_sign_out_and_lifecycle_are_noops() {
        let context = AuthContext::<MockSessionProvider>::disabled(AuthSettings::default());

        context.sign_out().await;
        assert_eq!(context.init().await, Ok(()));
        context.dispose().await;
    }

    #[tokio::test]
    async fn test_panic_becomes_unexpected() {
        let provider = MockSessionProvider::new();
        provider.set_behavior(MockMethod::SignIn, MockBehavior::Panic);

        let result = context(&provider).sign_in("a@b.com".into(), "pw".into()).await;
        assert_eq!(
            result,
            Err(AuthError::Unexpected {
                operation: Operation::SignIn
            })
        );
    }

    #[tokio::test]
    async fn test_failed_session_fetch_is_an_error_value() {
        let provider = MockSessionProvider::new();
        provider.set_behavior(MockMethod::CurrentSession, MockBehavior::TransportFailure);

        let result = context(&provider).current_session().await;
        assert_eq!(
            result,
            Err(AuthError::Unexpected {
                operation: Operation::SessionFetch
            })
        );
    }
}
