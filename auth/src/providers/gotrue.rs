//! HTTP session provider for GoTrue-compatible auth servers (Supabase Auth).
//!
//! Talks to the REST endpoints directly with `reqwest`:
//!
//! | Operation | Request |
//! |---|---|
//! | sign up | `POST /auth/v1/signup` |
//! | sign in | `POST /auth/v1/token?grant_type=password` |
//! | sign out | `POST /auth/v1/logout` |
//! | password reset | `POST /auth/v1/recover?redirect_to=…` |
//!
//! The current session is held in memory for the lifetime of the provider.
//! Token refresh and persistent session storage are not implemented.

use super::session::{SessionBroadcaster, SessionProvider, SessionSubscription};
use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::state::{Session, SessionEvent, SessionEventKind, UserMetadata};
use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

const SIGN_UP_PATH: &str = "/auth/v1/signup";
const TOKEN_PATH: &str = "/auth/v1/token?grant_type=password";
const LOGOUT_PATH: &str = "/auth/v1/logout";
const RECOVER_PATH: &str = "/auth/v1/recover";

/// Request timeout for every provider call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct SignUpRequest<'a> {
    email: &'a str,
    password: &'a str,
    data: &'a UserMetadata,
}

#[derive(Serialize)]
struct RecoverRequest<'a> {
    email: &'a str,
}

/// GoTrue REST session provider.
///
/// Cloning shares the HTTP client, the current session and the subscribers.
#[derive(Clone)]
pub struct GoTrueProvider {
    config: Arc<ProviderConfig>,
    http: Client,
    session: Arc<Mutex<Option<Session>>>,
    events: SessionBroadcaster,
}

impl GoTrueProvider {
    /// Create a provider for the configured endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Transport`] if the HTTP client cannot be built.
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        Ok(Self {
            config: Arc::new(config),
            http,
            session: Arc::new(Mutex::new(None)),
            events: SessionBroadcaster::new(),
        })
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.http
            .post(self.config.endpoint(path))
            .header("apikey", &self.config.anon_key)
            .bearer_auth(&self.config.anon_key)
    }

    fn stored_session(&self) -> Option<Session> {
        self.session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn replace_session(&self, session: Option<Session>, kind: SessionEventKind) {
        *self.session.lock().unwrap_or_else(PoisonError::into_inner) = session.clone();
        self.events.emit(&SessionEvent::new(kind, session));
    }
}

/// Turn a response into its JSON body, or the provider's rejection.
async fn read_json(response: Response) -> Result<Value, ProviderError> {
    let status = response.status();
    let body: Value = response.json().await.unwrap_or(Value::Null);

    if status.is_success() {
        return Ok(body);
    }

    let message = ["msg", "message", "error_description", "error"]
        .iter()
        .find_map(|key| body.get(key).and_then(Value::as_str))
        .map_or_else(
            || {
                status
                    .canonical_reason()
                    .unwrap_or("Request failed")
                    .to_string()
            },
            ToString::to_string,
        );
    tracing::warn!(status = status.as_u16(), %message, "Provider rejected request");
    Err(ProviderError::rejected(message))
}

async fn send(request: RequestBuilder) -> Result<Value, ProviderError> {
    let response = request
        .send()
        .await
        .map_err(|e| ProviderError::Transport(e.to_string()))?;
    read_json(response).await
}

/// A session in `body`, if it carries tokens.
fn session_from(body: Value) -> Result<Option<Session>, ProviderError> {
    if body.get("access_token").is_none() {
        return Ok(None);
    }
    serde_json::from_value(body)
        .map(Some)
        .map_err(|e| ProviderError::InvalidResponse(e.to_string()))
}

impl SessionProvider for GoTrueProvider {
    fn init(&self) -> impl Future<Output = Result<(), ProviderError>> + Send {
        let provider = self.clone();
        async move {
            tracing::info!(url = %provider.config.url, "Session provider initialized");
            let session = provider.stored_session();
            provider.events.emit(&SessionEvent::new(SessionEventKind::InitialSession, session));
            Ok(())
        }
    }

    fn dispose(&self) -> impl Future<Output = ()> + Send {
        let events = self.events.clone();
        async move {
            events.close_all();
            tracing::info!("Session provider disposed");
        }
    }

    fn current_session(
        &self,
    ) -> impl Future<Output = Result<Option<Session>, ProviderError>> + Send {
        let session = self.stored_session();
        async move { Ok(session) }
    }

    fn subscribe(&self) -> SessionSubscription {
        self.events.subscribe()
    }

    fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: UserMetadata,
    ) -> impl Future<Output = Result<(), ProviderError>> + Send {
        let provider = self.clone();
        let request = self.post(SIGN_UP_PATH).json(&SignUpRequest {
            email,
            password,
            data: &metadata,
        });

        async move {
            let body = send(request).await?;
            // Without email confirmation the provider signs the user in immediately.
            if let Some(session) = session_from(body)? {
                provider.replace_session(Some(session), SessionEventKind::SignedIn);
            }
            Ok(())
        }
    }

    fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<(), ProviderError>> + Send {
        let provider = self.clone();
        let request = self.post(TOKEN_PATH).json(&Credentials { email, password });

        async move {
            let body = send(request).await?;
            let session = session_from(body)?.ok_or_else(|| {
                ProviderError::InvalidResponse("token response without a session".to_string())
            })?;
            provider.replace_session(Some(session), SessionEventKind::SignedIn);
            Ok(())
        }
    }

    fn sign_out(&self) -> impl Future<Output = Result<(), ProviderError>> + Send {
        let provider = self.clone();
        let request = self.stored_session().map(|session| {
            self.http
                .post(self.config.endpoint(LOGOUT_PATH))
                .header("apikey", &self.config.anon_key)
                .bearer_auth(session.access_token)
        });

        async move {
            let result = match request {
                Some(request) => send(request).await.map(drop),
                None => Ok(()),
            };
            provider.replace_session(None, SessionEventKind::SignedOut);
            result
        }
    }

    fn send_password_reset(
        &self,
        email: &str,
        redirect_to: &str,
    ) -> impl Future<Output = Result<(), ProviderError>> + Send {
        let request = self
            .post(RECOVER_PATH)
            .query(&[("redirect_to", redirect_to)])
            .json(&RecoverRequest { email });

        async move { send(request).await.map(drop) }
    }
}

impl std::fmt::Debug for GoTrueProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoTrueProvider")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_session_from_token_response() {
        let body = json!({
            "access_token": "t",
            "refresh_token": "r",
            "expires_at": 1_700_000_000,
            "user": {"id": "u1", "email": "a@b.com"}
        });
        let session = session_from(body).ok().flatten();
        assert_eq!(session.map(|s| s.user.id), Some("u1".to_string()));
    }

    #[test]
    fn test_pending_confirmation_has_no_session() {
        let body = json!({"id": "u1", "email": "a@b.com", "confirmation_sent_at": "2024-01-01T00:00:00Z"});
        assert_eq!(session_from(body), Ok(None));
    }

    #[test]
    fn test_malformed_session_is_invalid_response() {
        let body = json!({"access_token": "t"});
        assert!(matches!(session_from(body), Err(ProviderError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_sign_out_without_session_emits_signed_out() {
        use futures::StreamExt;

        let config = ProviderConfig::new("http://127.0.0.1:9", "anon").ok();
        let Some(provider) = config.and_then(|c| GoTrueProvider::new(c).ok()) else {
            return;
        };
        let mut subscription = provider.subscribe();

        assert_eq!(provider.sign_out().await, Ok(()));
        let event = subscription.next().await;
        assert_eq!(event.map(|e| e.kind), Some(SessionEventKind::SignedOut));
    }
}
