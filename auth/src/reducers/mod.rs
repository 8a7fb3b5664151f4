//! Authentication reducers.
//!
//! Reducers are pure functions: `(State, Action, Environment) → (State, Effects)`.
//!
//! [`AuthReducer`] is the session listener of the auth context. On mount it
//! starts two cancellable effects: the one-shot current session fetch and
//! the standing change subscription. Every result re-derives the local user
//! with the same projection and clears `loading`. Unmount cancels both, so
//! nothing reaches an unmounted context.

use crate::actions::AuthAction;
use crate::context::AuthContext;
use crate::providers::SessionProvider;
use crate::state::AuthState;
use chatai_core::effect::{Effect, EffectId};
use chatai_core::reducer::Reducer;
use chatai_core::{smallvec, SmallVec};
use futures::StreamExt;
use std::marker::PhantomData;

/// Effect id of the one-shot current session fetch.
pub const SESSION_FETCH: EffectId = EffectId::new("auth.session_fetch");

/// Effect id of the standing session change subscription.
pub const SESSION_LISTENER: EffectId = EffectId::new("auth.session_listener");

/// Session listener reducer.
#[derive(Debug, Clone)]
pub struct AuthReducer<P> {
    _provider: PhantomData<fn() -> P>,
}

impl<P> AuthReducer<P> {
    /// Create a new auth reducer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _provider: PhantomData,
        }
    }
}

impl<P> Default for AuthReducer<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> Reducer for AuthReducer<P>
where
    P: SessionProvider + Clone + 'static,
{
    type State = AuthState;
    type Action = AuthAction;
    type Environment = AuthContext<P>;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            // ═══════════════════════════════════════════════════════════
            // Mount: fetch current session, subscribe to changes
            // ═══════════════════════════════════════════════════════════
            AuthAction::Mount => {
                if state.mounted {
                    tracing::debug!("Auth context already mounted");
                    return smallvec![Effect::None];
                }
                state.mounted = true;
                state.events_applied = 0;

                if !env.is_enabled() {
                    // Disabled provider: logged out, nothing to wait for.
                    state.user = None;
                    state.session = None;
                    state.loading = false;
                    return smallvec![Effect::None];
                }

                state.loading = true;
                let fetch = env.current_session();
                let changes = env.session_changes();

                smallvec![
                    Effect::Future(Box::pin(async move {
                        Some(AuthAction::SessionLoaded {
                            result: fetch.await,
                        })
                    }))
                    .cancellable(SESSION_FETCH),
                    Effect::Stream(Box::pin(
                        changes.map(|event| AuthAction::SessionChanged { event })
                    ))
                    .cancellable(SESSION_LISTENER),
                ]
            },

            // ═══════════════════════════════════════════════════════════
            // Unmount: release the fetch and the subscription
            // ═══════════════════════════════════════════════════════════
            AuthAction::Unmount => {
                if !state.mounted {
                    return smallvec![Effect::None];
                }
                state.mounted = false;
                tracing::info!("Auth context unmounted");

                smallvec![
                    Effect::Cancel(SESSION_FETCH),
                    Effect::Cancel(SESSION_LISTENER)
                ]
            },

            // ═══════════════════════════════════════════════════════════
            // SessionLoaded: initial fetch resolved
            // ═══════════════════════════════════════════════════════════
            AuthAction::SessionLoaded { result } => {
                if !state.mounted {
                    tracing::warn!("Ignoring session fetch result after unmount");
                    return smallvec![Effect::None];
                }
                if state.events_applied > 0 {
                    // A change notification already carried newer state.
                    tracing::debug!("Session fetch superseded by change notification");
                    state.loading = false;
                    return smallvec![Effect::None];
                }

                let session = result.unwrap_or_else(|error| {
                    tracing::warn!(%error, "Session fetch failed, treating as signed out");
                    None
                });
                tracing::debug!(signed_in = session.is_some(), "Initial session loaded");
                state.apply_session(session, &env.settings().avatar_base_url);

                smallvec![Effect::None]
            },

            // ═══════════════════════════════════════════════════════════
            // SessionChanged: last notification wins
            // ═══════════════════════════════════════════════════════════
            AuthAction::SessionChanged { event } => {
                if !state.mounted {
                    tracing::warn!(kind = ?event.kind, "Ignoring session change after unmount");
                    return smallvec![Effect::None];
                }

                state.events_applied = state.events_applied.saturating_add(1);
                tracing::debug!(
                    kind = ?event.kind,
                    signed_in = event.session.is_some(),
                    "Session changed"
                );
                state.apply_session(event.session, &env.settings().avatar_base_url);

                smallvec![Effect::None]
            },
        }
    }
}
