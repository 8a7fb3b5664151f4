//! Top-level view router.
//!
//! States `landing | auth | chat`, initial `landing`. Navigation between
//! landing and auth is manual; entering and leaving chat follows the
//! presence of an authenticated user, which always takes priority. While the
//! auth context is loading every transition is deferred.

use chatai_auth::{AuthContext, SessionProvider};
use chatai_core::effect::Effect;
use chatai_core::reducer::Reducer;
use chatai_core::{smallvec, SmallVec};
use serde::Serialize;
use std::marker::PhantomData;

/// Top-level screen selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewState {
    /// Marketing landing page.
    #[default]
    Landing,
    /// Sign-in / sign-up form.
    Auth,
    /// Authenticated chat shell.
    Chat,
}

/// Router state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterState {
    /// Selected view.
    pub view: ViewState,
    /// Mirror of the auth context's `loading`.
    pub loading: bool,
    /// Mirror of the auth context's user presence.
    pub user_present: bool,
}

impl Default for RouterState {
    fn default() -> Self {
        Self {
            view: ViewState::Landing,
            loading: true,
            user_present: false,
        }
    }
}

/// Router action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouterAction {
    /// "Get started" on the landing page.
    GetStarted,
    /// "Back" on the auth form.
    Back,
    /// Logout requested by the chat shell.
    Logout,
    /// The auth context's `{loading, user}` changed.
    AuthChanged {
        /// Auth context loading flag
        loading: bool,
        /// A user is signed in
        user_present: bool,
        /// The provider delivered a session or notification
        session_observed: bool,
    },
}

/// View router reducer.
#[derive(Debug, Clone)]
pub struct RouterReducer<P> {
    _provider: PhantomData<fn() -> P>,
}

impl<P> RouterReducer<P> {
    /// Create a new router reducer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _provider: PhantomData,
        }
    }
}

impl<P> Default for RouterReducer<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> Reducer for RouterReducer<P>
where
    P: SessionProvider + Clone + 'static,
{
    type State = RouterState;
    type Action = RouterAction;
    type Environment = AuthContext<P>;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            RouterAction::GetStarted if !state.loading && state.view == ViewState::Landing => {
                state.view = ViewState::Auth;
            },
            RouterAction::Back if !state.loading && state.view == ViewState::Auth => {
                state.view = ViewState::Landing;
            },
            RouterAction::GetStarted | RouterAction::Back => {
                tracing::debug!(?action, view = ?state.view, "Navigation ignored");
            },

            RouterAction::Logout => {
                // Leave chat now; the session listener clears the user when
                // the provider confirms.
                tracing::info!("Logging out");
                state.view = ViewState::Landing;
                let sign_out = env.sign_out();
                return smallvec![Effect::Future(Box::pin(async move {
                    sign_out.await;
                    None
                }))];
            },

            RouterAction::AuthChanged {
                loading,
                user_present,
                session_observed,
            } => {
                let was_loading = state.loading;
                let was_present = state.user_present;
                state.loading = loading;
                state.user_present = user_present;

                if loading {
                    return smallvec![Effect::None];
                }
                // A freshly delivered user always re-enters chat, even when
                // presence did not flip (a sign-out that failed earlier).
                let user_arrived = user_present && session_observed;
                if was_loading || was_present != user_present || user_arrived {
                    let view = if user_present {
                        ViewState::Chat
                    } else {
                        ViewState::Landing
                    };
                    tracing::debug!(from = ?state.view, to = ?view, "User presence changed");
                    state.view = view;
                }
            },
        }
        smallvec![Effect::None]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatai_auth::mocks::{MockMethod, MockSessionProvider};
    use chatai_auth::AuthSettings;
    use chatai_testing::{assertions, ReducerTest};

    type Router = RouterReducer<MockSessionProvider>;

    fn env() -> AuthContext<MockSessionProvider> {
        AuthContext::new(MockSessionProvider::new(), AuthSettings::default())
    }

    fn ready(view: ViewState, user_present: bool) -> RouterState {
        RouterState {
            view,
            loading: false,
            user_present,
        }
    }

    #[test]
    fn test_get_started_opens_auth() {
        ReducerTest::new(Router::new())
            .with_env(env())
            .given_state(ready(ViewState::Landing, false))
            .when_action(RouterAction::GetStarted)
            .then_state(|state| assert_eq!(state.view, ViewState::Auth))
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_back_returns_to_landing() {
        ReducerTest::new(Router::new())
            .with_env(env())
            .given_state(ready(ViewState::Auth, false))
            .when_action(RouterAction::Back)
            .then_state(|state| assert_eq!(state.view, ViewState::Landing))
            .run();
    }

    #[test]
    fn test_navigation_deferred_while_loading() {
        ReducerTest::new(Router::new())
            .with_env(env())
            .given_state(RouterState::default())
            .when_action(RouterAction::GetStarted)
            .then_state(|state| assert_eq!(state.view, ViewState::Landing))
            .run();
    }

    #[test]
    fn test_presence_while_loading_is_deferred() {
        ReducerTest::new(Router::new())
            .with_env(env())
            .given_state(RouterState::default())
            .when_action(RouterAction::AuthChanged {
                loading: true,
                user_present: true,
                session_observed: false,
            })
            .then_state(|state| assert_eq!(state.view, ViewState::Landing))
            .run();
    }

    #[test]
    fn test_user_arrival_enters_chat_from_auth() {
        ReducerTest::new(Router::new())
            .with_env(env())
            .given_state(ready(ViewState::Auth, false))
            .when_action(RouterAction::AuthChanged {
                loading: false,
                user_present: true,
                session_observed: true,
            })
            .then_state(|state| assert_eq!(state.view, ViewState::Chat))
            .run();
    }

    #[test]
    fn test_user_loss_leaves_chat() {
        ReducerTest::new(Router::new())
            .with_env(env())
            .given_state(ready(ViewState::Chat, true))
            .when_action(RouterAction::AuthChanged {
                loading: false,
                user_present: false,
                session_observed: true,
            })
            .then_state(|state| assert_eq!(state.view, ViewState::Landing))
            .run();
    }

    #[test]
    fn test_same_user_observed_again_reenters_chat() {
        ReducerTest::new(Router::new())
            .with_env(env())
            .given_state(ready(ViewState::Auth, true))
            .when_action(RouterAction::AuthChanged {
                loading: false,
                user_present: true,
                session_observed: true,
            })
            .then_state(|state| assert_eq!(state.view, ViewState::Chat))
            .run();
    }

    #[test]
    fn test_unchanged_user_without_notification_keeps_view() {
        ReducerTest::new(Router::new())
            .with_env(env())
            .given_state(ready(ViewState::Landing, true))
            .when_action(RouterAction::AuthChanged {
                loading: false,
                user_present: true,
                session_observed: false,
            })
            .then_state(|state| assert_eq!(state.view, ViewState::Landing))
            .run();
    }

    #[test]
    fn test_logout_lands_immediately_and_signs_out() {
        ReducerTest::new(Router::new())
            .with_env(env())
            .given_state(ready(ViewState::Chat, true))
            .when_action(RouterAction::Logout)
            .then_state(|state| {
                assert_eq!(state.view, ViewState::Landing);
                assert!(state.user_present);
            })
            .then_effects(assertions::assert_has_future_effect)
            .run();
    }

    #[test]
    fn test_logout_effect_signs_out_and_yields_nothing() {
        let provider = MockSessionProvider::new();
        let env = AuthContext::new(provider.clone(), AuthSettings::default());
        let mut state = ready(ViewState::Chat, true);

        let mut effects = Router::new().reduce(&mut state, RouterAction::Logout, &env);
        let Some(Effect::Future(sign_out)) = effects.pop() else {
            unreachable!("logout returns a single future effect");
        };

        assert_eq!(tokio_test::block_on(sign_out), None);
        assert_eq!(provider.call_count(MockMethod::SignOut), 1);
    }
}
