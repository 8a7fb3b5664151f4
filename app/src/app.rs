//! Application root: auth context, router and form composed into one reducer.
//!
//! Each feature reducer owns a slice of [`AppState`] and is lifted with
//! [`pullback`]. After every auth action the root re-derives the router's
//! view of `{loading, user}` and the chat identity, so the router never reads
//! auth state directly.

use crate::form::{AuthFormState, FormAction, FormReducer};
use crate::identity::ChatIdentity;
use crate::router::{RouterAction, RouterReducer, RouterState, ViewState};
use chatai_auth::{AuthAction, AuthContext, AuthReducer, AuthState, SessionProvider};
use chatai_core::composition::{combine, pullback, Combined, Pullback};
use chatai_core::effect::Effect;
use chatai_core::reducer::Reducer;
use chatai_core::SmallVec;

/// Root application state.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    /// Session and user.
    pub auth: AuthState,
    /// Selected view.
    pub router: RouterState,
    /// Sign-in / sign-up form.
    pub form: AuthFormState,
    /// Identity handed to the chat shell; cleared on logout.
    pub identity: Option<ChatIdentity>,
}

/// What the shell should render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    /// Auth context still resolving.
    Loading,
    /// Landing page.
    Landing,
    /// Auth form.
    Auth,
    /// Chat shell for this identity.
    Chat(ChatIdentity),
}

impl AppState {
    /// Resolve the screen to render.
    ///
    /// Chat needs the chat view, a user and an identity; a chat view without
    /// them falls back to the landing page.
    #[must_use]
    pub fn screen(&self) -> Screen {
        if self.auth.loading {
            return Screen::Loading;
        }
        match (self.router.view, &self.auth.user, &self.identity) {
            (ViewState::Chat, Some(_), Some(identity)) => Screen::Chat(identity.clone()),
            (ViewState::Auth, _, _) => Screen::Auth,
            _ => Screen::Landing,
        }
    }
}

/// Root application action.
#[derive(Debug, Clone, PartialEq)]
pub enum AppAction {
    /// Auth context lifecycle and notifications.
    Auth(AuthAction),
    /// Navigation.
    Router(RouterAction),
    /// Form input and submits.
    Form(FormAction),
}

impl AppAction {
    fn into_auth(self) -> Option<AuthAction> {
        match self {
            Self::Auth(action) => Some(action),
            _ => None,
        }
    }

    fn into_router(self) -> Option<RouterAction> {
        match self {
            Self::Router(action) => Some(action),
            _ => None,
        }
    }

    fn into_form(self) -> Option<FormAction> {
        match self {
            Self::Form(action) => Some(action),
            _ => None,
        }
    }
}

fn auth_state(state: &mut AppState) -> &mut AuthState {
    &mut state.auth
}

fn router_state(state: &mut AppState) -> &mut RouterState {
    &mut state.router
}

fn form_state(state: &mut AppState) -> &mut AuthFormState {
    &mut state.form
}

type Features<P> = Combined<
    Combined<Pullback<AppState, AppAction, AuthReducer<P>>, Pullback<AppState, AppAction, RouterReducer<P>>>,
    Pullback<AppState, AppAction, FormReducer<P>>,
>;

/// Root reducer.
pub struct AppReducer<P>
where
    P: SessionProvider + Clone + 'static,
{
    features: Features<P>,
}

impl<P> AppReducer<P>
where
    P: SessionProvider + Clone + 'static,
{
    /// Compose the feature reducers.
    #[must_use]
    pub fn new() -> Self {
        let auth = pullback(AuthReducer::new(), auth_state, AppAction::into_auth, AppAction::Auth);
        let router = pullback(
            RouterReducer::new(),
            router_state,
            AppAction::into_router,
            AppAction::Router,
        );
        let form = pullback(FormReducer::new(), form_state, AppAction::into_form, AppAction::Form);
        Self {
            features: combine(combine(auth, router), form),
        }
    }

    /// Push the auth context's current `{loading, user}` into the router and
    /// re-derive the chat identity.
    ///
    /// `session_observed` is set when a change notification was applied; the
    /// initial fetch is covered by the router's own loading transition.
    fn sync_auth(
        &self,
        state: &mut AppState,
        env: &AuthContext<P>,
        session_observed: bool,
    ) -> SmallVec<[Effect<AppAction>; 4]> {
        state.identity = state
            .auth
            .user
            .as_ref()
            .map(|user| ChatIdentity::from_user(user, env.settings()));

        let changed = RouterAction::AuthChanged {
            loading: state.auth.loading,
            user_present: state.auth.user.is_some(),
            session_observed,
        };
        self.features.reduce(state, AppAction::Router(changed), env)
    }
}

impl<P> Default for AppReducer<P>
where
    P: SessionProvider + Clone + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<P> Reducer for AppReducer<P>
where
    P: SessionProvider + Clone + 'static,
{
    type State = AppState;
    type Action = AppAction;
    type Environment = AuthContext<P>;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        let auth_changed = matches!(action, AppAction::Auth(_));
        let logout = matches!(action, AppAction::Router(RouterAction::Logout));
        let events_before = state.auth.events_applied;

        let mut effects = self.features.reduce(state, action, env);

        if auth_changed {
            let session_observed = state.auth.events_applied != events_before;
            effects.extend(self.sync_auth(state, env, session_observed));
        }
        if logout {
            state.identity = None;
        }
        effects
    }
}
