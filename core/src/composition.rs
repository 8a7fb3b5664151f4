//! Reducer composition utilities
//!
//! Feature reducers are written against their own state and action types.
//! [`pullback`] lifts such a child reducer into a parent reducer:
//!
//! - the child state is focused with a `&mut` accessor,
//! - parent actions that do not belong to the child are ignored,
//! - effects produced by the child are mapped back into parent actions.
//!
//! # Example
//!
//! ```
//! use chatai_core::composition::pullback;
//! use chatai_core::{effect::Effect, reducer::Reducer, smallvec, SmallVec};
//!
//! #[derive(Clone, Default)]
//! struct TabState {
//!     signing_up: bool,
//! }
//!
//! #[derive(Clone, Debug)]
//! enum TabAction {
//!     Toggle,
//! }
//!
//! struct TabReducer;
//!
//! impl Reducer for TabReducer {
//!     type State = TabState;
//!     type Action = TabAction;
//!     type Environment = ();
//!
//!     fn reduce(&self, state: &mut TabState, _action: TabAction, _env: &()) -> SmallVec<[Effect<TabAction>; 4]> {
//!         state.signing_up = !state.signing_up;
//!         smallvec![Effect::None]
//!     }
//! }
//!
//! #[derive(Default)]
//! struct ScreenState {
//!     tab: TabState,
//! }
//!
//! #[derive(Clone, Debug)]
//! enum ScreenAction {
//!     Tab(TabAction),
//!     Other,
//! }
//!
//! let lifted = pullback(
//!     TabReducer,
//!     |screen: &mut ScreenState| &mut screen.tab,
//!     |action: ScreenAction| match action {
//!         ScreenAction::Tab(tab) => Some(tab),
//!         ScreenAction::Other => None,
//!     },
//!     ScreenAction::Tab,
//! );
//!
//! let mut state = ScreenState::default();
//! lifted.reduce(&mut state, ScreenAction::Tab(TabAction::Toggle), &());
//! assert!(state.tab.signing_up);
//! lifted.reduce(&mut state, ScreenAction::Other, &());
//! assert!(state.tab.signing_up);
//! ```

use crate::effect::Effect;
use crate::reducer::Reducer;
use smallvec::SmallVec;

/// Lift a child reducer into a parent state and action space.
///
/// # Type Parameters
///
/// - `S` / `A`: parent state and action
/// - `R`: child reducer; its environment becomes the parent's
pub fn pullback<S, A, R>(
    reducer: R,
    focus: fn(&mut S) -> &mut R::State,
    extract: fn(A) -> Option<R::Action>,
    embed: fn(R::Action) -> A,
) -> Pullback<S, A, R>
where
    R: Reducer,
{
    Pullback {
        reducer,
        focus,
        extract,
        embed,
    }
}

/// A child reducer lifted into a parent domain.
///
/// Created by [`pullback`].
pub struct Pullback<S, A, R>
where
    R: Reducer,
{
    reducer: R,
    focus: fn(&mut S) -> &mut R::State,
    extract: fn(A) -> Option<R::Action>,
    embed: fn(R::Action) -> A,
}

impl<S, A, R> Clone for Pullback<S, A, R>
where
    R: Reducer + Clone,
{
    fn clone(&self) -> Self {
        Self {
            reducer: self.reducer.clone(),
            focus: self.focus,
            extract: self.extract,
            embed: self.embed,
        }
    }
}

impl<S, A, R> Reducer for Pullback<S, A, R>
where
    R: Reducer,
    R::Action: Send + 'static,
    A: Send + 'static,
{
    type State = S;
    type Action = A;
    type Environment = R::Environment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        let Some(child_action) = (self.extract)(action) else {
            return SmallVec::new();
        };

        let embed = self.embed;
        self.reducer
            .reduce((self.focus)(state), child_action, env)
            .into_iter()
            .filter(|effect| !effect.is_none())
            .map(|effect| effect.map(embed))
            .collect()
    }
}

/// Run two reducers over the same state and action, concatenating effects.
///
/// The first reducer sees the action before the second.
pub const fn combine<R1, R2>(first: R1, second: R2) -> Combined<R1, R2> {
    Combined { first, second }
}

/// Two reducers run in sequence.
///
/// Created by [`combine`].
#[derive(Debug, Clone)]
pub struct Combined<R1, R2> {
    first: R1,
    second: R2,
}

impl<R1, R2> Reducer for Combined<R1, R2>
where
    R1: Reducer,
    R1::Action: Clone,
    R2: Reducer<State = R1::State, Action = R1::Action, Environment = R1::Environment>,
{
    type State = R1::State;
    type Action = R1::Action;
    type Environment = R1::Environment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        let mut effects = self.first.reduce(state, action.clone(), env);
        effects.extend(self.second.reduce(state, action, env));
        effects
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smallvec;

    #[derive(Debug, Default)]
    struct Parent {
        child: u32,
        log: Vec<&'static str>,
    }

    #[derive(Debug, Clone, PartialEq)]
    enum ParentAction {
        Child(ChildAction),
        Log(&'static str),
    }

    #[derive(Debug, Clone, PartialEq)]
    enum ChildAction {
        Bump,
        Bumped,
    }

    struct ChildReducer;

    impl Reducer for ChildReducer {
        type State = u32;
        type Action = ChildAction;
        type Environment = ();

        fn reduce(&self, state: &mut u32, action: ChildAction, _env: &()) -> SmallVec<[Effect<ChildAction>; 4]> {
            match action {
                ChildAction::Bump => {
                    *state += 1;
                    smallvec![Effect::Future(Box::pin(async { Some(ChildAction::Bumped) }))]
                },
                ChildAction::Bumped => smallvec![Effect::None],
            }
        }
    }

    struct LogReducer;

    impl Reducer for LogReducer {
        type State = Parent;
        type Action = ParentAction;
        type Environment = ();

        fn reduce(&self, state: &mut Parent, action: ParentAction, _env: &()) -> SmallVec<[Effect<ParentAction>; 4]> {
            if let ParentAction::Log(line) = action {
                state.log.push(line);
            }
            SmallVec::new()
        }
    }

    fn lifted() -> Pullback<Parent, ParentAction, ChildReducer> {
        pullback(
            ChildReducer,
            |parent: &mut Parent| &mut parent.child,
            |action| match action {
                ParentAction::Child(child) => Some(child),
                ParentAction::Log(_) => None,
            },
            ParentAction::Child,
        )
    }

    #[tokio::test]
    async fn pullback_focuses_state_and_embeds_effects() {
        let mut parent = Parent::default();
        let mut effects = lifted().reduce(&mut parent, ParentAction::Child(ChildAction::Bump), &());

        assert_eq!(parent.child, 1);
        assert_eq!(effects.len(), 1);
        let Some(Effect::Future(fut)) = effects.pop() else {
            unreachable!("child returns a single future");
        };
        assert_eq!(fut.await, Some(ParentAction::Child(ChildAction::Bumped)));
    }

    #[test]
    fn pullback_ignores_foreign_actions_and_drops_noops() {
        let mut parent = Parent::default();
        let effects = lifted().reduce(&mut parent, ParentAction::Log("x"), &());
        assert!(effects.is_empty());

        let effects = lifted().reduce(&mut parent, ParentAction::Child(ChildAction::Bumped), &());
        assert!(effects.is_empty());
    }

    #[test]
    fn combine_runs_both_in_order() {
        let reducer = combine(LogReducer, lifted());
        let mut parent = Parent::default();

        reducer.reduce(&mut parent, ParentAction::Log("first"), &());
        reducer.reduce(&mut parent, ParentAction::Child(ChildAction::Bump), &());

        assert_eq!(parent.log, vec!["first"]);
        assert_eq!(parent.child, 1);
    }
}
