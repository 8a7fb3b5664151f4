//! Ergonomic testing utilities for reducers
//!
//! A fluent Given-When-Then API. Several `when_action` calls are reduced in
//! order; effect assertions see the effects of the last one.

#![allow(clippy::module_name_repetitions)] // ReducerTest is the natural name

use chatai_core::{effect::Effect, reducer::Reducer};

/// Type alias for state assertion functions
type StateAssertion<S> = Box<dyn FnOnce(&S)>;

/// Type alias for effect assertion functions
type EffectAssertion<A> = Box<dyn FnOnce(&[Effect<A>])>;

/// Fluent API for testing reducers with Given-When-Then syntax
///
/// # Example
///
/// ```ignore
/// use chatai_testing::ReducerTest;
///
/// ReducerTest::new(RouterReducer::new())
///     .with_env(context)
///     .given_state(RouterState::default())
///     .when_action(RouterAction::GetStarted)
///     .then_state(|state| assert_eq!(state.view, ViewState::Auth))
///     .then_effects(assertions::assert_no_effects)
///     .run();
/// ```
pub struct ReducerTest<R>
where
    R: Reducer,
{
    reducer: R,
    environment: Option<R::Environment>,
    initial_state: Option<R::State>,
    actions: Vec<R::Action>,
    state_assertions: Vec<StateAssertion<R::State>>,
    effect_assertions: Vec<EffectAssertion<R::Action>>,
}

impl<R> ReducerTest<R>
where
    R: Reducer,
{
    /// Create a new reducer test with the given reducer
    #[must_use]
    pub const fn new(reducer: R) -> Self {
        Self {
            reducer,
            environment: None,
            initial_state: None,
            actions: Vec::new(),
            state_assertions: Vec::new(),
            effect_assertions: Vec::new(),
        }
    }

    /// Set the environment for the test
    #[must_use]
    pub fn with_env(mut self, env: R::Environment) -> Self {
        self.environment = Some(env);
        self
    }

    /// Set the initial state (Given)
    #[must_use]
    pub fn given_state(mut self, state: R::State) -> Self {
        self.initial_state = Some(state);
        self
    }

    /// Queue an action (When); actions are reduced in call order
    #[must_use]
    pub fn when_action(mut self, action: R::Action) -> Self {
        self.actions.push(action);
        self
    }

    /// Add an assertion about the final state (Then)
    #[must_use]
    pub fn then_state<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&R::State) + 'static,
    {
        self.state_assertions.push(Box::new(assertion));
        self
    }

    /// Add an assertion about the effects of the last action (Then)
    #[must_use]
    pub fn then_effects<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&[Effect<R::Action>]) + 'static,
    {
        self.effect_assertions.push(Box::new(assertion));
        self
    }

    /// Run the test and execute all assertions
    ///
    /// # Panics
    ///
    /// Panics if the initial state, the environment or at least one action
    /// is missing, or if any assertion fails.
    #[allow(clippy::panic)] // Test code can panic
    #[allow(clippy::expect_used)] // Test code can use expect
    pub fn run(self) {
        let mut state = self
            .initial_state
            .expect("Initial state must be set with given_state()");
        let env = self
            .environment
            .expect("Environment must be set with with_env()");
        assert!(
            !self.actions.is_empty(),
            "At least one action must be set with when_action()"
        );

        let mut effects = Vec::new();
        for action in self.actions {
            effects = self.reducer.reduce(&mut state, action, &env).into_vec();
        }

        for assertion in self.state_assertions {
            assertion(&state);
        }
        for assertion in self.effect_assertions {
            assertion(&effects);
        }
    }
}

/// Helper assertions for effects
pub mod assertions {
    use chatai_core::effect::{Effect, EffectId};

    /// Assert that there are no effects
    ///
    /// # Panics
    ///
    /// Panics if any effect other than `Effect::None` is present.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_no_effects<A: std::fmt::Debug>(effects: &[Effect<A>]) {
        assert!(
            effects.iter().all(Effect::is_none),
            "Expected no effects, but found {}: {:?}",
            effects.len(),
            effects
        );
    }

    /// Assert the number of effects
    ///
    /// # Panics
    ///
    /// Panics if the number of effects doesn't match expected.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_effects_count<A>(effects: &[Effect<A>], expected: usize) {
        assert_eq!(
            effects.len(),
            expected,
            "Expected {} effects, but found {}",
            expected,
            effects.len()
        );
    }

    /// Assert that effects contain at least one Future effect (at any depth)
    ///
    /// # Panics
    ///
    /// Panics if no Future effect is found.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_has_future_effect<A>(effects: &[Effect<A>]) {
        assert!(
            effects.iter().any(contains_future),
            "Expected at least one Future effect, but none found"
        );
    }

    /// Assert that a cancellable effect with `id` is started
    ///
    /// # Panics
    ///
    /// Panics if no `Effect::Cancellable` with this id is found.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_starts<A>(effects: &[Effect<A>], id: EffectId) {
        assert!(
            effects.iter().any(|effect| starts(effect, id)),
            "Expected a cancellable effect `{id}`, but none found"
        );
    }

    /// Assert that the effect registered as `id` is cancelled
    ///
    /// # Panics
    ///
    /// Panics if no `Effect::Cancel(id)` is found.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_cancels<A>(effects: &[Effect<A>], id: EffectId) {
        assert!(
            effects.iter().any(|effect| cancels(effect, id)),
            "Expected `{id}` to be cancelled, but no cancel found"
        );
    }

    fn contains_future<A>(effect: &Effect<A>) -> bool {
        match effect {
            Effect::Future(_) => true,
            Effect::Cancellable { effect, .. } => contains_future(effect),
            Effect::Parallel(effects) | Effect::Sequential(effects) => {
                effects.iter().any(contains_future)
            },
            Effect::None | Effect::Stream(_) | Effect::Cancel(_) => false,
        }
    }

    fn starts<A>(effect: &Effect<A>, id: EffectId) -> bool {
        match effect {
            Effect::Cancellable { id: started, effect } => *started == id || starts(effect, id),
            Effect::Parallel(effects) | Effect::Sequential(effects) => {
                effects.iter().any(|effect| starts(effect, id))
            },
            Effect::None | Effect::Future(_) | Effect::Stream(_) | Effect::Cancel(_) => false,
        }
    }

    fn cancels<A>(effect: &Effect<A>, id: EffectId) -> bool {
        match effect {
            Effect::Cancel(cancelled) => *cancelled == id,
            Effect::Cancellable { effect, .. } => cancels(effect, id),
            Effect::Parallel(effects) | Effect::Sequential(effects) => {
                effects.iter().any(|effect| cancels(effect, id))
            },
            Effect::None | Effect::Future(_) | Effect::Stream(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatai_core::effect::EffectId;
    use chatai_core::{smallvec, SmallVec};

    const POLL: EffectId = EffectId::new("poll");

    #[derive(Clone, Debug, Default)]
    struct PollState {
        polling: bool,
    }

    #[derive(Clone, Debug)]
    enum PollAction {
        Start,
        Stop,
    }

    struct PollReducer;

    impl Reducer for PollReducer {
        type State = PollState;
        type Action = PollAction;
        type Environment = ();

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            _env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]> {
            match action {
                PollAction::Start => {
                    state.polling = true;
                    smallvec![Effect::Future(Box::pin(async { None })).cancellable(POLL)]
                },
                PollAction::Stop => {
                    state.polling = false;
                    smallvec![Effect::Cancel(POLL)]
                },
            }
        }
    }

    #[test]
    fn start_registers_cancellable_future() {
        ReducerTest::new(PollReducer)
            .with_env(())
            .given_state(PollState::default())
            .when_action(PollAction::Start)
            .then_state(|state| assert!(state.polling))
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
                assertions::assert_has_future_effect(effects);
                assertions::assert_starts(effects, POLL);
            })
            .run();
    }

    #[test]
    fn effects_come_from_the_last_action() {
        ReducerTest::new(PollReducer)
            .with_env(())
            .given_state(PollState::default())
            .when_action(PollAction::Start)
            .when_action(PollAction::Stop)
            .then_state(|state| assert!(!state.polling))
            .then_effects(|effects| assertions::assert_cancels(effects, POLL))
            .run();
    }

    #[test]
    fn no_effects_accepts_explicit_none() {
        assertions::assert_no_effects::<PollAction>(&[Effect::None]);
        assertions::assert_no_effects::<PollAction>(&[]);
    }
}
