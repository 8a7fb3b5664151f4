//! # ChatAI Core
//!
//! Core traits and types for the ChatAI client state architecture.
//!
//! Every screen of the client is driven by the Reducer pattern: a reducer
//! receives the current state and an action, mutates the state in place and
//! returns descriptions of the side effects it wants performed. The runtime
//! executes those effects and feeds the actions they produce back in.
//!
//! ## Core Concepts
//!
//! - **State**: Owned, cloneable data for a feature
//! - **Action**: Every input to a reducer (user intents and provider results)
//! - **Reducer**: `(State, Action, Environment) → (State, Effects)`
//! - **Effect**: Side effect descriptions (not execution)
//! - **Environment**: Injected dependencies (the session provider)
//!
//! ## Example
//!
//! ```
//! use chatai_core::{effect::Effect, reducer::Reducer, smallvec, SmallVec};
//!
//! #[derive(Clone, Debug, Default)]
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
//!     fn reduce(
//!         &self,
//!         state: &mut TabState,
//!         action: TabAction,
//!         _env: &(),
//!     ) -> SmallVec<[Effect<TabAction>; 4]> {
//!         match action {
//!             TabAction::Toggle => state.signing_up = !state.signing_up,
//!         }
//!         smallvec![Effect::None]
//!     }
//! }
//!
//! let mut state = TabState::default();
//! TabReducer.reduce(&mut state, TabAction::Toggle, &());
//! assert!(state.signing_up);
//! ```

pub use smallvec::{smallvec, SmallVec};

pub mod composition;

/// Reducer module - The core trait for client logic
///
/// Reducers are pure functions: `(State, Action, Environment) → (State, Effects)`.
/// They contain all navigation and validation logic and are deterministic and testable.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// The Reducer trait - core abstraction for client logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: The state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects
        ///
        /// This is a synchronous function that:
        /// 1. Updates state in place
        /// 2. Returns effect descriptions to be executed
        ///
        /// Most reducers return zero or one effect, hence the inline capacity.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effect module - Side effect descriptions
///
/// Effects describe side effects to be performed by the runtime.
/// They are values (not execution) and are composable and cancellable.
pub mod effect {
    use futures::{FutureExt, Stream, StreamExt};
    use std::fmt;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Arc;

    /// Identifier for a cancellable effect.
    ///
    /// Identifiers are static names so reducers can cancel an effect they
    /// started in an earlier action without keeping any handle in state.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EffectId(&'static str);

    impl EffectId {
        /// Create an effect identifier from a static name.
        #[must_use]
        pub const fn new(name: &'static str) -> Self {
            Self(name)
        }

        /// The name this identifier was created with.
        #[must_use]
        pub const fn name(self) -> &'static str {
            self.0
        }
    }

    impl fmt::Display for EffectId {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.0)
        }
    }

    /// Effect type - describes a side effect to be executed
    ///
    /// Effects are NOT executed immediately. They are descriptions of what should happen,
    /// returned from reducers and executed by the Store runtime.
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Run effects in parallel
        Parallel(Vec<Effect<Action>>),

        /// Run effects sequentially
        Sequential(Vec<Effect<Action>>),

        /// Arbitrary async computation
        ///
        /// Returns `Option<Action>` - if Some, the action is fed back into the reducer
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),

        /// Long-lived source of actions
        ///
        /// Every item is fed back into the reducer in delivery order. The stream
        /// is dropped when it ends or when its enclosing `Cancellable` is cancelled.
        Stream(Pin<Box<dyn Stream<Item = Action> + Send>>),

        /// Effect that can later be stopped with [`Effect::Cancel`]
        ///
        /// Starting a cancellable effect with an id that is still running
        /// cancels the previous one first.
        Cancellable {
            /// Identifier used to cancel
            id: EffectId,
            /// The wrapped effect
            effect: Box<Effect<Action>>,
        },

        /// Cancel the running effect registered under `id`, if any
        Cancel(EffectId),
    }

    impl<Action> fmt::Debug for Effect<Action>
    where
        Action: fmt::Debug,
    {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Parallel(effects) => {
                    f.debug_tuple("Effect::Parallel").field(effects).finish()
                },
                Effect::Sequential(effects) => {
                    f.debug_tuple("Effect::Sequential").field(effects).finish()
                },
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
                Effect::Stream(_) => write!(f, "Effect::Stream(<stream>)"),
                Effect::Cancellable { id, effect } => f
                    .debug_struct("Effect::Cancellable")
                    .field("id", id)
                    .field("effect", effect)
                    .finish(),
                Effect::Cancel(id) => f.debug_tuple("Effect::Cancel").field(id).finish(),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Combine effects to run in parallel
        #[must_use]
        pub const fn merge(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Parallel(effects)
        }

        /// Chain effects to run sequentially
        #[must_use]
        pub const fn chain(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Sequential(effects)
        }

        /// Wrap this effect so it can be cancelled with `id`
        #[must_use]
        pub fn cancellable(self, id: EffectId) -> Effect<Action> {
            Effect::Cancellable {
                id,
                effect: Box::new(self),
            }
        }

        /// `true` for [`Effect::None`]
        #[must_use]
        pub const fn is_none(&self) -> bool {
            matches!(self, Effect::None)
        }

        /// `true` if this effect contains a [`Effect::Stream`].
        ///
        /// Streams may never finish, so the runtime does not make callers
        /// wait on them.
        #[must_use]
        pub fn is_long_lived(&self) -> bool {
            match self {
                Effect::Stream(_) => true,
                Effect::Cancellable { effect, .. } => effect.is_long_lived(),
                Effect::Parallel(effects) | Effect::Sequential(effects) => {
                    effects.iter().any(Effect::is_long_lived)
                },
                Effect::None | Effect::Future(_) | Effect::Cancel(_) => false,
            }
        }
    }

    impl<Action> Effect<Action>
    where
        Action: Send + 'static,
    {
        /// Transform every action this effect produces.
        ///
        /// Used to embed a child reducer's effects into a parent action type.
        #[must_use]
        pub fn map<B, F>(self, f: F) -> Effect<B>
        where
            B: Send + 'static,
            F: Fn(Action) -> B + Send + Sync + 'static,
        {
            self.map_shared(Arc::new(f))
        }

        fn map_shared<B>(self, f: Arc<dyn Fn(Action) -> B + Send + Sync>) -> Effect<B>
        where
            B: Send + 'static,
        {
            match self {
                Effect::None => Effect::None,
                Effect::Parallel(effects) => Effect::Parallel(
                    effects
                        .into_iter()
                        .map(|effect| effect.map_shared(Arc::clone(&f)))
                        .collect(),
                ),
                Effect::Sequential(effects) => Effect::Sequential(
                    effects
                        .into_iter()
                        .map(|effect| effect.map_shared(Arc::clone(&f)))
                        .collect(),
                ),
                Effect::Future(fut) => {
                    Effect::Future(Box::pin(fut.map(move |action| action.map(|a| f(a)))))
                },
                Effect::Stream(stream) => Effect::Stream(Box::pin(stream.map(move |a| f(a)))),
                Effect::Cancellable { id, effect } => Effect::Cancellable {
                    id,
                    effect: Box::new(effect.map_shared(f)),
                },
                Effect::Cancel(id) => Effect::Cancel(id),
            }
        }
    }
}
