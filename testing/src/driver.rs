//! Deterministic effect execution for tests
//!
//! [`EffectDriver`] runs a reducer the way the Store does, but on the test's
//! own task: futures are awaited one at a time in the order they were
//! produced and stream items are pulled only when [`EffectDriver::settle`]
//! is called. Tests can therefore send an action while an earlier effect is
//! still queued and observe exactly how late results are handled.

use chatai_core::{
    effect::{Effect, EffectId},
    reducer::Reducer,
};
use futures::{FutureExt, Stream, StreamExt};
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;

type QueuedFuture<A> = Pin<Box<dyn Future<Output = Option<A>> + Send>>;
type QueuedStream<A> = Pin<Box<dyn Stream<Item = A> + Send>>;

struct Queued<T> {
    id: Option<EffectId>,
    work: T,
}

/// Single-task stand-in for the Store runtime.
///
/// Cancellation follows the Store: `Effect::Cancel(id)` drops every queued
/// future and stream started under `id`, and starting a cancellable effect
/// under an id that is still queued drops the older one first.
pub struct EffectDriver<R>
where
    R: Reducer,
{
    reducer: R,
    state: R::State,
    environment: R::Environment,
    futures: VecDeque<Queued<QueuedFuture<R::Action>>>,
    streams: Vec<Queued<QueuedStream<R::Action>>>,
    received: Vec<R::Action>,
}

impl<R> EffectDriver<R>
where
    R: Reducer,
    R::Action: Clone,
{
    /// Create a driver over `reducer` starting from `state`.
    #[must_use]
    pub fn new(reducer: R, state: R::State, environment: R::Environment) -> Self {
        Self {
            reducer,
            state,
            environment,
            futures: VecDeque::new(),
            streams: Vec::new(),
            received: Vec::new(),
        }
    }

    /// Reduce `action` and queue the effects it returns.
    ///
    /// Nothing runs until [`EffectDriver::settle`] is awaited.
    pub fn send(&mut self, action: R::Action) {
        let effects = self
            .reducer
            .reduce(&mut self.state, action, &self.environment);
        for effect in effects {
            self.enqueue(effect, None);
        }
    }

    /// Run queued work until nothing is ready.
    ///
    /// Futures are awaited to completion in FIFO order; streams are polled
    /// without blocking, so an open subscription with no pending item does
    /// not keep this call alive.
    pub async fn settle(&mut self) {
        loop {
            if let Some(queued) = self.futures.pop_front() {
                if let Some(action) = queued.work.await {
                    self.feed_back(action);
                }
                continue;
            }
            if !self.pump_one_stream_item() {
                break;
            }
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> &R::State {
        &self.state
    }

    /// The injected environment, e.g. to drive a mock provider.
    #[must_use]
    pub const fn environment(&self) -> &R::Environment {
        &self.environment
    }

    /// `true` while a future or stream started under `id` is queued.
    #[must_use]
    pub fn is_running(&self, id: EffectId) -> bool {
        self.futures.iter().any(|queued| queued.id == Some(id))
            || self.streams.iter().any(|queued| queued.id == Some(id))
    }

    /// Number of queued futures plus open streams.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.futures.len() + self.streams.len()
    }

    /// Actions produced by effects, in the order they were fed back.
    #[must_use]
    pub fn received(&self) -> &[R::Action] {
        &self.received
    }

    /// Drop every queued future and stream. Mirrors Store shutdown.
    pub fn shutdown(&mut self) {
        self.futures.clear();
        self.streams.clear();
    }

    fn feed_back(&mut self, action: R::Action) {
        self.received.push(action.clone());
        self.send(action);
    }

    /// Pull one ready item from the first stream that has one.
    ///
    /// Returns `false` when no stream made progress.
    fn pump_one_stream_item(&mut self) -> bool {
        for index in 0..self.streams.len() {
            let polled = self.streams[index].work.next().now_or_never();
            match polled {
                Some(Some(action)) => {
                    // Reducing may cancel or start streams; rescan afterwards.
                    self.feed_back(action);
                    return true;
                },
                Some(None) => {
                    self.streams.remove(index);
                    return true;
                },
                None => {},
            }
        }
        false
    }

    fn enqueue(&mut self, effect: Effect<R::Action>, id: Option<EffectId>) {
        match effect {
            Effect::None => {},
            Effect::Parallel(effects) | Effect::Sequential(effects) => {
                for effect in effects {
                    self.enqueue(effect, id);
                }
            },
            Effect::Future(work) => self.futures.push_back(Queued { id, work }),
            Effect::Stream(work) => self.streams.push(Queued { id, work }),
            Effect::Cancellable { id, effect } => {
                self.cancel(id);
                self.enqueue(*effect, Some(id));
            },
            Effect::Cancel(id) => self.cancel(id),
        }
    }

    fn cancel(&mut self, id: EffectId) {
        self.futures.retain(|queued| queued.id != Some(id));
        self.streams.retain(|queued| queued.id != Some(id));
    }
}
