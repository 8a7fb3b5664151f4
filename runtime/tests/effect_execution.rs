//! Integration tests for effect execution in the Store runtime
//!
//! Futures and streams feed actions back in order, cancellable effects are
//! released on cancel and on shutdown, and handles ignore long-lived streams.

#![allow(clippy::unwrap_used, clippy::panic)]

use chatai_core::{
    effect::{Effect, EffectId},
    reducer::Reducer,
    smallvec, SmallVec,
};
use chatai_runtime::{Store, StoreError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

const FEED: EffectId = EffectId::new("feed");

#[derive(Debug, Clone, Default)]
struct FeedState {
    received: Vec<u32>,
    finished: bool,
}

#[derive(Debug, Clone, PartialEq)]
enum FeedAction {
    Fetch,
    Fetched(u32),
    Listen { items: Vec<u32> },
    ListenForever,
    Item(u32),
    Stop,
}

/// Drop flag standing in for a provider subscription guard.
struct ReleaseFlag(Arc<AtomicBool>);

impl Drop for ReleaseFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

#[derive(Clone, Default)]
struct FeedEnv {
    released: Arc<AtomicBool>,
}

struct FeedReducer;

impl Reducer for FeedReducer {
    type State = FeedState;
    type Action = FeedAction;
    type Environment = FeedEnv;

    fn reduce(
        &self,
        state: &mut FeedState,
        action: FeedAction,
        env: &FeedEnv,
    ) -> SmallVec<[Effect<FeedAction>; 4]> {
        match action {
            FeedAction::Fetch => smallvec![Effect::Future(Box::pin(async {
                tokio::time::sleep(Duration::from_millis(5)).await;
                Some(FeedAction::Fetched(7))
            }))],
            FeedAction::Fetched(n) => {
                state.received.push(n);
                state.finished = true;
                smallvec![Effect::None]
            },
            FeedAction::Listen { items } => smallvec![Effect::Stream(Box::pin(
                futures::stream::iter(items.into_iter().map(FeedAction::Item))
            ))
            .cancellable(FEED)],
            FeedAction::ListenForever => {
                let flag = ReleaseFlag(Arc::clone(&env.released));
                smallvec![Effect::Stream(Box::pin(async_stream_like(flag))).cancellable(FEED)]
            },
            FeedAction::Item(n) => {
                state.received.push(n);
                smallvec![Effect::None]
            },
            FeedAction::Stop => smallvec![Effect::Cancel(FEED)],
        }
    }
}

/// A stream that yields one item, then stays open while owning `flag`.
fn async_stream_like(flag: ReleaseFlag) -> impl futures::Stream<Item = FeedAction> + Send {
    futures::stream::unfold((flag, false), |(flag, sent)| async move {
        if sent {
            std::future::pending::<()>().await;
            None
        } else {
            Some((FeedAction::Item(1), (flag, true)))
        }
    })
}

async fn eventually<F>(store: &Store<FeedState, FeedAction, FeedEnv, FeedReducer>, check: F)
where
    F: Fn(&FeedState) -> bool + Copy,
{
    for _ in 0..200 {
        if store.state(check).await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("state never reached the expected condition");
}

#[tokio::test]
async fn future_effect_feeds_back_before_handle_completes() {
    let store = Store::new(FeedState::default(), FeedReducer, FeedEnv::default());

    let mut handle = store.send(FeedAction::Fetch).await.unwrap();
    handle.wait_with_timeout(Duration::from_secs(1)).await.unwrap();

    assert_eq!(store.state(|s| s.received.clone()).await, vec![7]);
}

#[tokio::test]
async fn stream_items_are_reduced_in_order() {
    let store = Store::new(FeedState::default(), FeedReducer, FeedEnv::default());

    store
        .send(FeedAction::Listen { items: vec![1, 2, 3, 4] })
        .await
        .unwrap();

    eventually(&store, |s| s.received.len() == 4).await;
    assert_eq!(store.state(|s| s.received.clone()).await, vec![1, 2, 3, 4]);
}

#[tokio::test]
async fn handle_does_not_wait_on_long_lived_streams() {
    let env = FeedEnv::default();
    let store = Store::new(FeedState::default(), FeedReducer, env);

    let mut handle = store.send(FeedAction::ListenForever).await.unwrap();
    assert!(handle.wait_with_timeout(Duration::from_millis(50)).await.is_ok());
    assert!(store.is_running(FEED));
}

#[tokio::test]
async fn cancel_drops_the_running_stream() {
    let env = FeedEnv::default();
    let released = Arc::clone(&env.released);
    let store = Store::new(FeedState::default(), FeedReducer, env);

    store.send(FeedAction::ListenForever).await.unwrap();
    eventually(&store, |s| s.received == vec![1]).await;
    assert!(!released.load(Ordering::SeqCst));

    store.send(FeedAction::Stop).await.unwrap();
    for _ in 0..100 {
        if released.load(Ordering::SeqCst) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(released.load(Ordering::SeqCst));
    assert!(!store.is_running(FEED));
}

#[tokio::test]
async fn shutdown_cancels_streams_and_rejects_actions() {
    let env = FeedEnv::default();
    let released = Arc::clone(&env.released);
    let store = Store::new(FeedState::default(), FeedReducer, env);

    store.send(FeedAction::ListenForever).await.unwrap();
    store.shutdown(Duration::from_secs(1)).await.unwrap();

    assert!(released.load(Ordering::SeqCst));
    assert!(matches!(
        store.send(FeedAction::Fetch).await,
        Err(StoreError::ShutdownInProgress)
    ));
}

#[tokio::test]
async fn send_and_wait_for_returns_produced_action() {
    let store = Store::new(FeedState::default(), FeedReducer, FeedEnv::default());

    let action = store
        .send_and_wait_for(
            FeedAction::Fetch,
            |a| matches!(a, FeedAction::Fetched(_)),
            Duration::from_secs(1),
        )
        .await
        .unwrap();

    assert_eq!(action, FeedAction::Fetched(7));
    assert!(store.state(|s| s.finished).await);
}
