//! The composed application running in the Store runtime.

#![allow(clippy::unwrap_used, clippy::panic)]

use chatai_app::{AppAction, AppReducer, AppState, RouterAction, Screen};
use chatai_auth::mocks::{mock_session, MockMethod, MockSessionProvider};
use chatai_auth::{AuthAction, AuthContext, AuthSettings, UserMetadata};
use chatai_runtime::Store;
use std::time::Duration;

type AppStore = Store<
    AppState,
    AppAction,
    AuthContext<MockSessionProvider>,
    AppReducer<MockSessionProvider>,
>;

fn store(provider: &MockSessionProvider) -> AppStore {
    Store::new(
        AppState::default(),
        AppReducer::new(),
        AuthContext::new(provider.clone(), AuthSettings::default()),
    )
}

async fn eventually<F>(store: &AppStore, check: F)
where
    F: Fn(&AppState) -> bool + Copy,
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
async fn chat_session_round_trip() {
    let provider = MockSessionProvider::with_session(mock_session("a@b.com", UserMetadata::default()));
    let store = store(&provider);

    store.send(AppAction::Auth(AuthAction::Mount)).await.unwrap();
    eventually(&store, |s| matches!(s.screen(), Screen::Chat(_))).await;
    eventually(&store, |_| provider.subscriber_count() == 1).await;

    store.send(AppAction::Router(RouterAction::Logout)).await.unwrap();
    assert_eq!(store.state(AppState::screen).await, Screen::Landing);

    eventually(&store, |s| s.auth.user.is_none()).await;
    assert_eq!(provider.call_count(MockMethod::SignOut), 1);

    store.send(AppAction::Auth(AuthAction::Unmount)).await.unwrap();
    store.shutdown(Duration::from_secs(1)).await.unwrap();
}
