//! # ChatAI Testing
//!
//! Testing utilities and helpers for the ChatAI client state architecture.
//!
//! This crate provides:
//! - [`ReducerTest`]: Given-When-Then assertions for a single reducer
//! - [`EffectDriver`]: a deterministic, single-task stand-in for the Store
//!   that runs effects in order and lets tests interleave actions with them
//! - [`assertions`]: effect assertion helpers
//! - [`init_test_tracing`]: opt-in log output for tests
//!
//! ## Example
//!
//! ```ignore
//! use chatai_testing::EffectDriver;
//!
//! #[tokio::test]
//! async fn session_fetch_resolves_loading() {
//!     let mut driver = EffectDriver::new(AuthReducer::new(), AuthState::default(), context);
//!     driver.send(AuthAction::Mount);
//!     driver.settle().await;
//!     assert!(!driver.state().loading);
//! }
//! ```

mod driver;
mod reducer_test;

pub use driver::EffectDriver;
pub use reducer_test::{assertions, ReducerTest};

/// Install a test-friendly tracing subscriber.
///
/// Honors `RUST_LOG`; output goes through the test harness writer so it is
/// only shown for failing tests. Safe to call from every test.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_test_writer()
        .try_init();
}
