//! Mock provider implementations for testing.
//!
//! This module provides a simple, in-memory implementation of the
//! session provider trait for use in unit and integration tests.

pub mod session;

pub use session::{mock_session, MockBehavior, MockMethod, MockSessionProvider, ProviderCall};
