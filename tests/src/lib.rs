//! Shared helpers for session bridge integration tests.

pub mod fixtures;
pub mod setup;
