//! Background workers for the session bridge.
//!
//! Handles async maintenance:
//! - Cleanup (expired-session sweep and retention purge)
//! - Metrics flush (periodic structured-log snapshot)

pub mod cleanup;
pub mod scheduler;

pub use cleanup::CleanupWorker;
pub use scheduler::*;
