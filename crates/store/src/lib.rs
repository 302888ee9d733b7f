//! Persistent session and analytics store for the session bridge.
//!
//! Sessions are the authorization source of truth between validations;
//! analytics rows are an append-mostly audit trail that outlives them.

pub mod accounts;
pub mod analytics;
pub mod client;
pub mod config;
pub mod health;
pub mod schema;
pub mod sessions;

pub use client::SessionStore;
pub use config::StoreConfig;
pub use health::check_connection;
pub use schema::init_schema;
pub use sessions::CleanupOutcome;
