//! Client-side session handle for the session bridge.
//!
//! Drives the three-step login handshake (external login, external decode,
//! bridge create-session), keeps the token set in pluggable storage, and
//! runs the periodic revalidate/refresh loop a browser session would.

pub mod config;
pub mod handle;
pub mod storage;
mod wire;

pub use config::AuthClientConfig;
pub use handle::{AuthHandle, AuthState};
pub use storage::{MemoryStorage, TokenStorage};
