//! Core types, roles, and token handling for the session bridge.

pub mod device;
pub mod error;
pub mod identity;
pub mod role;
pub mod session;
pub mod token;

pub use device::*;
pub use error::{AuthErrorCode, DbErrorCode, Error, Result, ValidationErrorCode};
pub use identity::*;
pub use role::Role;
pub use session::*;
pub use token::hash_token;
