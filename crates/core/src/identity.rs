//! External identity payloads and the derived user projection.
//!
//! Identity truth lives in the external auth microservice; the types here
//! are the wire shapes it returns plus the transient projection the rest of
//! the service consumes. There is deliberately no local user table backing
//! authorization decisions.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::role::Role;

/// Profile claims inside the decoded token payload.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Profile {
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[validate(email)]
    pub email: String,
}

/// Decoded identity claims from the external decode endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DecodedTokenPayload {
    pub user_id: i64,
    /// Token expiry as unix seconds.
    pub exp: i64,
    #[serde(default)]
    pub roles: Vec<String>,
    #[validate(nested)]
    pub profile: Profile,
}

impl DecodedTokenPayload {
    /// Display name: "first last" trimmed, falling back to the username
    /// when both name parts are blank.
    pub fn display_name(&self) -> String {
        let name = format!("{} {}", self.profile.first_name, self.profile.last_name)
            .trim()
            .to_string();
        if name.is_empty() {
            self.profile.username.clone()
        } else {
            name
        }
    }

    /// The external user id in the string form used for session linkage.
    pub fn external_user_id(&self) -> String {
        self.user_id.to_string()
    }

    /// Collapse the roles claim to the stored coarse role.
    pub fn role(&self) -> Role {
        Role::from_external(&self.roles)
    }
}

/// Bearer token pair issued by the external auth microservice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Transient authenticated-user projection. Not persisted; `id` is the
/// external user id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
}

/// Optional client metadata captured at session creation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfo {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}
