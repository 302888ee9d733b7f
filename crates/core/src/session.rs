//! Session and analytics records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::identity::AuthenticatedUser;
use crate::role::Role;

/// A bridged session, keyed externally by its opaque `session_token`.
///
/// The user fields are a denormalized snapshot taken at creation time;
/// the row itself is the authorization source of truth until the next
/// validation.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Internal row id
    pub id: String,
    /// Opaque random token handed to the client
    pub session_token: String,
    /// Identity key in the external auth system, not a local user row
    #[validate(length(min = 1, max = 128))]
    pub external_user_id: String,
    pub user_email: String,
    pub user_name: String,
    pub user_role: Role,
    /// Absolute expiry, taken from the external token's exp claim
    pub expires: DateTime<Utc>,
    /// One-way digest of the access token, never the raw token
    pub token_hash: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub device_info: String,
    /// Soft state; revocation flips this and retains the row
    pub is_active: bool,
    pub revoked_at: Option<DateTime<Utc>>,
    pub revoked_by: Option<String>,
    pub revoke_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
}

impl Session {
    /// A session is valid iff it is active and unexpired.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.expires > now
    }

    /// Project the cached identity snapshot.
    pub fn user(&self) -> AuthenticatedUser {
        AuthenticatedUser {
            id: self.external_user_id.clone(),
            email: self.user_email.clone(),
            name: self.user_name.clone(),
            role: self.user_role,
        }
    }
}

/// Append-mostly audit record, one per session.
///
/// Deliberately not foreign-keyed to the session row: the cleanup sweep
/// purges old sessions while analytics rows are kept forever.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionAnalytics {
    pub id: String,
    pub session_id: String,
    pub external_user_id: String,
    pub user_email: String,
    pub user_name: String,
    pub user_role: Role,
    pub login_time: DateTime<Utc>,
    /// Set exactly once at session end
    pub logout_time: Option<DateTime<Utc>>,
    /// Whole seconds between login and logout
    pub duration: Option<i64>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub device_type: String,
}

/// Public summary returned by session creation. Never carries the token hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedSession {
    pub session_id: String,
    pub session_token: String,
    pub user: AuthenticatedUser,
    pub expires: DateTime<Utc>,
}

/// Public summary returned by a successful validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: String,
    pub user: AuthenticatedUser,
    pub expires: DateTime<Utc>,
}
