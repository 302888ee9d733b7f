//! Authorization guards over the extracted auth context.

use bridge_core::{AuthenticatedUser, AuthErrorCode, Result, Role};
use session_store::SessionStore;
use tracing::warn;

use crate::extractors::AuthContext;
use crate::response::ApiError;

/// Require an authenticated session.
///
/// AUTH_001 when no token was presented, AUTH_002 for everything else;
/// expired, revoked and unknown sessions are indistinguishable.
pub fn require_auth(ctx: &AuthContext) -> std::result::Result<&AuthenticatedUser, ApiError> {
    match &ctx.user {
        Some(user) => Ok(user),
        None if !ctx.token_presented => Err(ApiError::unauthorized(
            AuthErrorCode::MissingToken.code(),
            "Authentication required",
        )),
        None => Err(ApiError::unauthorized(
            AuthErrorCode::InvalidSession.code(),
            "Invalid session",
        )),
    }
}

/// Role check over the fixed hierarchy: a role satisfies itself and every
/// role below it.
pub fn has_role(user: &AuthenticatedUser, required: Role) -> bool {
    user.role.satisfies(required)
}

/// Require an authenticated session holding at least `required`.
pub fn require_role(
    ctx: &AuthContext,
    required: Role,
) -> std::result::Result<&AuthenticatedUser, ApiError> {
    let user = require_auth(ctx)?;

    if !has_role(user, required) {
        return Err(ApiError::forbidden(format!(
            "Requires {} role",
            required
        )));
    }

    Ok(user)
}

/// Make sure the local shadow account exists for an authenticated user.
/// Failures are logged and swallowed; the account row is a convenience,
/// not an authorization dependency.
pub async fn ensure_account_exists(store: &SessionStore, user: &AuthenticatedUser) -> Result<()> {
    if let Err(e) = store.upsert_account(user).await {
        warn!(user_id = %user.id, error = %e, "Account upsert failed");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use chrono::Utc;

    fn user(role: Role) -> AuthenticatedUser {
        AuthenticatedUser {
            id: "42".into(),
            email: "a@b.c".into(),
            name: "A B".into(),
            role,
        }
    }

    fn ctx(user: Option<AuthenticatedUser>, token_presented: bool) -> AuthContext {
        AuthContext {
            session_id: user.as_ref().map(|_| "s-1".to_string()),
            expires: user.as_ref().map(|_| Utc::now()),
            user,
            token_presented,
        }
    }

    #[test]
    fn test_missing_token_is_auth_001() {
        let err = require_auth(&ctx(None, false)).unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
        assert_eq!(err.response.code, "AUTH_001");
    }

    #[test]
    fn test_invalid_session_is_auth_002() {
        let err = require_auth(&ctx(None, true)).unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
        assert_eq!(err.response.code, "AUTH_002");
    }

    #[test]
    fn test_role_hierarchy_is_transitive() {
        let admin = user(Role::Admin);
        assert!(has_role(&admin, Role::Viewer));
        assert!(has_role(&admin, Role::Admin));

        let agent = user(Role::Agent);
        assert!(has_role(&agent, Role::Viewer));
        assert!(!has_role(&agent, Role::Supervisor));
    }

    #[test]
    fn test_require_role_rejects_with_403() {
        let context = ctx(Some(user(Role::Agent)), true);
        let err = require_role(&context, Role::Admin).unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);
        assert_eq!(err.response.code, "AUTH_005");

        assert!(require_role(&context, Role::Agent).is_ok());
    }
}
