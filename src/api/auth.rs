//! Authentication boundary.
//!
//! Authentication itself happens upstream; a trusted proxy injects the
//! caller's identity as `x-auth-user` (email) and `x-auth-roles`
//! (comma-separated global roles). [`AuthUser`] reads those headers and
//! rejects requests that arrive without them.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::error::GatewayError;

/// Header carrying the authenticated caller's email.
pub const AUTH_USER_HEADER: &str = "x-auth-user";
/// Header carrying the caller's comma-separated global roles.
pub const AUTH_ROLES_HEADER: &str = "x-auth-roles";

const ADMIN_ROLE: &str = "ADMIN";

/// The authenticated caller, as asserted by the upstream auth layer.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// Directory email of the caller.
    pub email: String,
    /// Global roles attached by the upstream layer.
    pub roles: Vec<String>,
}

impl AuthUser {
    /// Whether the caller carries the global admin role, which bypasses
    /// per-event staff checks.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.roles.iter().any(|role| role == ADMIN_ROLE)
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = GatewayError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let email = parts
            .headers
            .get(AUTH_USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                GatewayError::Unauthenticated("missing authenticated user identity".to_string())
            })?
            .to_string();

        let roles = parts
            .headers
            .get(AUTH_ROLES_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|r| !r.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self { email, roles })
    }
}

/// Admits the caller to a staff-only endpoint for one event.
///
/// Global admins pass unconditionally; everyone else must hold a
/// per-event role (manager or staff).
///
/// # Errors
///
/// - [`GatewayError::Unauthenticated`] — the asserted email resolves to
///   no directory user.
/// - [`GatewayError::Forbidden`] — no per-event role.
/// - [`GatewayError::PersistenceError`] — directory lookup failure.
pub async fn require_event_staff(
    state: &AppState,
    auth: &AuthUser,
    event_id: Uuid,
) -> Result<(), GatewayError> {
    if auth.is_admin() {
        return Ok(());
    }

    let user = state
        .users
        .find_by_email(&auth.email)
        .await?
        .ok_or_else(|| {
            GatewayError::Unauthenticated("authenticated user does not exist".to_string())
        })?;

    match state.roles.role_of(event_id, user.id).await? {
        Some(_) => Ok(()),
        None => {
            tracing::warn!(email = %auth.email, %event_id, "staff endpoint denied");
            Err(GatewayError::Forbidden(
                "event staff role required".to_string(),
            ))
        }
    }
}
