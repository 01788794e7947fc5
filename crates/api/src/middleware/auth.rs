//! Authenticated identity extractors.
//!
//! The auth collaborator (login, token exchange, OAuth - all external to
//! this service) places the identity claims into the session; every core
//! operation receives them through these extractors and never authenticates
//! directly.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use maplemart_core::{Email, UserId, UserRole};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::error::ApiError;

/// Session keys used by the identity plumbing.
pub mod session_keys {
    /// Identity claims of the authenticated caller.
    pub const CURRENT_USER: &str = "maplemart.current_user";
}

/// Identity claims supplied by the auth collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub email: Email,
    pub role: UserRole,
}

/// Extractor that requires an authenticated caller.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     format!("hello {}", user.email)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // The session is placed in extensions by SessionManagerLayer.
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or(ApiError::Unauthorized)?;

        let user: CurrentUser = session
            .get(session_keys::CURRENT_USER)
            .await
            .ok()
            .flatten()
            .ok_or(ApiError::Unauthorized)?;

        Ok(Self(user))
    }
}

/// Extractor that additionally requires the admin role.
pub struct RequireAdmin(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let RequireAuth(user) = RequireAuth::from_request_parts(parts, state).await?;
        if !user.role.is_admin() {
            return Err(ApiError::Forbidden(
                "admin role required for this route".to_owned(),
            ));
        }
        Ok(Self(user))
    }
}

/// Store the caller's identity claims in the session.
///
/// Called by the external auth flow after it has verified the user.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Clear the caller's identity claims from the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(
    session: &Session,
) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CurrentUser>(session_keys::CURRENT_USER)
        .await?;
    Ok(())
}
