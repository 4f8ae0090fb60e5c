//! Authentication extractors for Axum routes.
//!
//! These are the guards other route handlers depend on to obtain verified
//! user claims:
//! - `RequireAuth`: session-authenticated user or a 401 rejection
//! - `OptionalAuth`: session-authenticated user, if any; never rejects
//! - `BearerAuth`: validates an `Authorization: Bearer` access token
//!   directly against the provider key set, independent of any session

use axum::{
    Json,
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, header, request::Parts},
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use gatehouse_identity::{SessionId, UserClaims};
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

use super::{AppState, routes::SESSION_COOKIE, validator::validate_access_token};

/// Extractor for requiring a session-authenticated user.
pub struct RequireAuth(pub UserClaims);

impl<S> FromRequestParts<S> for RequireAuth
where
    Arc<AppState>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = Arc::<AppState>::from_ref(state);
        let jar = CookieJar::from_request_parts(parts, state)
            .await
            .map_err(|_| AuthRejection::InternalError)?;

        let session_cookie = jar
            .get(SESSION_COOKIE)
            .ok_or(AuthRejection::NotAuthenticated)?;
        let session_id = SessionId::new(session_cookie.value().to_string());

        let session = app_state
            .sessions
            .get(&session_id)
            .ok_or(AuthRejection::NotAuthenticated)?;

        let user = session
            .user()
            .cloned()
            .ok_or(AuthRejection::NotAuthenticated)?;

        Ok(RequireAuth(user))
    }
}

/// Extractor for optionally getting the session-authenticated user.
///
/// Returns `None` if the request carries no authenticated session.
pub struct OptionalAuth(pub Option<UserClaims>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    Arc<AppState>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match RequireAuth::from_request_parts(parts, state).await {
            Ok(RequireAuth(user)) => Ok(OptionalAuth(Some(user))),
            Err(_) => Ok(OptionalAuth(None)),
        }
    }
}

/// Extractor validating a bearer access token from the Authorization
/// header, bypassing the session entirely.
pub struct BearerAuth(pub UserClaims);

impl<S> FromRequestParts<S> for BearerAuth
where
    Arc<AppState>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = Arc::<AppState>::from_ref(state);

        let authorization = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(AuthRejection::NotAuthenticated)?;

        let token = authorization
            .strip_prefix("Bearer ")
            .or_else(|| authorization.strip_prefix("bearer "))
            .ok_or(AuthRejection::NotAuthenticated)?;

        let user = validate_access_token(app_state.provider.config(), &app_state.keys, token)
            .await
            .map_err(|e| {
                debug!(error = %e, "Bearer token rejected");
                AuthRejection::NotAuthenticated
            })?;

        Ok(BearerAuth(user))
    }
}

/// Rejection type for authentication extractors.
#[derive(Debug)]
pub enum AuthRejection {
    NotAuthenticated,
    InternalError,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::NotAuthenticated => (
                StatusCode::UNAUTHORIZED,
                Json(json!({"success": false, "error": "Authentication required"})),
            )
                .into_response(),
            Self::InternalError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"success": false, "error": "Internal server error"})),
            )
                .into_response(),
        }
    }
}
