//! Authentication routes: login, callback, introspection, and logout.
//!
//! `/login`, `/callback`, and `/logout` drive the browser through the
//! provider redirect flow; `/me`, `/token`, and `/check` are JSON
//! introspection endpoints that never fail visibly — they downgrade every
//! problem to a `{success: false}` payload.

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Duration as ChronoDuration;
use gatehouse_identity::{
    AuthenticationError, SessionData, SessionId, UserClaims, session::random_token,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use time::Duration as TimeDuration;
use tracing::{debug, error, info, warn};

use super::{AppState, validator::validate_access_token};

/// Session cookie name.
pub const SESSION_COOKIE: &str = "session";

/// Query parameters for the login route.
#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    /// Where to send the browser after a successful callback.
    redirect_url: Option<String>,
}

/// Query parameters for the OAuth2 callback.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    code: String,
    state: String,
}

/// JSON payload for the introspection endpoints.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<UserClaims>,
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl AuthResponse {
    fn user(user: UserClaims) -> Self {
        Self {
            success: true,
            user: Some(user),
            token: None,
            error: None,
        }
    }

    fn user_with_token(user: UserClaims, token: String) -> Self {
        Self {
            success: true,
            user: Some(user),
            token: Some(token),
            error: None,
        }
    }

    fn logged_out() -> Self {
        Self {
            success: true,
            user: None,
            token: None,
            error: None,
        }
    }

    fn failure(message: &str) -> Self {
        Self {
            success: false,
            user: None,
            token: None,
            error: Some(message.to_string()),
        }
    }
}

/// JSON payload for the unauthenticated-safe check endpoint.
#[derive(Debug, Serialize)]
pub struct CheckResponse {
    authenticated: bool,
    user: Option<UserClaims>,
}

/// Builds the authentication router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/auth/login", get(login))
        .route("/auth/callback", get(callback))
        .route("/auth/me", get(me))
        .route("/auth/logout", post(logout))
        .route("/auth/token", get(token))
        .route("/auth/check", get(check))
        .with_state(state)
}

/// Initiates the login flow by redirecting to the identity provider.
///
/// A fresh session record replaces whatever the cookie pointed at, so a
/// login attempt can never ride on a fixated session ID.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LoginQuery>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AuthError> {
    let csrf_state = random_token();
    let auth_url = state.provider.authorization_url(&csrf_state)?;

    let mut session = SessionData::new(ChronoDuration::minutes(
        state.session_config.duration_minutes,
    ));
    session.set_csrf_state(csrf_state);
    if let Some(redirect_url) = query.redirect_url {
        session.set_redirect_url(redirect_url);
    }

    let session_id = SessionId::generate();
    state.sessions.insert(session_id.clone(), session);

    let cookie = session_cookie(
        session_id.as_str().to_string(),
        &state,
        TimeDuration::minutes(state.session_config.duration_minutes),
    );

    debug!("Login initiated, redirecting to identity provider");
    Ok((jar.add(cookie), Redirect::to(&auth_url)))
}

/// Handles the provider callback: checks the CSRF state, exchanges the
/// code, validates the token, and authenticates the session.
pub async fn callback(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CallbackQuery>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AuthError> {
    let session_cookie = jar
        .get(SESSION_COOKIE)
        .ok_or(AuthenticationError::StateMismatch)?;
    let session_id = SessionId::new(session_cookie.value().to_string());

    let mut session = state
        .sessions
        .get(&session_id)
        .ok_or(AuthenticationError::StateMismatch)?;

    // Spend the stored state before comparing it: a callback attempt
    // always consumes the value, matched or not.
    let stored_state = session.take_csrf_state();
    state.sessions.insert(session_id.clone(), session.clone());

    let stored_state = stored_state.ok_or(AuthenticationError::StateMismatch)?;
    if stored_state != query.state {
        warn!("Callback state does not match the stored login state");
        return Err(AuthenticationError::StateMismatch.into());
    }

    let token_response = state.provider.exchange_code(&query.code).await?;
    let access_token = token_response.access_token;

    let user =
        validate_access_token(state.provider.config(), &state.keys, &access_token).await?;

    info!(subject = %user.subject, "Login completed");
    session.authenticate(user, access_token);
    let target = session
        .take_redirect_url()
        .unwrap_or_else(|| "/".to_string());
    state.sessions.insert(session_id, session);

    Ok(Redirect::to(&target))
}

/// Returns the authenticated user from the session, if any.
///
/// Never fails: problems downgrade to a `{success: false}` payload.
pub async fn me(State(state): State<Arc<AppState>>, jar: CookieJar) -> Json<AuthResponse> {
    match session_user(&state, &jar) {
        Some(user) => Json(AuthResponse::user(user)),
        None => Json(AuthResponse::failure("Not authenticated")),
    }
}

/// Clears the session and redirects to the provider logout endpoint.
///
/// Logout never fails visibly: when the logout URL cannot be built the
/// session is still cleared and a success payload is returned.
pub async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        let session_id = SessionId::new(cookie.value().to_string());
        if state.sessions.remove(&session_id).is_some() {
            info!("Session cleared on logout");
        }
    }

    // Expire the cookie regardless of whether a session existed.
    let removal = Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .max_age(TimeDuration::ZERO);
    let jar = jar.add(removal);

    match state.provider.logout_url() {
        Ok(url) => (jar, Redirect::to(&url)).into_response(),
        Err(e) => {
            warn!(error = %e, "Could not build provider logout URL");
            (jar, Json(AuthResponse::logged_out())).into_response()
        }
    }
}

/// Returns the user and access token when both are present in the session.
pub async fn token(State(state): State<Arc<AppState>>, jar: CookieJar) -> Json<AuthResponse> {
    let authenticated = current_session(&state, &jar)
        .and_then(|(_, session)| session.authenticated().cloned());

    match authenticated {
        Some(auth) => Json(AuthResponse::user_with_token(auth.user, auth.access_token)),
        None => Json(AuthResponse::failure("Not authenticated")),
    }
}

/// Unauthenticated-safe session check.
pub async fn check(State(state): State<Arc<AppState>>, jar: CookieJar) -> Json<CheckResponse> {
    let user = session_user(&state, &jar);
    Json(CheckResponse {
        authenticated: user.is_some(),
        user,
    })
}

/// Looks up the live session behind the request's cookie.
fn current_session(state: &AppState, jar: &CookieJar) -> Option<(SessionId, SessionData)> {
    let cookie = jar.get(SESSION_COOKIE)?;
    let session_id = SessionId::new(cookie.value().to_string());
    let session = state.sessions.get(&session_id)?;
    Some((session_id, session))
}

/// Returns the authenticated user behind the request's cookie, if any.
fn session_user(state: &AppState, jar: &CookieJar) -> Option<UserClaims> {
    current_session(state, jar).and_then(|(_, session)| session.user().cloned())
}

/// Builds the session cookie.
fn session_cookie(value: String, state: &AppState, max_age: TimeDuration) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, value))
        .path("/")
        .http_only(true)
        .secure(state.session_config.secure_cookies)
        .same_site(SameSite::Lax)
        .max_age(max_age)
        .build()
}

/// Route-layer error wrapper mapping the error taxonomy to HTTP statuses.
#[derive(Debug)]
pub struct AuthError(AuthenticationError);

impl From<AuthenticationError> for AuthError {
    fn from(err: AuthenticationError) -> Self {
        Self(err)
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            AuthenticationError::ConfigurationMissing { .. } => {
                error!(error = %self.0, "Authentication misconfigured");
                (StatusCode::INTERNAL_SERVER_ERROR, "Authentication failed")
            }
            AuthenticationError::Upstream { .. } => {
                error!(error = %self.0, "Identity provider unavailable");
                (StatusCode::INTERNAL_SERVER_ERROR, "Authentication failed")
            }
            AuthenticationError::TokenInvalid { .. } => {
                warn!(error = %self.0, "Rejected invalid token");
                (StatusCode::UNAUTHORIZED, "Invalid token")
            }
            AuthenticationError::StateMismatch => {
                (StatusCode::BAD_REQUEST, "Invalid state parameter")
            }
            AuthenticationError::NotAuthenticated => {
                (StatusCode::UNAUTHORIZED, "Authentication required")
            }
        };

        (status, Json(AuthResponse::failure(message))).into_response()
    }
}
