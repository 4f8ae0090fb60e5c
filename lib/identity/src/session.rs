//! Session types for cookie-keyed server-side sessions.
//!
//! A session is created on the first response that needs one and lives
//! server-side; the browser only ever holds the opaque session ID. The
//! session carries the transient CSRF state during the login redirect and,
//! after a successful callback, the authenticated user together with the
//! provider access token.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::claims::UserClaims;

/// Number of random bytes in generated session IDs and CSRF state values.
const TOKEN_BYTES: usize = 32;

/// Unique identifier for a session.
///
/// Session IDs are opaque, unguessable values (32 random bytes,
/// base64url-encoded) suitable for use as a cookie value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generates a fresh random session ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(random_token())
    }

    /// Creates a session ID from an existing cookie value.
    #[must_use]
    pub fn new(id: String) -> Self {
        Self(id)
    }

    /// Returns the session ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Generates an unguessable URL-safe token with at least 32 bytes of
/// entropy. Used for session IDs and login CSRF state values.
#[must_use]
pub fn random_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// The authenticated portion of a session.
///
/// User claims and the provider access token always travel together; a
/// session holds either both or neither.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authenticated {
    /// Claims from the verified access token.
    pub user: UserClaims,
    /// The raw provider access token.
    pub access_token: String,
}

/// Server-side session record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    /// Transient CSRF state for an in-flight login redirect. Single-use.
    csrf_state: Option<String>,
    /// Post-login redirect target chosen at login time.
    redirect_url: Option<String>,
    /// The authenticated user and access token, once the callback succeeds.
    authenticated: Option<Authenticated>,
    /// When the session was created.
    created_at: DateTime<Utc>,
    /// When the session expires.
    expires_at: DateTime<Utc>,
}

impl SessionData {
    /// Creates an empty session valid for the given duration.
    #[must_use]
    pub fn new(duration: Duration) -> Self {
        let now = Utc::now();
        Self {
            csrf_state: None,
            redirect_url: None,
            authenticated: None,
            created_at: now,
            expires_at: now + duration,
        }
    }

    /// Stores the CSRF state for an in-flight login.
    pub fn set_csrf_state(&mut self, state: String) {
        self.csrf_state = Some(state);
    }

    /// Consumes and returns the stored CSRF state.
    ///
    /// The state is removed regardless of what the caller does with it,
    /// so a callback attempt always spends the stored value.
    pub fn take_csrf_state(&mut self) -> Option<String> {
        self.csrf_state.take()
    }

    /// Returns true if a login redirect is in flight.
    #[must_use]
    pub fn has_csrf_state(&self) -> bool {
        self.csrf_state.is_some()
    }

    /// Stores the post-login redirect target.
    pub fn set_redirect_url(&mut self, url: String) {
        self.redirect_url = Some(url);
    }

    /// Consumes and returns the post-login redirect target.
    pub fn take_redirect_url(&mut self) -> Option<String> {
        self.redirect_url.take()
    }

    /// Marks the session authenticated with the given claims and token.
    pub fn authenticate(&mut self, user: UserClaims, access_token: String) {
        self.authenticated = Some(Authenticated { user, access_token });
    }

    /// Removes the authenticated user and token.
    pub fn clear_authentication(&mut self) {
        self.authenticated = None;
    }

    /// Returns true if the session holds an authenticated user.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.authenticated.is_some()
    }

    /// Returns the authenticated user's claims, if present.
    #[must_use]
    pub fn user(&self) -> Option<&UserClaims> {
        self.authenticated.as_ref().map(|a| &a.user)
    }

    /// Returns the provider access token, if present.
    #[must_use]
    pub fn access_token(&self) -> Option<&str> {
        self.authenticated.as_ref().map(|a| a.access_token.as_str())
    }

    /// Returns the authenticated pairing, if present.
    #[must_use]
    pub fn authenticated(&self) -> Option<&Authenticated> {
        self.authenticated.as_ref()
    }

    /// Returns when the session was created.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns when the session expires.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Returns true if the session has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_claims() -> UserClaims {
        UserClaims::new("sub_test".to_string())
            .with_email(Some("test@example.com".to_string()))
    }

    #[test]
    fn generated_ids_are_unique_and_urlsafe() {
        let a = SessionId::generate();
        let b = SessionId::generate();

        assert_ne!(a, b);
        // 32 bytes base64url without padding is 43 characters
        assert_eq!(a.as_str().len(), 43);
        assert!(
            a.as_str()
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn random_tokens_carry_full_entropy_length() {
        let token = random_token();
        assert_eq!(token.len(), 43);
        assert_ne!(token, random_token());
    }

    #[test]
    fn new_session_is_empty() {
        let session = SessionData::new(Duration::hours(1));

        assert!(!session.is_authenticated());
        assert!(!session.has_csrf_state());
        assert!(session.user().is_none());
        assert!(session.access_token().is_none());
        assert!(!session.is_expired());
        assert!(session.expires_at() > session.created_at());
    }

    #[test]
    fn csrf_state_is_single_use() {
        let mut session = SessionData::new(Duration::hours(1));
        session.set_csrf_state("state-value".to_string());

        assert!(session.has_csrf_state());
        assert_eq!(session.take_csrf_state().as_deref(), Some("state-value"));
        assert!(!session.has_csrf_state());
        assert_eq!(session.take_csrf_state(), None);
    }

    #[test]
    fn redirect_url_is_single_use() {
        let mut session = SessionData::new(Duration::hours(1));
        session.set_redirect_url("/dashboard".to_string());

        assert_eq!(session.take_redirect_url().as_deref(), Some("/dashboard"));
        assert_eq!(session.take_redirect_url(), None);
    }

    #[test]
    fn authenticate_sets_user_and_token_together() {
        let mut session = SessionData::new(Duration::hours(1));
        session.authenticate(test_claims(), "token-abc".to_string());

        assert!(session.is_authenticated());
        assert_eq!(session.user().map(|u| u.subject.as_str()), Some("sub_test"));
        assert_eq!(session.access_token(), Some("token-abc"));
    }

    #[test]
    fn clear_authentication_removes_both() {
        let mut session = SessionData::new(Duration::hours(1));
        session.authenticate(test_claims(), "token-abc".to_string());
        session.clear_authentication();

        assert!(!session.is_authenticated());
        assert!(session.user().is_none());
        assert!(session.access_token().is_none());
    }

    #[test]
    fn session_expiration() {
        let session = SessionData::new(Duration::seconds(-1));
        assert!(session.is_expired());
    }

    #[test]
    fn session_serialization_roundtrip() {
        let mut session = SessionData::new(Duration::hours(1));
        session.set_csrf_state("state".to_string());
        session.authenticate(test_claims(), "token".to_string());

        let json = serde_json::to_string(&session).expect("serialize");
        let parsed: SessionData = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(session, parsed);
    }
}
