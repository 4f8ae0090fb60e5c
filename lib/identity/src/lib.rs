//! Identity domain types for the gatehouse authentication service.
//!
//! This crate provides:
//! - Identity-provider configuration (`ProviderConfig`) with derived
//!   endpoint URLs
//! - Verified user claims (`UserClaims`)
//! - Session types (`SessionId`, `SessionData`) and the `SessionStore`
//!   collaborator trait
//! - Authentication error types
//!
//! # Session Model
//!
//! Sessions are created server-side and keyed by an opaque cookie value.
//! A session either holds a complete authentication (user claims plus the
//! provider access token, as one unit) or none at all; the transient CSRF
//! state used during the login redirect is single-use and consumed when the
//! callback reads it.
//!
//! # Example
//!
//! ```
//! use gatehouse_identity::{SessionData, UserClaims};
//! use chrono::Duration;
//!
//! // Create a session during login, carrying the CSRF state
//! let mut session = SessionData::new(Duration::hours(8));
//! session.set_csrf_state("opaque-random-state".to_string());
//!
//! // The callback consumes the state exactly once
//! assert_eq!(session.take_csrf_state().as_deref(), Some("opaque-random-state"));
//! assert_eq!(session.take_csrf_state(), None);
//!
//! // A verified token authenticates the session
//! let claims = UserClaims::new("auth0|123456".to_string());
//! session.authenticate(claims, "access-token".to_string());
//! assert!(session.is_authenticated());
//! ```

pub mod claims;
pub mod config;
pub mod error;
pub mod session;
pub mod store;

// Re-export main types at crate root
pub use claims::UserClaims;
pub use config::{ProviderConfig, ProviderConfigBuilder};
pub use error::AuthenticationError;
pub use session::{Authenticated, SessionData, SessionId};
pub use store::SessionStore;
