//! Error types for authentication operations.
//!
//! Expected failure modes are explicit variants so callers can branch on
//! the kind rather than inspect strings. The web layer decides how each
//! kind maps to an HTTP status.

use std::fmt;

/// Errors from authentication operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthenticationError {
    /// A required configuration value is absent.
    ConfigurationMissing { field: String },
    /// The identity provider could not be reached or answered non-2xx.
    Upstream { operation: String, reason: String },
    /// The token is malformed, unverifiable, expired, or carries the wrong
    /// audience or issuer.
    TokenInvalid { reason: String },
    /// The callback state did not match the stored login state.
    StateMismatch,
    /// No authenticated user in the session.
    NotAuthenticated,
}

impl AuthenticationError {
    /// Shorthand for an upstream failure during the named operation.
    #[must_use]
    pub fn upstream(operation: &str, reason: impl fmt::Display) -> Self {
        Self::Upstream {
            operation: operation.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Shorthand for an invalid-token failure.
    #[must_use]
    pub fn token_invalid(reason: impl fmt::Display) -> Self {
        Self::TokenInvalid {
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for AuthenticationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigurationMissing { field } => {
                write!(f, "missing required configuration: {field}")
            }
            Self::Upstream { operation, reason } => {
                write!(f, "identity provider unavailable during {operation}: {reason}")
            }
            Self::TokenInvalid { reason } => {
                write!(f, "invalid token: {reason}")
            }
            Self::StateMismatch => {
                write!(f, "login state mismatch")
            }
            Self::NotAuthenticated => {
                write!(f, "not authenticated")
            }
        }
    }
}

impl std::error::Error for AuthenticationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_missing_display_names_field() {
        let err = AuthenticationError::ConfigurationMissing {
            field: "client_id".to_string(),
        };
        assert!(err.to_string().contains("client_id"));
    }

    #[test]
    fn upstream_display_includes_operation_and_reason() {
        let err = AuthenticationError::upstream("token exchange", "connection refused");
        assert!(err.to_string().contains("token exchange"));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn token_invalid_display_includes_reason() {
        let err = AuthenticationError::token_invalid("signature mismatch");
        assert!(err.to_string().contains("invalid token"));
        assert!(err.to_string().contains("signature mismatch"));
    }

    #[test]
    fn state_mismatch_display() {
        assert!(
            AuthenticationError::StateMismatch
                .to_string()
                .contains("state mismatch")
        );
    }

    #[test]
    fn not_authenticated_display() {
        assert!(
            AuthenticationError::NotAuthenticated
                .to_string()
                .contains("not authenticated")
        );
    }
}
