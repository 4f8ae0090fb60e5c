//! Access-token validation against the provider key set.

use gatehouse_identity::{AuthenticationError, ProviderConfig, UserClaims};
use jsonwebtoken::{Algorithm, Validation, decode, decode_header};
use serde::Deserialize;
use tracing::{debug, warn};

use super::jwks::KeyCache;

/// Claims deserialized from a verified token payload.
///
/// Registered claims (`aud`, `iss`, `exp`) are checked by the decoder and
/// do not need to be carried here.
#[derive(Debug, Deserialize)]
struct TokenClaims {
    sub: String,
    name: Option<String>,
    email: Option<String>,
    preferred_username: Option<String>,
    given_name: Option<String>,
    family_name: Option<String>,
    #[serde(default)]
    roles: Vec<String>,
    department: Option<String>,
    organization: Option<String>,
}

impl TokenClaims {
    /// Maps the verified payload to the session-facing user record.
    ///
    /// `preferred_username` stands in for a missing `email` claim, matching
    /// what the provider family emits for directory accounts.
    fn into_user_claims(self) -> UserClaims {
        let email = self.email.or(self.preferred_username);
        UserClaims::new(self.sub)
            .with_name(self.name)
            .with_email(email)
            .with_given_name(self.given_name)
            .with_family_name(self.family_name)
            .with_roles(self.roles)
            .with_department(self.department)
            .with_organization(self.organization)
    }
}

/// Validates a provider access token and extracts the user claims.
///
/// Checks, in order:
/// 1. The header carries a key ID.
/// 2. A matching verification key exists in the (refreshable) key cache.
/// 3. The RS256 signature verifies, the audience equals the configured
///    client ID, the issuer matches the tenant issuer, and `exp` is in the
///    future.
///
/// Malformed tokens, unknown keys, and verification failures all surface
/// as the same `TokenInvalid` outcome; the distinctions live in the logs.
pub async fn validate_access_token(
    config: &ProviderConfig,
    keys: &KeyCache,
    token: &str,
) -> Result<UserClaims, AuthenticationError> {
    let header = decode_header(token).map_err(|e| {
        warn!(error = %e, "Failed to decode token header");
        AuthenticationError::token_invalid("malformed token header")
    })?;

    let kid = header.kid.ok_or_else(|| {
        warn!("Token header carries no key ID");
        AuthenticationError::token_invalid("token missing key ID")
    })?;

    let decoding_key = keys.get_key(&kid).await.inspect_err(|e| {
        if matches!(e, AuthenticationError::TokenInvalid { .. }) {
            warn!(kid = %kid, "No verification key matches the token key ID");
        }
    })?;

    let mut validation = Validation::new(Algorithm::RS256);
    validation.set_audience(&[config.client_id()]);
    validation.set_issuer(&[config.issuer()]);
    validation.set_required_spec_claims(&["exp", "aud", "iss"]);

    let token_data = decode::<TokenClaims>(token, &decoding_key, &validation).map_err(|e| {
        warn!(kid = %kid, error = %e, "Token verification failed");
        AuthenticationError::token_invalid(e)
    })?;

    let user = token_data.claims.into_user_claims();
    debug!(subject = %user.subject, "Access token validated");
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::test_support::{
        TEST_KID, populated_key_cache, sign, test_provider_config, valid_payload,
    };
    use chrono::Utc;

    #[tokio::test]
    async fn valid_token_yields_subject() {
        let config = test_provider_config();
        let cache = populated_key_cache(&config);
        let mut payload = valid_payload(&config);
        payload.email = Some("user@example.com".to_string());
        payload.roles = vec!["reader".to_string()];

        let token = sign(&payload, Some(TEST_KID));
        let user = validate_access_token(&config, &cache, &token)
            .await
            .expect("valid token");

        assert_eq!(user.subject, "user-42");
        assert_eq!(user.email.as_deref(), Some("user@example.com"));
        assert_eq!(user.roles, vec!["reader"]);
    }

    #[tokio::test]
    async fn preferred_username_backfills_email() {
        let config = test_provider_config();
        let cache = populated_key_cache(&config);
        let mut payload = valid_payload(&config);
        payload.preferred_username = Some("user@corp.example.com".to_string());

        let token = sign(&payload, Some(TEST_KID));
        let user = validate_access_token(&config, &cache, &token)
            .await
            .expect("valid token");

        assert_eq!(user.email.as_deref(), Some("user@corp.example.com"));
    }

    #[tokio::test]
    async fn token_without_kid_is_rejected() {
        let config = test_provider_config();
        let cache = populated_key_cache(&config);
        let token = sign(&valid_payload(&config), None);

        let err = validate_access_token(&config, &cache, &token)
            .await
            .err()
            .expect("missing kid");
        assert!(matches!(err, AuthenticationError::TokenInvalid { .. }));
    }

    #[tokio::test]
    async fn unknown_kid_is_rejected() {
        let config = test_provider_config();
        let cache = populated_key_cache(&config);
        let token = sign(&valid_payload(&config), Some("other-key"));

        let err = validate_access_token(&config, &cache, &token)
            .await
            .err()
            .expect("unknown kid");
        assert!(matches!(err, AuthenticationError::TokenInvalid { .. }));
    }

    #[tokio::test]
    async fn wrong_audience_is_rejected() {
        let config = test_provider_config();
        let cache = populated_key_cache(&config);
        let mut payload = valid_payload(&config);
        payload.aud = "another-client".to_string();

        let token = sign(&payload, Some(TEST_KID));
        assert!(
            validate_access_token(&config, &cache, &token)
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn wrong_issuer_is_rejected() {
        let config = test_provider_config();
        let cache = populated_key_cache(&config);
        let mut payload = valid_payload(&config);
        payload.iss = "https://evil.example.net/test-tenant/v2.0".to_string();

        let token = sign(&payload, Some(TEST_KID));
        assert!(
            validate_access_token(&config, &cache, &token)
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let config = test_provider_config();
        let cache = populated_key_cache(&config);
        let mut payload = valid_payload(&config);
        // Beyond the decoder's default 60-second leeway
        payload.exp = Utc::now().timestamp() - 120;

        let token = sign(&payload, Some(TEST_KID));
        assert!(
            validate_access_token(&config, &cache, &token)
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn garbage_token_is_rejected() {
        let config = test_provider_config();
        let cache = populated_key_cache(&config);

        let err = validate_access_token(&config, &cache, "not.a.jwt")
            .await
            .err()
            .expect("malformed token");
        assert!(matches!(err, AuthenticationError::TokenInvalid { .. }));
    }
}
