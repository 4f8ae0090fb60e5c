//! HTTP client for the identity provider's OAuth2 endpoints.
//!
//! All endpoint URLs are derived from the configured authority and tenant;
//! nothing is discovered at runtime. The client is constructed once at
//! startup, bound to its configuration, and injected into the route layer.

use gatehouse_identity::{AuthenticationError, ProviderConfig};
use serde::Deserialize;
use tracing::{debug, error};
use url::Url;

/// Token endpoint response.
///
/// Deserialization fails when `access_token` is absent, which surfaces as
/// an upstream error to the caller.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenExchangeResponse {
    /// The access token issued by the provider.
    pub access_token: String,
    /// Token type, normally "Bearer".
    pub token_type: Option<String>,
    /// Lifetime of the access token in seconds.
    pub expires_in: Option<u64>,
    /// Scopes granted by the provider.
    pub scope: Option<String>,
    /// Refresh token, when offline access was granted.
    pub refresh_token: Option<String>,
    /// OIDC ID token, when the openid scope was requested.
    pub id_token: Option<String>,
}

/// Configuration-bound client for the provider's authorize, token, and
/// logout endpoints.
pub struct ProviderClient {
    config: ProviderConfig,
    http: reqwest::Client,
}

impl ProviderClient {
    /// Creates a client after checking the configuration is complete and
    /// the derived endpoints are well-formed URLs.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationMissing` when a required field is absent or
    /// the authority does not form a valid URL.
    pub fn new(
        config: ProviderConfig,
        http: reqwest::Client,
    ) -> Result<Self, AuthenticationError> {
        config.validate()?;

        if let Err(e) = Url::parse(&config.authorize_endpoint()) {
            error!(error = %e, authority = %config.authority_base_url(), "Authority does not form a valid endpoint URL");
            return Err(AuthenticationError::ConfigurationMissing {
                field: "authority_base_url".to_string(),
            });
        }

        Ok(Self { config, http })
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Builds the provider authorization URL for a login redirect.
    ///
    /// Pure construction; parameter values are percent-encoded.
    pub fn authorization_url(&self, state: &str) -> Result<String, AuthenticationError> {
        let mut url = Url::parse(&self.config.authorize_endpoint()).map_err(|e| {
            error!(error = %e, "Failed to parse authorize endpoint");
            AuthenticationError::ConfigurationMissing {
                field: "authority_base_url".to_string(),
            }
        })?;

        url.query_pairs_mut()
            .append_pair("client_id", self.config.client_id())
            .append_pair("response_type", "code")
            .append_pair("redirect_uri", self.config.redirect_uri())
            .append_pair("scope", self.config.scope())
            .append_pair("response_mode", "query")
            .append_pair("state", state);

        Ok(url.into())
    }

    /// Exchanges an authorization code for an access token.
    ///
    /// A single attempt; retries are the caller's concern.
    ///
    /// # Errors
    ///
    /// Returns `Upstream` on transport failure, a non-2xx response, or a
    /// response body without an `access_token`.
    pub async fn exchange_code(
        &self,
        code: &str,
    ) -> Result<TokenExchangeResponse, AuthenticationError> {
        let params = [
            ("client_id", self.config.client_id()),
            ("client_secret", self.config.client_secret()),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri()),
            ("grant_type", "authorization_code"),
        ];

        let response = self
            .http
            .post(self.config.token_endpoint())
            .form(&params)
            .send()
            .await
            .map_err(|e| AuthenticationError::upstream("token exchange", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "Token endpoint returned an error");
            return Err(AuthenticationError::upstream(
                "token exchange",
                format!("token endpoint returned status {status}"),
            ));
        }

        let token_response: TokenExchangeResponse = response
            .json()
            .await
            .map_err(|e| AuthenticationError::upstream("token exchange", e))?;

        debug!(
            token_type = token_response.token_type.as_deref().unwrap_or("unknown"),
            "Exchanged authorization code for access token"
        );

        Ok(token_response)
    }

    /// Builds the provider logout URL.
    pub fn logout_url(&self) -> Result<String, AuthenticationError> {
        Url::parse(&self.config.logout_endpoint())
            .map(String::from)
            .map_err(|e| {
                error!(error = %e, "Failed to parse logout endpoint");
                AuthenticationError::ConfigurationMissing {
                    field: "authority_base_url".to_string(),
                }
            })
    }
}
