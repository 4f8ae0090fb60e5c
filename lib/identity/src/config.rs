//! Identity-provider configuration and endpoint derivation.
//!
//! This module provides configuration types for connecting to an external
//! OAuth2/OIDC identity provider that exposes tenant-scoped v2.0 endpoints
//! (the Microsoft Entra / AD FS endpoint family).

use serde::{Deserialize, Serialize};

use crate::error::AuthenticationError;

/// Configuration for the OAuth2/OIDC identity provider.
///
/// All authorization, token, key-set, and logout endpoints are derived from
/// `authority_base_url` and `tenant_id`; nothing is discovered at runtime.
///
/// Fields with defaults can be omitted when loading from environment
/// variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// The OAuth2 client ID registered with the provider.
    #[serde(default)]
    client_id: String,
    /// The OAuth2 client secret.
    #[serde(default)]
    client_secret: String,
    /// Base URL of the provider authority.
    /// Default: "https://login.microsoftonline.com"
    #[serde(default = "default_authority_base_url")]
    authority_base_url: String,
    /// The tenant (directory) identifier under the authority.
    #[serde(default)]
    tenant_id: String,
    /// Space-separated OAuth2 scopes to request.
    /// Default: "openid profile email"
    #[serde(default = "default_scope")]
    scope: String,
    /// The redirect URI for the OAuth2 callback
    /// (e.g., "https://app.example.com/auth/callback").
    #[serde(default)]
    redirect_uri: String,
}

fn default_authority_base_url() -> String {
    "https://login.microsoftonline.com".to_string()
}

fn default_scope() -> String {
    "openid profile email".to_string()
}

impl ProviderConfig {
    /// Creates a new provider configuration with defaults for optional
    /// fields.
    #[must_use]
    pub fn new(
        client_id: String,
        client_secret: String,
        tenant_id: String,
        redirect_uri: String,
    ) -> Self {
        Self {
            client_id,
            client_secret,
            authority_base_url: default_authority_base_url(),
            tenant_id,
            scope: default_scope(),
            redirect_uri,
        }
    }

    /// Creates a configuration builder for more customization.
    #[must_use]
    pub fn builder(
        client_id: String,
        client_secret: String,
        tenant_id: String,
        redirect_uri: String,
    ) -> ProviderConfigBuilder {
        ProviderConfigBuilder::new(client_id, client_secret, tenant_id, redirect_uri)
    }

    /// Checks that all required fields are present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationMissing` naming the first absent field.
    pub fn validate(&self) -> Result<(), AuthenticationError> {
        for (field, value) in [
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
            ("tenant_id", &self.tenant_id),
            ("redirect_uri", &self.redirect_uri),
        ] {
            if value.trim().is_empty() {
                return Err(AuthenticationError::ConfigurationMissing {
                    field: field.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Returns the OAuth2 client ID.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Returns the OAuth2 client secret.
    #[must_use]
    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }

    /// Returns the provider authority base URL.
    #[must_use]
    pub fn authority_base_url(&self) -> &str {
        &self.authority_base_url
    }

    /// Returns the tenant identifier.
    #[must_use]
    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    /// Returns the space-separated scope string.
    #[must_use]
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Returns the OAuth2 callback redirect URI.
    #[must_use]
    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Returns the authorization endpoint URL.
    #[must_use]
    pub fn authorize_endpoint(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/authorize",
            self.authority_base_url, self.tenant_id
        )
    }

    /// Returns the token endpoint URL.
    #[must_use]
    pub fn token_endpoint(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority_base_url, self.tenant_id
        )
    }

    /// Returns the key-set (JWKS) discovery endpoint URL.
    #[must_use]
    pub fn jwks_endpoint(&self) -> String {
        format!(
            "{}/{}/discovery/v2.0/keys",
            self.authority_base_url, self.tenant_id
        )
    }

    /// Returns the provider logout endpoint URL.
    #[must_use]
    pub fn logout_endpoint(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/logout",
            self.authority_base_url, self.tenant_id
        )
    }

    /// Returns the issuer string expected in verified tokens.
    #[must_use]
    pub fn issuer(&self) -> String {
        format!("{}/{}/v2.0", self.authority_base_url, self.tenant_id)
    }
}

impl Default for ProviderConfig {
    /// An empty configuration: required fields blank, optional fields at
    /// their documented defaults. `validate()` rejects it until the
    /// required fields are supplied from the environment.
    fn default() -> Self {
        Self::new(String::new(), String::new(), String::new(), String::new())
    }
}

/// Builder for `ProviderConfig`.
#[derive(Debug)]
pub struct ProviderConfigBuilder {
    client_id: String,
    client_secret: String,
    authority_base_url: String,
    tenant_id: String,
    scope: String,
    redirect_uri: String,
}

impl ProviderConfigBuilder {
    /// Creates a new builder with required fields.
    #[must_use]
    pub fn new(
        client_id: String,
        client_secret: String,
        tenant_id: String,
        redirect_uri: String,
    ) -> Self {
        Self {
            client_id,
            client_secret,
            authority_base_url: default_authority_base_url(),
            tenant_id,
            scope: default_scope(),
            redirect_uri,
        }
    }

    /// Overrides the provider authority base URL.
    #[must_use]
    pub fn authority_base_url(mut self, url: String) -> Self {
        self.authority_base_url = url;
        self
    }

    /// Overrides the requested scopes (space-separated).
    #[must_use]
    pub fn scope(mut self, scope: String) -> Self {
        self.scope = scope;
        self
    }

    /// Builds the `ProviderConfig`.
    #[must_use]
    pub fn build(self) -> ProviderConfig {
        ProviderConfig {
            client_id: self.client_id,
            client_secret: self.client_secret,
            authority_base_url: self.authority_base_url,
            tenant_id: self.tenant_id,
            scope: self.scope,
            redirect_uri: self.redirect_uri,
        }
    }
}
