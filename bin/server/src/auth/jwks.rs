//! Provider key-set (JWKS) fetching and caching.
//!
//! The cache is process-wide but explicitly owned: it is constructed at
//! startup and injected into the route layer via `AppState`. The first
//! validation populates it; a key-ID miss triggers a re-fetch so provider
//! key rotation is picked up without a restart, gated by a refresh interval
//! so repeated unknown kids cause at most one upstream fetch per interval.

use gatehouse_identity::AuthenticationError;
use jsonwebtoken::DecodingKey;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// JWKS document returned by the discovery endpoint.
#[derive(Debug, Deserialize)]
pub struct Jwks {
    pub keys: Vec<Jwk>,
}

/// Individual JSON Web Key.
///
/// Only RSA signing keys are used; other key types are skipped.
#[derive(Debug, Deserialize)]
pub struct Jwk {
    /// Key type (RSA, EC, ...).
    pub kty: String,
    /// Key ID.
    pub kid: Option<String>,
    /// Key use (sig, enc).
    #[serde(rename = "use")]
    pub key_use: Option<String>,
    /// RSA modulus (base64url).
    pub n: Option<String>,
    /// RSA exponent (base64url).
    pub e: Option<String>,
}

/// Cache of provider public keys, keyed by key ID.
pub struct KeyCache {
    /// Cached keys: kid -> DecodingKey.
    keys: RwLock<HashMap<String, DecodingKey>>,
    /// When the key set was last fetched; `None` until first use.
    last_refresh: RwLock<Option<Instant>>,
    /// Minimum interval between fetches.
    refresh_interval: Duration,
    /// JWKS endpoint URL.
    jwks_url: String,
    /// HTTP client.
    http: reqwest::Client,
}

impl KeyCache {
    /// Creates an empty cache bound to the given JWKS endpoint.
    ///
    /// No fetch happens here; the first key lookup populates the cache.
    #[must_use]
    pub fn new(jwks_url: String, refresh_secs: u64, http: reqwest::Client) -> Self {
        Self {
            keys: RwLock::new(HashMap::new()),
            last_refresh: RwLock::new(None),
            refresh_interval: Duration::from_secs(refresh_secs),
            jwks_url,
            http,
        }
    }

    /// Returns the decoding key for the given key ID.
    ///
    /// On a miss the key set is re-fetched, at most once per refresh
    /// interval. A single fetch attempt, no retry.
    ///
    /// # Errors
    ///
    /// `Upstream` when the key set cannot be fetched; `TokenInvalid` when
    /// the key ID is absent from the (fresh) key set.
    pub async fn get_key(&self, kid: &str) -> Result<DecodingKey, AuthenticationError> {
        if let Some(key) = self.cached_key(kid)? {
            return Ok(key);
        }

        if self.refresh_due()? {
            debug!(kid = %kid, "Key not found in cache, refreshing key set");
            self.refresh().await?;
        }

        self.cached_key(kid)?.ok_or_else(|| {
            AuthenticationError::token_invalid(format!("no verification key matching kid '{kid}'"))
        })
    }

    /// Replaces the cached keys with the given key set directly.
    ///
    /// The refresh clock is reset, so subsequent misses within the
    /// interval do not reach the network. Returns how many keys loaded.
    pub fn populate(&self, jwks: Jwks) -> Result<usize, AuthenticationError> {
        let new_keys = Self::decode_keys(jwks);
        let count = new_keys.len();

        {
            let mut keys = self.keys.write().map_err(poisoned)?;
            *keys = new_keys;
        }
        {
            let mut last = self.last_refresh.write().map_err(poisoned)?;
            *last = Some(Instant::now());
        }

        Ok(count)
    }

    fn cached_key(&self, kid: &str) -> Result<Option<DecodingKey>, AuthenticationError> {
        let keys = self.keys.read().map_err(poisoned)?;
        Ok(keys.get(kid).cloned())
    }

    /// True when the cache has never been fetched or the interval elapsed.
    fn refresh_due(&self) -> Result<bool, AuthenticationError> {
        let last = self.last_refresh.read().map_err(poisoned)?;
        Ok(match *last {
            None => true,
            Some(at) => at.elapsed() >= self.refresh_interval,
        })
    }

    /// Fetches the key set from the provider and replaces the cache.
    async fn refresh(&self) -> Result<(), AuthenticationError> {
        let response = self
            .http
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| AuthenticationError::upstream("key set fetch", e))?;

        if !response.status().is_success() {
            return Err(AuthenticationError::upstream(
                "key set fetch",
                format!("key set endpoint returned status {}", response.status()),
            ));
        }

        let jwks: Jwks = response
            .json()
            .await
            .map_err(|e| AuthenticationError::upstream("key set fetch", e))?;

        let count = self.populate(jwks)?;
        if count == 0 {
            return Err(AuthenticationError::upstream(
                "key set fetch",
                "no usable signing keys in key set",
            ));
        }

        info!(url = %self.jwks_url, key_count = count, "Key set cache refreshed");
        Ok(())
    }

    /// Decodes the usable signing keys from a JWKS document.
    fn decode_keys(jwks: Jwks) -> HashMap<String, DecodingKey> {
        let mut keys = HashMap::new();
        for jwk in jwks.keys {
            // Skip encryption keys
            if jwk.key_use.as_deref() == Some("enc") {
                continue;
            }

            match Self::jwk_to_decoding_key(&jwk) {
                Ok(key) => {
                    let kid = jwk.kid.clone().unwrap_or_else(|| "default".to_string());
                    debug!(kid = %kid, kty = %jwk.kty, "Loaded verification key");
                    keys.insert(kid, key);
                }
                Err(e) => {
                    warn!(kid = ?jwk.kid, kty = %jwk.kty, error = %e, "Skipping unusable key");
                }
            }
        }
        keys
    }

    /// Converts an RSA JWK to a DecodingKey.
    fn jwk_to_decoding_key(jwk: &Jwk) -> Result<DecodingKey, AuthenticationError> {
        if jwk.kty != "RSA" {
            return Err(AuthenticationError::token_invalid(format!(
                "unsupported key type: {}",
                jwk.kty
            )));
        }

        let n = jwk
            .n
            .as_ref()
            .ok_or_else(|| AuthenticationError::token_invalid("RSA key missing 'n'"))?;
        let e = jwk
            .e
            .as_ref()
            .ok_or_else(|| AuthenticationError::token_invalid("RSA key missing 'e'"))?;

        DecodingKey::from_rsa_components(n, e)
            .map_err(|e| AuthenticationError::token_invalid(format!("bad RSA components: {e}")))
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> AuthenticationError {
    AuthenticationError::upstream("key cache", "lock poisoned")
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_MODULUS: &str = "mqkoR7IA721YmwPv5U8IIOSOqI1Ik6eQ58gfCQ-XFWBWLCfdbS-TWn18vkGkzA0eZP_RLGWfX5CW9aFu_2oAly7fDoXhT-JB5C2DTtGOPeswCklyUULDkwISp6yhns0raqPYaWZiqGJH3fKcm7y4qXPZvpjWbQE7_jKbYZzShNmgZWNlV_7FfUgQc7CaGxAxc02Cv1QJ4wjm_jDwP0MGxVDAxzBvImKaVKnEwoKXbT9616xWyKYghQyGUUa1oab5yTWDWdJpbU6U-tTW-e307CQ4186bYRDkaMMpUbi-kuN-Cf55EAC4Zq_u2prCPK2mr-tO4OBjUwYhIhJouvjw0w";

    fn test_cache() -> KeyCache {
        KeyCache::new(
            "https://login.example.net/tenant/discovery/v2.0/keys".to_string(),
            300,
            reqwest::Client::new(),
        )
    }

    fn rsa_jwk(kid: &str) -> Jwk {
        Jwk {
            kty: "RSA".to_string(),
            kid: Some(kid.to_string()),
            key_use: Some("sig".to_string()),
            n: Some(TEST_MODULUS.to_string()),
            e: Some("AQAB".to_string()),
        }
    }

    #[test]
    fn jwk_parses_from_json() {
        let jwk_json = format!(
            r#"{{"kty": "RSA", "kid": "key-1", "use": "sig", "n": "{TEST_MODULUS}", "e": "AQAB"}}"#
        );
        let jwk: Jwk = serde_json::from_str(&jwk_json).expect("deserialize");
        assert_eq!(jwk.kty, "RSA");
        assert_eq!(jwk.kid.as_deref(), Some("key-1"));
        assert!(KeyCache::jwk_to_decoding_key(&jwk).is_ok());
    }

    #[test]
    fn populate_loads_signing_keys_and_skips_others() {
        let cache = test_cache();
        let jwks = Jwks {
            keys: vec![
                rsa_jwk("key-1"),
                Jwk {
                    key_use: Some("enc".to_string()),
                    ..rsa_jwk("enc-key")
                },
                Jwk {
                    kty: "EC".to_string(),
                    kid: Some("ec-key".to_string()),
                    key_use: Some("sig".to_string()),
                    n: None,
                    e: None,
                },
            ],
        };

        let count = cache.populate(jwks).expect("populate");
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn populated_key_is_served_without_network() {
        let cache = test_cache();
        cache
            .populate(Jwks {
                keys: vec![rsa_jwk("key-1")],
            })
            .expect("populate");

        assert!(cache.get_key("key-1").await.is_ok());
    }

    #[tokio::test]
    async fn unknown_kid_within_interval_is_token_invalid() {
        let cache = test_cache();
        cache
            .populate(Jwks {
                keys: vec![rsa_jwk("key-1")],
            })
            .expect("populate");

        // The refresh clock was just reset, so the miss stays local and
        // reports an unknown key rather than reaching the endpoint.
        let err = cache.get_key("rotated-away").await.err().expect("miss");
        assert!(matches!(err, AuthenticationError::TokenInvalid { .. }));
    }

    #[tokio::test]
    async fn empty_cache_fetch_failure_is_upstream() {
        // Unroutable endpoint: first use must attempt a fetch and report
        // the provider as unavailable.
        let cache = KeyCache::new(
            "http://127.0.0.1:1/keys".to_string(),
            300,
            reqwest::Client::new(),
        );

        let err = cache.get_key("any").await.err().expect("fetch failure");
        assert!(matches!(err, AuthenticationError::Upstream { .. }));
    }

    #[test]
    fn rsa_jwk_without_modulus_is_rejected() {
        let jwk = Jwk {
            n: None,
            ..rsa_jwk("key-1")
        };
        assert!(KeyCache::jwk_to_decoding_key(&jwk).is_err());
    }
}
