/* Licensed to the Apache Software Foundation (ASF) under one
 * or more contributor license agreements.  See the NOTICE file
 * distributed with this work for additional information
 * regarding copyright ownership.  The ASF licenses this file
 * to you under the Apache License, Version 2.0 (the
 * "License"); you may not use this file except in compliance
 * with the License.  You may obtain a copy of the License at
 *
 *   http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing,
 * software distributed under the License is distributed on an
 * "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
 * KIND, either express or implied.  See the License for the
 * specific language governing permissions and limitations
 * under the License.
 */

use crate::authz::COMPONENT;
use crate::configs::authz::JwksConfig;
use jsonwebtoken::DecodingKey;
use moka::future::Cache;
use serde::Deserialize;
use std::time::Duration;
use strum::{Display, EnumString};
use thiserror::Error;
use tracing::{debug, error};

#[derive(Debug, Error)]
pub enum JwksError {
    #[error("cannot fetch JWKS from {url}: {reason}")]
    CannotFetch { url: String, reason: String },
    #[error("invalid JWKS: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, Display, EnumString, Deserialize, PartialEq, Eq)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
enum JwkKeyType {
    Rsa,
    Ec,
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    kty: JwkKeyType,
    kid: Option<String>,
    n: Option<String>,
    e: Option<String>,
    x: Option<String>,
    y: Option<String>,
    crv: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JwkSet {
    keys: Vec<Jwk>,
}

#[derive(Debug, Clone, Hash, Eq, PartialEq)]
struct CacheKey {
    issuer: String,
    kid: String,
}

/// Decodes every usable key of a JWKS document. Keys without `kid`, of an
/// unsupported type or on an unsupported curve are skipped.
pub fn decoding_keys(document: &str) -> Result<Vec<(String, DecodingKey)>, JwksError> {
    let set: JwkSet =
        serde_json::from_str(document).map_err(|error| JwksError::Invalid(error.to_string()))?;

    let mut keys = Vec::with_capacity(set.keys.len());
    for key in set.keys {
        let Some(kid) = key.kid else {
            continue;
        };
        let decoding_key = match key.kty {
            JwkKeyType::Rsa => {
                let (Some(n), Some(e)) = (key.n.as_deref(), key.e.as_deref()) else {
                    continue;
                };
                DecodingKey::from_rsa_components(n, e)
                    .map_err(|error| JwksError::Invalid(format!("invalid RSA key: {error}")))?
            }
            JwkKeyType::Ec => {
                let (Some(x), Some(y), Some(crv)) =
                    (key.x.as_deref(), key.y.as_deref(), key.crv.as_deref())
                else {
                    continue;
                };
                if !matches!(crv.to_ascii_uppercase().as_str(), "P-256" | "P-384" | "P-521") {
                    continue;
                }
                DecodingKey::from_ec_components(x, y)
                    .map_err(|error| JwksError::Invalid(format!("invalid EC key: {error}")))?
            }
            JwkKeyType::Other => continue,
        };
        keys.push((kid, decoding_key));
    }

    Ok(keys)
}

/// Token signing keys per issuer and key id. Entries expire after the
/// configured TTL, so rotated keys are picked up without a restart.
#[derive(Clone)]
pub struct SigningKeyCache {
    cache: Cache<CacheKey, DecodingKey>,
    client: reqwest::Client,
}

impl SigningKeyCache {
    pub fn new(config: &JwksConfig) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(config.max_keys)
                .time_to_live(Duration::from_secs(config.ttl_secs))
                .build(),
            client: reqwest::Client::new(),
        }
    }

    /// Served from the cache when possible, otherwise the issuer's JWKS is
    /// fetched again.
    pub async fn get_key(&self, issuer: &str, jwks_url: &str, kid: &str) -> Option<DecodingKey> {
        let cache_key = CacheKey {
            issuer: issuer.to_owned(),
            kid: kid.to_owned(),
        };
        if let Some(key) = self.cache.get(&cache_key).await {
            return Some(key);
        }

        if let Err(error) = self.refresh_keys(issuer, jwks_url).await {
            error!("{COMPONENT} (error: {error}) - failed to refresh signing keys of: {issuer}");
            return None;
        }
        self.cache.get(&cache_key).await
    }

    pub async fn insert(&self, issuer: &str, kid: &str, key: DecodingKey) {
        let cache_key = CacheKey {
            issuer: issuer.to_owned(),
            kid: kid.to_owned(),
        };
        self.cache.insert(cache_key, key).await;
    }

    async fn refresh_keys(&self, issuer: &str, jwks_url: &str) -> Result<(), JwksError> {
        let cannot_fetch = |reason: String| JwksError::CannotFetch {
            url: jwks_url.to_owned(),
            reason,
        };
        let response = self
            .client
            .get(jwks_url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|error| cannot_fetch(error.to_string()))?;
        let document = response
            .text()
            .await
            .map_err(|error| cannot_fetch(error.to_string()))?;

        let keys = decoding_keys(&document)?;
        debug!("Fetched {} signing key(s) for issuer: {issuer}", keys.len());
        for (kid, key) in keys {
            self.insert(issuer, &kid, key).await;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_ISSUER: &str = "https://sso.example.com/auth/realms/portal";
    const TEST_KID: &str = "test-key";
    // Port 9 (discard) on loopback is expected to refuse connections.
    const UNREACHABLE_JWKS: &str = "http://127.0.0.1:9/certs";

    const RSA_N: &str = "sXchDaQebHnPiGvyDOAT4saGEUetSyo9MKLOoWFsueri23bOdgWp4Dy1WlUzewbgBHod5pcM9H95GQRV3JDXboIRROSBigeC5yjU1hGzHHyXss8UDprecbAYxknTcQkhslANGRUZmdTOQ5qTRsLAt6BTYuyvVRdhS8exSZEy_c4gs_7svlJJQ4H9_NxsiIoLwAEk7-Q3UXERGYw_75IDrGA84-lA_-Ct4eTlXHBIY2EaV7t7LjJaynVJCpkv4LKjTTAumiGUIuQhrNhZLuF_RJLqHpM2kgWFLU7-VTdL1VbC2tejvcI2BlMkEpk1BzBZI0KQB0GaDWFLN-aEAw3vRw";

    fn test_key() -> DecodingKey {
        DecodingKey::from_secret(b"signing-key-cache-test-secret")
    }

    #[test]
    fn rsa_keys_with_kid_should_be_decoded() {
        let document = format!(
            r#"{{"keys":[
                {{"kty":"RSA","kid":"k1","n":"{RSA_N}","e":"AQAB"}},
                {{"kty":"RSA","n":"{RSA_N}","e":"AQAB"}},
                {{"kty":"oct","kid":"k3"}},
                {{"kty":"EC","kid":"k4","x":"a","y":"b","crv":"secp256k1"}}
            ]}}"#
        );

        let keys = decoding_keys(&document).unwrap();

        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].0, "k1");
    }

    #[test]
    fn malformed_document_should_be_rejected() {
        assert!(matches!(
            decoding_keys("{\"no_keys\": true}"),
            Err(JwksError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn cached_key_should_be_served_without_fetching() {
        let cache = SigningKeyCache::new(&JwksConfig::default());
        cache.insert(TEST_ISSUER, TEST_KID, test_key()).await;

        assert!(cache
            .get_key(TEST_ISSUER, UNREACHABLE_JWKS, TEST_KID)
            .await
            .is_some());
    }

    #[tokio::test]
    async fn keys_should_be_scoped_by_issuer() {
        let cache = SigningKeyCache::new(&JwksConfig::default());
        cache.insert(TEST_ISSUER, TEST_KID, test_key()).await;

        assert!(cache
            .get_key("https://other-issuer.example.com", UNREACHABLE_JWKS, TEST_KID)
            .await
            .is_none());
    }

    #[tokio::test]
    async fn expired_key_should_require_a_refetch() {
        let cache = SigningKeyCache::new(&JwksConfig {
            ttl_secs: 1,
            max_keys: 8,
        });
        cache.insert(TEST_ISSUER, TEST_KID, test_key()).await;

        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert!(cache
            .get_key(TEST_ISSUER, UNREACHABLE_JWKS, TEST_KID)
            .await
            .is_none());
    }
}
