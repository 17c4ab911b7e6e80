use async_trait::async_trait;
use jsonwebtoken::jwk::Jwk;
use jsonwebtoken::jwk::JwkSet;
use reqwest::Client;
use serde::Deserialize;

use crate::config_cache::ConfigFetcher;
use crate::error::discovery_document_error;
use crate::error::key_set_error;
use crate::error::Result;

#[derive(Debug, Deserialize)]
struct OpenIdConfig {
    #[serde(default)]
    issuer: Option<String>,
    jwks_uri: String,
    #[serde(default)]
    id_token_signing_alg_values_supported: Vec<String>,
}

/// Signing keys and metadata published by one OpenID discovery document
#[derive(Debug, Clone)]
pub struct SigningConfig {
    pub issuer: Option<String>,
    pub jwks_uri: String,
    /// Algorithms the provider advertises, informational only
    pub signing_algorithms: Vec<String>,
    pub keys: JwkSet,
}

impl SigningConfig {
    pub fn find(&self, kid: &str) -> Option<&Jwk> {
        self.keys.find(kid)
    }

    /// Identifiers of every key in the set, for diagnostics
    pub fn key_ids(&self) -> Vec<String> {
        self.keys
            .keys
            .iter()
            .filter_map(|key| key.common.key_id.clone())
            .collect()
    }
}

/// Fetches the discovery document and the key set it points at
#[derive(Debug, Clone)]
pub struct SigningConfigFetcher {
    client: Client,
}

impl SigningConfigFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ConfigFetcher<SigningConfig> for SigningConfigFetcher {
    async fn fetch(&self, url: &str) -> Result<SigningConfig> {
        let OpenIdConfig {
            issuer,
            jwks_uri,
            id_token_signing_alg_values_supported,
        } = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(discovery_document_error)?
            .json()
            .await
            .map_err(discovery_document_error)?;

        let keys: JwkSet = self
            .client
            .get(&jwks_uri)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(key_set_error)?
            .json()
            .await
            .map_err(key_set_error)?;

        tracing::info!(
            target: "connector_auth.signing",
            url = %url,
            jwks_uri = %jwks_uri,
            key_count = keys.keys.len(),
            "Fetched signing keys"
        );

        Ok(SigningConfig {
            issuer,
            jwks_uri,
            signing_algorithms: id_token_signing_alg_values_supported,
            keys,
        })
    }
}
