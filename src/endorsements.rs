//! Endorsements published alongside signing keys
//!
//! Some providers tag each key in their key set with an `endorsements` array
//! (for example the channels a key may sign for):
//!
//! ```json
//! { "keys": [ { "kid": "abc", "kty": "RSA", "endorsements": ["msteams", "webchat"] } ] }
//! ```
//!
//! Providers that publish no endorsements yield an empty map.

use std::collections::HashMap;
use std::collections::HashSet;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::config_cache::ConfigFetcher;
use crate::error::discovery_document_error;
use crate::error::key_set_error;
use crate::error::Result;

#[derive(Debug, Deserialize)]
struct DiscoveryDocument {
    #[serde(default)]
    jwks_uri: Option<String>,
}

#[derive(Debug, Deserialize)]
struct KeySetDocument {
    #[serde(default)]
    keys: Vec<EndorsedKey>,
}

#[derive(Debug, Deserialize)]
struct EndorsedKey {
    #[serde(default)]
    kid: Option<String>,
    #[serde(default)]
    endorsements: Option<Vec<Value>>,
}

impl EndorsedKey {
    /// String tags only, other entries are ignored
    fn into_entry(self) -> Option<(String, Vec<String>)> {
        let endorsements = self
            .endorsements?
            .into_iter()
            .filter_map(|tag| match tag {
                Value::String(tag) => Some(tag),
                _ => None,
            })
            .collect();
        Some((self.kid?, endorsements))
    }
}

/// Endorsement tags by signing key id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndorsementMap(HashMap<String, HashSet<String>>);

impl EndorsementMap {
    pub fn get(&self, kid: &str) -> Option<&HashSet<String>> {
        self.0.get(kid)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Builds the map keeping the first entry seen for each key id
impl FromIterator<(String, Vec<String>)> for EndorsementMap {
    fn from_iter<I: IntoIterator<Item = (String, Vec<String>)>>(iter: I) -> Self {
        let mut map = HashMap::new();
        for (kid, endorsements) in iter {
            map.entry(kid)
                .or_insert_with(|| endorsements.into_iter().collect());
        }
        Self(map)
    }
}

impl From<KeySetDocument> for EndorsementMap {
    fn from(document: KeySetDocument) -> Self {
        document
            .keys
            .into_iter()
            .filter_map(EndorsedKey::into_entry)
            .collect()
    }
}

/// Follows a discovery document to its key set and collects key endorsements
#[derive(Debug, Clone)]
pub struct EndorsementFetcher {
    client: Client,
}

impl EndorsementFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ConfigFetcher<EndorsementMap> for EndorsementFetcher {
    async fn fetch(&self, url: &str) -> Result<EndorsementMap> {
        let discovery: DiscoveryDocument = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(discovery_document_error)?
            .json()
            .await
            .map_err(discovery_document_error)?;

        let Some(jwks_uri) = discovery.jwks_uri else {
            tracing::debug!(
                target: "connector_auth.endorsements",
                url = %url,
                "Discovery document has no jwks_uri"
            );
            return Ok(EndorsementMap::default());
        };

        let key_set: KeySetDocument = self
            .client
            .get(&jwks_uri)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(key_set_error)?
            .json()
            .await
            .map_err(key_set_error)?;

        let endorsements = EndorsementMap::from(key_set);

        tracing::info!(
            target: "connector_auth.endorsements",
            url = %url,
            endorsed_keys = endorsements.len(),
            "Fetched key endorsements"
        );

        Ok(endorsements)
    }
}
