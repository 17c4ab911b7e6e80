use std::sync::Arc;

use async_trait::async_trait;
use jsonwebtoken::decode;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::jwk::AlgorithmParameters;
use jsonwebtoken::jwk::Jwk;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::TokenData;
use jsonwebtoken::Validation;
use serde_json::Map;
use serde_json::Value;
use tracing::instrument;

use crate::claims::ClaimSet;
use crate::claims::ParsedToken;
use crate::config::ValidationPolicy;
use crate::config_cache::RefreshingConfigCache;
use crate::endorsements::EndorsementMap;
use crate::error::Error;
use crate::error::Result;
use crate::extractor;
use crate::registry::ConfigCacheRegistry;
use crate::signing::SigningConfig;

const BEARER_SCHEME: &str = "Bearer";

/// Trait for bearer token validation
#[async_trait]
pub trait ValidateToken: Send + Sync {
    /// Validate a raw token and return its verified claims
    async fn validate(&self, token: &str) -> Result<ClaimSet>;
}

/// Token validator backed by shared discovery caches
///
/// Validation runs in a fixed order and stops at the first failure:
///
/// 1. parse the token without verifying it
/// 2. reject issuers outside the policy before any network access
/// 3. load signing keys from the shared cache
/// 4. verify the signature and the standard claims, trying every key of the
///    set when the token names none
/// 5. check the header algorithm against the allow-list, if any
/// 6. check the signing key's endorsements, if the policy has a validator
pub struct TokenValidator {
    policy: ValidationPolicy,
    signing: Arc<RefreshingConfigCache<SigningConfig>>,
    endorsements: Arc<RefreshingConfigCache<EndorsementMap>>,
}

impl TokenValidator {
    /// Create a validator for `policy` using the caches of `registry`
    ///
    /// # Errors
    /// Returns `Error::NoIssuersConfigured` if the policy accepts no issuer
    pub async fn new(policy: ValidationPolicy, registry: &ConfigCacheRegistry) -> Result<Self> {
        if policy.issuers.is_empty() {
            return Err(Error::NoIssuersConfigured);
        }

        let signing = registry.signing_cache(&policy.openid_metadata_url).await;
        let endorsements = registry
            .endorsement_cache(&policy.openid_metadata_url)
            .await;

        Ok(Self {
            policy,
            signing,
            endorsements,
        })
    }

    pub fn policy(&self) -> &ValidationPolicy {
        &self.policy
    }

    /// The shared signing configuration cache this validator reads from
    pub fn signing_cache(&self) -> &Arc<RefreshingConfigCache<SigningConfig>> {
        &self.signing
    }

    /// Identity from a raw `Authorization` header value
    ///
    /// Returns `Ok(None)` when the header is absent, not of the form
    /// `<scheme> <token>`, or carries a token that does not validate.
    ///
    /// # Errors
    /// Only `Error::ConfigurationUnavailable` is returned as an error.
    pub async fn identity_from_header(
        &self,
        authorization: Option<&str>,
    ) -> Result<Option<ClaimSet>> {
        let Some(authorization) = authorization else {
            return Ok(None);
        };

        match authorization.split(' ').collect::<Vec<_>>().as_slice() {
            [scheme, token] => self.identity(scheme, token).await,
            _ => Ok(None),
        }
    }

    /// Identity from an authorization scheme and its parameter
    ///
    /// # Errors
    /// Only `Error::ConfigurationUnavailable` is returned as an error.
    pub async fn identity(&self, scheme: &str, token: &str) -> Result<Option<ClaimSet>> {
        if scheme != BEARER_SCHEME || token.is_empty() {
            return Ok(None);
        }

        match self.validate(token).await {
            Ok(claims) => Ok(Some(claims)),
            Err(error) if error.is_rejection() => {
                tracing::debug!(
                    target: "connector_auth.validator",
                    error = %error,
                    "Invalid token"
                );
                Ok(None)
            }
            Err(error) => Err(error),
        }
    }

    /// App id of a validated channel token
    pub fn app_id(&self, claims: &ClaimSet) -> Option<String> {
        extractor::app_id_from_claims(claims, &self.policy.issuers)
    }

    /// App id of a validated emulator token
    pub fn emulator_app_id(&self, claims: &ClaimSet) -> Option<String> {
        extractor::app_id_from_emulator_claims(claims, &self.policy.issuers)
    }

    /// Reject tokens from unknown issuers without touching the network
    fn check_issuer(&self, parsed: &ParsedToken) -> Result<()> {
        match &parsed.issuer {
            Some(issuer) if self.policy.issuers.contains(issuer) => Ok(()),
            other => Err(Error::UnknownIssuer(other.clone().unwrap_or_default())),
        }
    }

    /// Verify the signature and standard claims
    ///
    /// Returns the claims together with the id of the key that verified them.
    async fn verify_signature(
        &self,
        token: &str,
        parsed: &ParsedToken,
        signing: &SigningConfig,
    ) -> Result<(ClaimSet, Option<String>)> {
        let validation = self.validation_for(parsed);

        let (token_data, key_id) = match parsed.key_id.as_deref() {
            Some(kid) => {
                let decoding_key = match get_decoding_key_for_kid(kid, signing) {
                    Err(Error::KeyNotFound { kid, available }) => {
                        tracing::warn!(
                            target: "connector_auth.validator",
                            kid = %kid,
                            available = %available.join(", "),
                            "Error finding key for token"
                        );
                        // The provider may have rotated keys since the last fetch
                        self.signing.request_refresh().await;
                        self.endorsements.request_refresh().await;
                        return Err(Error::KeyNotFound { kid, available });
                    }
                    other => other?,
                };
                let token_data = decode::<Map<String, Value>>(token, &decoding_key, &validation)?;
                (token_data, Some(kid.to_string()))
            }
            None => decode_with_any_key(token, signing, &validation)?,
        };

        let issuer = parsed.issuer.as_deref().unwrap_or_default();
        Ok((ClaimSet::from_json(token_data.claims, issuer), key_id))
    }

    fn validation_for(&self, parsed: &ParsedToken) -> Validation {
        let mut validation = Validation::new(parsed.algorithm);

        validation.set_issuer(self.policy.issuers.as_slice());
        if self.policy.audiences.is_empty() {
            validation.validate_aud = false;
        } else {
            validation.set_audience(self.policy.audiences.as_slice());
        }
        validation.validate_nbf = true;
        validation.leeway = self.policy.leeway.as_secs();

        validation
    }

    fn check_algorithm(&self, parsed: &ParsedToken) -> Result<()> {
        let Some(allowed) = &self.policy.allowed_algorithms else {
            return Ok(());
        };

        if allowed.contains(&parsed.algorithm) {
            return Ok(());
        }

        Err(Error::AlgorithmNotAllowed(format!("{:?}", parsed.algorithm)))
    }

    async fn check_endorsements(&self, kid: Option<&str>) -> Result<()> {
        let Some(validator) = &self.policy.endorsement_validator else {
            return Ok(());
        };
        let Some(kid) = kid else {
            return Ok(());
        };

        let mut endorsements = self.endorsements.get().await?;

        if endorsements.get(kid).is_none() && self.endorsements_predate_signing_keys().await {
            // The key may be newer than the endorsements, fetch them again before
            // treating it as unendorsed
            tracing::debug!(
                target: "connector_auth.validator",
                kid = %kid,
                "Signing key missing from older endorsements"
            );
            self.endorsements.request_refresh().await;
            endorsements = self.endorsements.get().await?;
        }

        // Keys without published endorsements carry no requirement
        let Some(key_endorsements) = endorsements.get(kid) else {
            return Ok(());
        };

        if validator(key_endorsements) {
            return Ok(());
        }

        let mut endorsements: Vec<String> = key_endorsements.iter().cloned().collect();
        endorsements.sort();
        Err(Error::EndorsementRejected {
            kid: kid.to_string(),
            endorsements,
        })
    }

    async fn endorsements_predate_signing_keys(&self) -> bool {
        match (
            self.endorsements.fetched_at().await,
            self.signing.fetched_at().await,
        ) {
            (Some(endorsements), Some(signing)) => endorsements < signing,
            _ => false,
        }
    }
}

#[async_trait]
impl ValidateToken for TokenValidator {
    #[instrument(skip_all, fields(metadata_url = %self.policy.openid_metadata_url))]
    async fn validate(&self, token: &str) -> Result<ClaimSet> {
        let parsed = ParsedToken::parse(token)?;
        self.check_issuer(&parsed)?;

        let signing = self.signing.get().await?;
        let (claims, key_id) = self.verify_signature(token, &parsed, &signing).await?;

        self.check_algorithm(&parsed)?;
        self.check_endorsements(key_id.as_deref()).await?;

        tracing::debug!(
            target: "connector_auth.validator",
            kid = ?key_id,
            alg = ?parsed.algorithm,
            "Token validated"
        );
        Ok(claims)
    }
}

/// Get the decoding key for the given key ID from the signing configuration
fn get_decoding_key_for_kid(kid: &str, signing: &SigningConfig) -> Result<DecodingKey> {
    let jwk = signing.find(kid).ok_or_else(|| Error::KeyNotFound {
        kid: kid.to_string(),
        available: signing.key_ids(),
    })?;

    jwk_decoding_key(jwk)
}

fn jwk_decoding_key(jwk: &Jwk) -> Result<DecodingKey> {
    match &jwk.algorithm {
        AlgorithmParameters::RSA(_)
        | AlgorithmParameters::EllipticCurve(_)
        | AlgorithmParameters::OctetKeyPair(_) => Ok(DecodingKey::from_jwk(jwk)?),
        other_algo => Err(Error::KeyAlgorithmNotSupported(format!("{other_algo:?}"))),
    }
}

/// Try every usable key of the set, for tokens that name no key
fn decode_with_any_key(
    token: &str,
    signing: &SigningConfig,
    validation: &Validation,
) -> Result<(TokenData<Map<String, Value>>, Option<String>)> {
    for jwk in &signing.keys.keys {
        let Ok(decoding_key) = jwk_decoding_key(jwk) else {
            continue;
        };

        match decode::<Map<String, Value>>(token, &decoding_key, validation).map_err(Error::from) {
            Ok(token_data) => {
                tracing::debug!(
                    target: "connector_auth.validator",
                    kid = ?jwk.common.key_id,
                    "Token without kid verified by key set search"
                );
                return Ok((token_data, jwk.common.key_id.clone()));
            }
            // Wrong key
            Err(Error::SignatureInvalid(_)) => continue,
            // The signature matched but a claim did not
            Err(error) => return Err(error),
        }
    }

    Err(Error::SignatureInvalid(ErrorKind::InvalidSignature.into()))
}
