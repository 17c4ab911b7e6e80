use jsonwebtoken::dangerous;
use jsonwebtoken::Algorithm;
use serde_json::Map;
use serde_json::Value;

use crate::error::Error;
use crate::error::Result;

/// Claim type carrying the token audience
pub const AUDIENCE_CLAIM: &str = "aud";
/// Claim type carrying the authorized party (v2.0 tokens)
pub const AUTHORIZED_PARTY_CLAIM: &str = "azp";
/// Claim type carrying the application id (v1.0 tokens)
pub const APP_ID_CLAIM: &str = "appid";
/// Claim type carrying the token version
pub const VERSION_CLAIM: &str = "ver";
const ISSUER_CLAIM: &str = "iss";

/// Tokens larger than this are rejected before any decoding
pub const MAX_TOKEN_SIZE_BYTES: usize = 8192;

/// Header and claims of a token that has not been verified yet
#[derive(Debug, Clone)]
pub struct ParsedToken {
    pub algorithm: Algorithm,
    pub key_id: Option<String>,
    pub issuer: Option<String>,
}

impl ParsedToken {
    /// Parse token data without signature validation
    ///
    /// Only used to route the token: its issuer decides whether it is worth
    /// fetching keys for, its key id selects the key. Nothing read here is
    /// trusted until the signature has been verified.
    pub fn parse(token: &str) -> Result<Self> {
        if token.len() > MAX_TOKEN_SIZE_BYTES {
            return Err(Error::MalformedToken(format!(
                "token is {} bytes, limit is {MAX_TOKEN_SIZE_BYTES}",
                token.len()
            )));
        }

        let token_data = dangerous::insecure_decode::<Map<String, Value>>(token)
            .map_err(|e| Error::MalformedToken(e.to_string()))?;
        let claims = token_data.claims;

        Ok(Self {
            algorithm: token_data.header.alg,
            key_id: token_data.header.kid,
            issuer: claims
                .get(ISSUER_CLAIM)
                .and_then(Value::as_str)
                .map(String::from),
        })
    }
}

/// One fact asserted by a verified token
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Claim {
    pub claim_type: String,
    pub value: String,
    pub issuer: String,
}

impl Claim {
    pub fn new(
        claim_type: impl Into<String>,
        value: impl Into<String>,
        issuer: impl Into<String>,
    ) -> Self {
        Self {
            claim_type: claim_type.into(),
            value: value.into(),
            issuer: issuer.into(),
        }
    }
}

/// Claims of a verified token, in token order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClaimSet {
    claims: Vec<Claim>,
}

impl ClaimSet {
    /// Flatten a verified claims object
    ///
    /// Array values become one claim per element. Strings are kept verbatim,
    /// any other value is stored as its JSON text. Every claim is attributed
    /// to `issuer`.
    pub fn from_json(claims: Map<String, Value>, issuer: &str) -> Self {
        claims
            .iter()
            .flat_map(|(claim_type, value)| {
                claim_values(value)
                    .into_iter()
                    .map(move |value| Claim::new(claim_type.as_str(), value, issuer))
            })
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Claim> {
        self.claims.iter()
    }

    /// First claim of the given type
    pub fn find(&self, claim_type: &str) -> Option<&Claim> {
        self.claims.iter().find(|c| c.claim_type == claim_type)
    }

    /// Value of the first claim of the given type
    pub fn value(&self, claim_type: &str) -> Option<&str> {
        self.find(claim_type).map(|c| c.value.as_str())
    }

    pub fn len(&self) -> usize {
        self.claims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }
}

impl FromIterator<Claim> for ClaimSet {
    fn from_iter<I: IntoIterator<Item = Claim>>(iter: I) -> Self {
        Self {
            claims: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a ClaimSet {
    type Item = &'a Claim;
    type IntoIter = std::slice::Iter<'a, Claim>;

    fn into_iter(self) -> Self::IntoIter {
        self.claims.iter()
    }
}

fn claim_values(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().map(scalar_text).collect(),
        other => vec![scalar_text(other)],
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
