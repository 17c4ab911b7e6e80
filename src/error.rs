use std::fmt::Debug;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("The provided token is malformed: {0}")]
    MalformedToken(String),
    #[error("The provided token was issued by an issuer that is not accepted: {0:?}")]
    UnknownIssuer(String),
    #[error("OpenID configuration from {url} is unavailable and nothing is cached: {source}")]
    ConfigurationUnavailable {
        url: String,
        #[source]
        source: Box<Error>,
    },
    #[error("No signing key matches kid {kid:?}. Available keys: {}", available.join(", "))]
    KeyNotFound { kid: String, available: Vec<String> },
    #[error("Token signature is invalid: {0}")]
    SignatureInvalid(#[source] jsonwebtoken::errors::Error),
    #[error("JWT error: {0}")]
    Jwt(#[source] jsonwebtoken::errors::Error),
    #[error("Signing key type is not supported: {0}")]
    KeyAlgorithmNotSupported(String),
    #[error("Token signing algorithm {0:?} is not in the allowed list")]
    AlgorithmNotAllowed(String),
    #[error(
        "Could not validate endorsement for key {kid:?} with endorsements: {}",
        endorsements.join(",")
    )]
    EndorsementRejected {
        kid: String,
        endorsements: Vec<String>,
    },
    #[error("Configuration fetch failed: {0}")]
    Fetch(String),
    #[error("No issuers configured - at least one accepted issuer must be configured")]
    NoIssuersConfigured,
}

impl Error {
    /// True for failures that only mean "this token carries no identity".
    ///
    /// Everything except [`Error::ConfigurationUnavailable`] is a rejection of
    /// the single token being validated.
    pub fn is_rejection(&self) -> bool {
        !matches!(self, Error::ConfigurationUnavailable { .. })
    }
}

impl From<jsonwebtoken::errors::Error> for Error {
    fn from(error: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match error.kind() {
            ErrorKind::InvalidSignature
            | ErrorKind::InvalidEcdsaKey
            | ErrorKind::InvalidKeyFormat
            | ErrorKind::InvalidAlgorithm => Error::SignatureInvalid(error),
            _ => Error::Jwt(error),
        }
    }
}

pub(crate) fn discovery_document_error(error: reqwest::Error) -> Error {
    Error::Fetch(format!("Failed to fetch OpenID config: {error}"))
}

pub(crate) fn key_set_error(error: reqwest::Error) -> Error {
    Error::Fetch(format!("Failed to fetch JWKS: {error}"))
}
