use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use jsonwebtoken::Algorithm;
use reqwest::Client;

use crate::error::Error;
use crate::error::Result;

/// Predicate deciding whether a signing key's endorsements are acceptable
pub type EndorsementValidator = Arc<dyn Fn(&HashSet<String>) -> bool + Send + Sync>;

const DEFAULT_LEEWAY_SECS: u64 = 60;

/// Trust policy for one token validator
///
/// A validator takes its policy by value, so changes a caller makes to its
/// own copy afterwards never reach a validator that is already running.
#[derive(Clone)]
pub struct ValidationPolicy {
    /// OpenID discovery document of the identity provider
    pub(crate) openid_metadata_url: String,
    /// Accepted token issuers - the token's `iss` must be one of these
    pub(crate) issuers: Vec<String>,
    /// Accepted audiences, the `aud` check is skipped when empty
    pub(crate) audiences: Vec<String>,
    /// Accepted header algorithms, `None` accepts any algorithm the key supports
    pub(crate) allowed_algorithms: Option<Vec<Algorithm>>,
    pub(crate) endorsement_validator: Option<EndorsementValidator>,
    /// Clock skew tolerance for `exp` and `nbf`
    pub(crate) leeway: Duration,
}

impl ValidationPolicy {
    /// Create a policy accepting tokens from a single issuer
    pub fn new(openid_metadata_url: impl Into<String>, issuer: impl Into<String>) -> Self {
        Self {
            openid_metadata_url: openid_metadata_url.into(),
            issuers: vec![issuer.into()],
            audiences: Vec::new(),
            allowed_algorithms: None,
            endorsement_validator: None,
            leeway: Duration::from_secs(DEFAULT_LEEWAY_SECS),
        }
    }

    /// Create a policy accepting tokens from any of the given issuers
    ///
    /// # Errors
    /// Returns `Error::NoIssuersConfigured` if the issuers vector is empty
    pub fn new_with_issuers(
        openid_metadata_url: impl Into<String>,
        issuers: Vec<String>,
    ) -> Result<Self> {
        if issuers.is_empty() {
            return Err(Error::NoIssuersConfigured);
        }

        Ok(Self {
            openid_metadata_url: openid_metadata_url.into(),
            issuers,
            audiences: Vec::new(),
            allowed_algorithms: None,
            endorsement_validator: None,
            leeway: Duration::from_secs(DEFAULT_LEEWAY_SECS),
        })
    }

    /// Accept one more issuer
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuers.push(issuer.into());
        self
    }

    /// Add a single expected audience
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audiences.push(audience.into());
        self
    }

    /// Set the expected audiences, replacing any configured before
    pub fn with_audiences(mut self, audiences: Vec<String>) -> Self {
        self.audiences = audiences;
        self
    }

    /// Restrict the header algorithms a token may be signed with
    pub fn with_allowed_algorithms(mut self, algorithms: Vec<Algorithm>) -> Self {
        self.allowed_algorithms = Some(algorithms);
        self
    }

    /// Require the signing key's published endorsements to satisfy `validator`
    ///
    /// Keys without published endorsements are not checked.
    pub fn with_endorsement_validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&HashSet<String>) -> bool + Send + Sync + 'static,
    {
        self.endorsement_validator = Some(Arc::new(validator));
        self
    }

    /// Set the clock skew tolerance
    pub fn with_leeway(mut self, leeway: Duration) -> Self {
        self.leeway = leeway;
        self
    }

    pub fn openid_metadata_url(&self) -> &str {
        &self.openid_metadata_url
    }

    pub fn issuers(&self) -> &[String] {
        &self.issuers
    }
}

impl fmt::Debug for ValidationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationPolicy")
            .field("openid_metadata_url", &self.openid_metadata_url)
            .field("issuers", &self.issuers)
            .field("audiences", &self.audiences)
            .field("allowed_algorithms", &self.allowed_algorithms)
            .field(
                "endorsement_validator",
                &self.endorsement_validator.as_ref().map(|_| "<fn>"),
            )
            .field("leeway", &self.leeway)
            .finish()
    }
}

/// Refresh behaviour of the shared configuration caches
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// How long a fetched configuration is served before it is refreshed (default: 5 days)
    pub(crate) refresh_interval: Duration,
    /// Minimum spacing between refresh attempts after a failure or a refresh
    /// request (default: 30 seconds)
    pub(crate) retry_interval: Duration,
    /// Optional custom HTTP client for fetching discovery documents and key sets
    /// If not provided, a default client will be created
    pub(crate) http_client: Option<Client>,
}

const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 5 * 24 * 60 * 60;
const DEFAULT_RETRY_INTERVAL_SECS: u64 = 30;

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(DEFAULT_REFRESH_INTERVAL_SECS),
            retry_interval: Duration::from_secs(DEFAULT_RETRY_INTERVAL_SECS),
            http_client: None,
        }
    }
}

impl CacheConfig {
    /// Set how long a fetched configuration stays valid
    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    /// Set the minimum spacing between refresh attempts
    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    /// Set a custom HTTP client
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http_client = Some(client);
        self
    }
}
