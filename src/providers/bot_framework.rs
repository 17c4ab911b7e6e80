//! Bot Framework channel and emulator token validation
//!
//! Channel tokens are issued by the connector service and signed with keys
//! from its own discovery document. Those keys carry endorsements naming the
//! channels they may sign for, so a channel validator normally also requires
//! the endorsement of the channel the activity arrived on.
//!
//! Emulator tokens come from Azure AD tenants. Their audience is checked by
//! [`TokenValidator::emulator_app_id`] rather than by the policy.
//!
//! ## Example
//!
//! ```rust,no_run
//! use connector_auth::providers::bot_framework;
//! use connector_auth::ConfigCacheRegistry;
//! use connector_auth::TokenValidator;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = ConfigCacheRegistry::default();
//!
//! let policy = bot_framework::channel_policy()
//!     .with_endorsement_validator(bot_framework::require_endorsement("msteams"));
//! let validator = TokenValidator::new(policy, &registry).await?;
//!
//! if let Some(claims) = validator.identity_from_header(Some("Bearer eyJhbG...")).await? {
//!     println!("Bot app id: {:?}", validator.app_id(&claims));
//! }
//! # Ok(())
//! # }
//! ```

use std::collections::HashSet;
use std::time::Duration;

use jsonwebtoken::Algorithm;

use crate::config::ValidationPolicy;
use crate::error::Result;
use crate::registry::ConfigCacheRegistry;
use crate::validator::TokenValidator;

/// Issuer of tokens sent by the connector service
pub const CHANNEL_ISSUER: &str = "https://api.botframework.com";

/// Discovery document of the connector service
pub const CHANNEL_OPENID_METADATA_URL: &str =
    "https://login.botframework.com/v1/.well-known/openidconfiguration";

/// Discovery document of the emulator's token issuers
pub const EMULATOR_OPENID_METADATA_URL: &str =
    "https://login.microsoftonline.com/botframework.com/v2.0/.well-known/openid-configuration";

/// Issuers of emulator tokens, v1.0 and v2.0 endpoints of both tenants
pub const EMULATOR_ISSUERS: [&str; 4] = [
    "https://sts.windows.net/d6d49420-f39b-4df7-a1dc-d59a935871db/",
    "https://login.microsoftonline.com/d6d49420-f39b-4df7-a1dc-d59a935871db/v2.0",
    "https://sts.windows.net/f8cdef31-a31e-4b4a-93e4-5f571e91255a/",
    "https://login.microsoftonline.com/f8cdef31-a31e-4b4a-93e4-5f571e91255a/v2.0",
];

const CLOCK_SKEW: Duration = Duration::from_secs(5 * 60);

/// Policy for tokens sent by the connector service
pub fn channel_policy() -> ValidationPolicy {
    ValidationPolicy::new(CHANNEL_OPENID_METADATA_URL, CHANNEL_ISSUER)
        .with_allowed_algorithms(vec![Algorithm::RS256, Algorithm::RS384, Algorithm::RS512])
        .with_leeway(CLOCK_SKEW)
}

/// Policy for tokens sent by the emulator
pub fn emulator_policy() -> ValidationPolicy {
    EMULATOR_ISSUERS
        .iter()
        .skip(1)
        .fold(
            ValidationPolicy::new(EMULATOR_OPENID_METADATA_URL, EMULATOR_ISSUERS[0]),
            |policy, issuer| policy.with_issuer(*issuer),
        )
        .with_leeway(CLOCK_SKEW)
}

/// Endorsement predicate accepting keys endorsed for `channel_id`
pub fn require_endorsement(
    channel_id: impl Into<String>,
) -> impl Fn(&HashSet<String>) -> bool + Send + Sync + 'static {
    let channel_id = channel_id.into();
    move |endorsements| endorsements.contains(&channel_id)
}

impl TokenValidator {
    /// Create a validator for connector service tokens from `channel_id`
    pub async fn for_channel(
        channel_id: impl Into<String>,
        registry: &ConfigCacheRegistry,
    ) -> Result<Self> {
        let policy =
            channel_policy().with_endorsement_validator(require_endorsement(channel_id));
        Self::new(policy, registry).await
    }

    /// Create a validator for emulator tokens
    pub async fn for_emulator(registry: &ConfigCacheRegistry) -> Result<Self> {
        Self::new(emulator_policy(), registry).await
    }
}
