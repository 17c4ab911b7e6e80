//! # Connector Auth
//!
//! Bearer token validation for messaging connector endpoints.
//!
//! Trust is resolved through OpenID Connect discovery: signing keys come from
//! the provider's discovery document, issuers are checked against an
//! allow-list, and providers that tag their keys with endorsements can be
//! required to have endorsed the signing key.
//!
//! ## Features
//!
//! - Issuer pre-filter: tokens from unknown issuers never cause a network fetch
//! - Signature, expiry, not-before, issuer and audience validation
//! - Optional signing algorithm allow-list
//! - Optional endorsement check per signing key
//! - Discovery caches shared by every validator built from the same
//!   [`ConfigCacheRegistry`], with single-flight refresh and stale-serve on
//!   refresh failure
//! - App id extraction for channel and emulator tokens
//!
//! ## Example
//!
//! ```rust,no_run
//! use connector_auth::{ConfigCacheRegistry, TokenValidator, ValidationPolicy};
//! use jsonwebtoken::Algorithm;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // One registry per process, shared by every validator
//!     let registry = ConfigCacheRegistry::default();
//!
//!     let policy = ValidationPolicy::new(
//!         "https://login.example.com/.well-known/openid-configuration",
//!         "https://api.example.com",
//!     )
//!     .with_allowed_algorithms(vec![Algorithm::RS256])
//!     .with_endorsement_validator(|endorsements| endorsements.contains("webchat"));
//!
//!     let validator = TokenValidator::new(policy, &registry).await?;
//!
//!     match validator.identity_from_header(Some("Bearer eyJhbGciOiJSUzI1NiIs...")).await? {
//!         Some(claims) => println!("App id: {:?}", validator.app_id(&claims)),
//!         None => println!("No identity"),
//!     }
//!
//!     Ok(())
//! }
//! ```

mod claims;
mod config;
mod config_cache;
mod endorsements;
mod error;
mod extractor;
pub mod providers;
mod registry;
mod signing;
mod validator;

// Re-exports for public API
pub use claims::Claim;
pub use claims::ClaimSet;
pub use claims::ParsedToken;
pub use claims::MAX_TOKEN_SIZE_BYTES;
pub use config::CacheConfig;
pub use config::EndorsementValidator;
pub use config::ValidationPolicy;
pub use config_cache::ConfigFetcher;
pub use config_cache::RefreshingConfigCache;
pub use endorsements::EndorsementFetcher;
pub use endorsements::EndorsementMap;
pub use error::Error;
pub use error::Result;
pub use extractor::app_id_from_claims;
pub use extractor::app_id_from_emulator_claims;
pub use extractor::LEGACY_EMULATOR_AUDIENCE;
pub use registry::ConfigCacheRegistry;
pub use signing::SigningConfig;
pub use signing::SigningConfigFetcher;
pub use validator::TokenValidator;
pub use validator::ValidateToken;
