use std::time::Duration;

use connector_auth::providers::bot_framework;
use connector_auth::CacheConfig;
use connector_auth::ConfigCacheRegistry;
use connector_auth::TokenValidator;
use connector_auth::ValidateToken;
use connector_auth::ValidationPolicy;
use jsonwebtoken::Algorithm;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // One registry for the whole process: validators built from it share
    // discovery and key set traffic per identity provider
    let custom_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()?;
    let registry = ConfigCacheRegistry::new(
        CacheConfig::default()
            .with_refresh_interval(Duration::from_secs(24 * 60 * 60))
            .with_http_client(custom_client),
    );

    // Example JWT token (this is just a placeholder - use a real token in practice)
    let header = "Bearer eyJhbGciOiJSUzI1NiIsInR5cCI6IkpXVCJ9...";

    // Example 1: Connector service tokens for one channel
    println!("=== Example 1: Channel Tokens ===");
    let channel = TokenValidator::for_channel("msteams", &registry).await?;

    match channel.identity_from_header(Some(header)).await {
        Ok(Some(claims)) => {
            println!("✓ Token verified successfully!");
            println!("  App id: {:?}", channel.app_id(&claims));
        }
        Ok(None) => println!("✗ No identity"),
        Err(e) => eprintln!("✗ Cannot validate tokens right now: {e}"),
    }

    println!();

    // Example 2: Emulator tokens
    println!("=== Example 2: Emulator Tokens ===");
    let emulator = TokenValidator::for_emulator(&registry).await?;

    match emulator.identity_from_header(Some(header)).await {
        Ok(Some(claims)) => {
            println!("✓ Token verified successfully!");
            println!("  App id: {:?}", emulator.emulator_app_id(&claims));
        }
        Ok(None) => println!("✗ No identity"),
        Err(e) => eprintln!("✗ Cannot validate tokens right now: {e}"),
    }

    println!();

    // Example 3: Custom policy with detailed rejection reasons
    println!("=== Example 3: Custom Policy ===");
    let policy = ValidationPolicy::new(
        bot_framework::CHANNEL_OPENID_METADATA_URL,
        bot_framework::CHANNEL_ISSUER,
    )
    .with_audience("my-bot-app-id")
    .with_allowed_algorithms(vec![Algorithm::RS256])
    .with_endorsement_validator(|endorsements| endorsements.contains("webchat"));
    let validator = TokenValidator::new(policy, &registry).await?;

    let token = header.trim_start_matches("Bearer ");
    match validator.validate(token).await {
        Ok(claims) => println!("✓ Token verified with {} claims", claims.len()),
        Err(e) => eprintln!("✗ Token verification failed: {e}"),
    }

    Ok(())
}
