//! Application identity from verified claims
//!
//! Three generations of token issuers state "which app is calling" in three
//! different claim layouts, and nothing but the shape of the claims tells
//! them apart:
//!
//! - v2.0 tokens (`ver` = `2.0`): the app id is in `azp`, and `aud` repeats it
//! - v1.0 tokens: the app id is in `appid`, and `aud` repeats it
//! - legacy emulator tokens: the app id is in `appid`, with `aud` set to
//!   [`LEGACY_EMULATOR_AUDIENCE`]

use crate::claims::ClaimSet;
use crate::claims::APP_ID_CLAIM;
use crate::claims::AUDIENCE_CLAIM;
use crate::claims::AUTHORIZED_PARTY_CLAIM;
use crate::claims::VERSION_CLAIM;

/// Audience carried by tokens from the oldest emulator generation
pub const LEGACY_EMULATOR_AUDIENCE: &str = "https://graph.microsoft.com";

const VERSION_2: &str = "2.0";

/// App id of a channel token: the audience asserted by an accepted issuer
pub fn app_id_from_claims(claims: &ClaimSet, accepted_issuers: &[String]) -> Option<String> {
    claims
        .iter()
        .find(|c| c.claim_type == AUDIENCE_CLAIM && accepted_issuers.contains(&c.issuer))
        .map(|c| c.value.clone())
}

/// App id of an emulator token, whichever generation issued it
pub fn app_id_from_emulator_claims(
    claims: &ClaimSet,
    accepted_issuers: &[String],
) -> Option<String> {
    let is_v2 = claims.value(VERSION_CLAIM) == Some(VERSION_2);
    let app_id_type = if is_v2 {
        AUTHORIZED_PARTY_CLAIM
    } else {
        APP_ID_CLAIM
    };

    let candidate = claims
        .iter()
        .find(|c| c.claim_type == app_id_type && accepted_issuers.contains(&c.issuer))?;

    let has_audience = |value: &str| {
        claims
            .iter()
            .any(|c| c.claim_type == AUDIENCE_CLAIM && c.value == value)
    };

    if has_audience(&candidate.value) || has_audience(LEGACY_EMULATOR_AUDIENCE) {
        return Some(candidate.value.clone());
    }

    None
}
