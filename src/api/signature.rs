use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::error;

/// Requests older than this many seconds are rejected as replays.
const MAX_REQUEST_AGE_SECS: i64 = 300;
/// Tolerated clock skew for timestamps from the future.
const MAX_CLOCK_SKEW_SECS: i64 = 60;

/// Verify Slack's `X-Slack-Signature` for a request body.
///
/// The base string is `v0:{timestamp}:{body}`, signed with HMAC-SHA256 and
/// hex encoded behind a `v0=` prefix. The comparison is constant time.
#[must_use]
pub fn verify_slack_signature(
    request_body: &str,
    timestamp: &str,
    signature: &str,
    signing_secret: &str,
    now_secs: i64,
) -> bool {
    let Ok(ts) = timestamp.parse::<i64>() else {
        error!("Malformed request timestamp");
        return false;
    };
    let in_window = match (now_secs.checked_sub(ts), ts.checked_sub(now_secs)) {
        (Some(age), Some(ahead)) => age <= MAX_REQUEST_AGE_SECS && ahead <= MAX_CLOCK_SKEW_SECS,
        _ => false,
    };
    if !in_window {
        error!("Timestamp out of range, potential replay attack");
        return false;
    }

    let Some(received) = signature
        .strip_prefix("v0=")
        .and_then(|hex_sig| hex::decode(hex_sig).ok())
    else {
        error!("Malformed signature header");
        return false;
    };

    let mut mac = match Hmac::<Sha256>::new_from_slice(signing_secret.as_bytes()) {
        Ok(mac) => mac,
        Err(e) => {
            error!("Failed to create HMAC: {}", e);
            return false;
        }
    };
    mac.update(format!("v0:{timestamp}:{request_body}").as_bytes());

    if mac.verify_slice(&received).is_ok() {
        true
    } else {
        error!("Signature verification failed");
        false
    }
}

/// Compute the `v0=` signature Slack would send for a body.
#[must_use]
pub fn compute_signature(timestamp: &str, request_body: &str, signing_secret: &str) -> String {
    let base_string = format!("v0:{timestamp}:{request_body}");
    let mut mac = match Hmac::<Sha256>::new_from_slice(signing_secret.as_bytes()) {
        Ok(mac) => mac,
        Err(e) => {
            error!("Failed to create HMAC: {}", e);
            return String::new();
        }
    };
    mac.update(base_string.as_bytes());
    format!("v0={}", hex::encode(mac.finalize().into_bytes()))
}
