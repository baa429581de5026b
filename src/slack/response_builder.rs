//! Response-related utilities for Slack interactions.
//!
//! This module provides standardized ways to create the message payloads
//! returned to Slack, either as a slash-command response body or via an
//! interaction's `response_url`.

use serde_json::{Value, json};

/// Create a JSON payload for an ephemeral response
///
/// Ephemeral messages are only visible to the user who triggered the command
/// or pressed the button. `replace_original` is set to `false` so a button
/// press never overwrites the announcement it came from.
///
/// # Examples
///
/// ```
/// use league_bot::slack::response_builder::create_ephemeral_payload;
///
/// let payload = create_ephemeral_payload("Only you can see this");
/// assert_eq!(payload["response_type"], "ephemeral");
/// ```
#[must_use]
pub fn create_ephemeral_payload(text: &str) -> Value {
    json!({
        "text": text,
        "response_type": "ephemeral",
        "replace_original": false
    })
}

/// Create a JSON payload visible to everyone in the channel.
#[must_use]
pub fn create_in_channel_payload(text: &str) -> Value {
    json!({
        "text": text,
        "response_type": "in_channel"
    })
}

/// Create an in-channel payload carrying Block Kit `blocks`; `text` is the
/// notification fallback.
#[must_use]
pub fn create_in_channel_blocks_payload(text: &str, blocks: &Value) -> Value {
    json!({
        "text": text,
        "response_type": "in_channel",
        "blocks": blocks
    })
}
