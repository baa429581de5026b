//! Common helper functions for API handlers.
//!
//! This module provides response builders and shared async operations
//! to reduce duplication across handlers.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use tracing::error;

use crate::slack::Messenger;
use crate::slack::response_builder::{
    create_ephemeral_payload, create_in_channel_blocks_payload, create_in_channel_payload,
};

/// Slack retries a request that is not acknowledged within three seconds;
/// outbound calls made while handling it get a smaller budget.
pub const SLACK_ACK_BUDGET_MS: u64 = 2000;

// ============================================================================
// Response Builders
// ============================================================================

/// Returns a 200 OK response with an empty JSON body.
#[must_use]
pub fn ok_empty() -> Value {
    json!({ "statusCode": 200, "body": "" })
}

/// Returns a 200 OK response with an ephemeral Slack message.
#[must_use]
pub fn ok_ephemeral(text: &str) -> Value {
    json!({
        "statusCode": 200,
        "body": create_ephemeral_payload(text).to_string()
    })
}

/// Returns a 200 OK response with a message visible to the whole channel.
#[must_use]
pub fn ok_in_channel(text: &str) -> Value {
    json!({
        "statusCode": 200,
        "body": create_in_channel_payload(text).to_string()
    })
}

/// Returns a 200 OK response posting Block Kit `blocks` to the channel.
#[must_use]
pub fn ok_in_channel_blocks(text: &str, blocks: &Value) -> Value {
    json!({
        "statusCode": 200,
        "body": create_in_channel_blocks_payload(text, blocks).to_string()
    })
}

/// Returns an error response with the given status code and message.
#[must_use]
pub fn err_response(status_code: u16, message: &str) -> Value {
    json!({
        "statusCode": status_code,
        "body": json!({ "error": message }).to_string()
    })
}

/// First eight characters of a correlation id, shown to users as a reference.
#[must_use]
pub fn short_ref(correlation_id: &str) -> &str {
    correlation_id.get(..8).unwrap_or(correlation_id)
}

// ============================================================================
// Outbound Messages
// ============================================================================

/// A message destined for a room channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomPost {
    pub room_label: String,
    pub text: String,
    /// Slack ids to invite when the channel has to be created.
    pub members: Vec<String>,
}

/// Posts room messages with a timeout to avoid blocking the Slack ack.
///
/// Posting happens on a spawned task; if the timeout fires, the remaining
/// posts continue in the background.
pub async fn post_rooms_with_timeout(
    messenger: &Arc<dyn Messenger>,
    posts: Vec<RoomPost>,
    timeout_ms: u64,
) {
    if posts.is_empty() {
        return;
    }
    let messenger = Arc::clone(messenger);

    let handle = tokio::spawn(async move {
        for post in posts {
            if let Err(e) = messenger
                .post_to_room(&post.room_label, &post.text, &post.members)
                .await
            {
                error!(room = %post.room_label, "Failed to post to room channel: {}", e);
            }
        }
    });

    let _ = tokio::time::timeout(Duration::from_millis(timeout_ms), handle).await;
}

/// Replies through an interaction `response_url` (fire-and-forget with timeout).
pub async fn respond_with_timeout(
    messenger: &Arc<dyn Messenger>,
    response_url: &str,
    payload: Value,
    timeout_ms: u64,
) {
    if response_url.is_empty() {
        return;
    }
    let messenger = Arc::clone(messenger);
    let response_url = response_url.to_string();

    let handle = tokio::spawn(async move {
        if let Err(e) = messenger.respond(&response_url, &payload).await {
            error!("Failed to respond via response_url: {}", e);
        }
    });

    let _ = tokio::time::timeout(Duration::from_millis(timeout_ms), handle).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ephemeral_body_is_serialized_json() {
        let resp = ok_ephemeral("hi");
        assert_eq!(resp["statusCode"], 200);
        let body: Value = serde_json::from_str(resp["body"].as_str().unwrap()).unwrap();
        assert_eq!(body["response_type"], "ephemeral");
        assert_eq!(body["text"], "hi");
    }

    #[test]
    fn short_ref_handles_short_ids() {
        assert_eq!(short_ref("0123456789"), "01234567");
        assert_eq!(short_ref("abc"), "abc");
    }
}
