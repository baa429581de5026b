//! Handler for Slack interactive components.
//!
//! The only interactive surface is the week announcement: its Join and
//! Cancel buttons arrive as `block_actions` payloads.

use chrono::Utc;
use serde_json::Value;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::helpers::{SLACK_ACK_BUDGET_MS, ok_empty, respond_with_timeout, short_ref};
use super::parsing::{v_array, v_str};
use super::state::AppState;
use crate::core::messages;
use crate::slack::blocks::{ACTION_CANCEL, ACTION_JOIN};
use crate::slack::response_builder::create_ephemeral_payload;

/// Who pressed a button, as far as the payload tells us.
struct Clicker<'a> {
    user_id: &'a str,
    display_name: &'a str,
    response_url: &'a str,
}

fn clicker(payload: &Value) -> Option<Clicker<'_>> {
    let user_id = v_str(payload, &["user", "id"]).filter(|id| !id.is_empty())?;
    let display_name = v_str(payload, &["user", "username"])
        .or_else(|| v_str(payload, &["user", "name"]))
        .unwrap_or(user_id);
    Some(Clicker {
        user_id,
        display_name,
        response_url: v_str(payload, &["response_url"]).unwrap_or(""),
    })
}

// ============================================================================
// Block Action Handlers
// ============================================================================

async fn handle_entry_button(state: &AppState, who: &Clicker<'_>, action_id: &str, week: i64) {
    let result = {
        let mut league = state.league.lock().await;
        let now = Utc::now();
        if action_id == ACTION_JOIN {
            league
                .join(who.user_id, who.display_name, week, now)
                .map(|o| messages::join_outcome(&o))
        } else {
            league
                .cancel(who.user_id, who.display_name, week, now)
                .map(|o| messages::cancel_outcome(&o))
        }
    };

    let text = match result {
        Ok(text) => text,
        Err(e) => {
            let correlation_id = Uuid::new_v4().to_string();
            error!(
                action_id,
                week,
                correlation_id = %correlation_id,
                "Entry update failed: {}", e
            );
            format!(
                "Could not update your entry. Please try again. (ref: {})",
                short_ref(&correlation_id)
            )
        }
    };

    respond_with_timeout(
        &state.messenger,
        who.response_url,
        create_ephemeral_payload(&text),
        SLACK_ACK_BUDGET_MS,
    )
    .await;
}

/// Handle `block_actions` interactive type.
async fn handle_block_actions(state: &AppState, payload: &Value) -> Value {
    let actions = v_array(payload, &["actions"]).cloned().unwrap_or_default();

    let Some(action) = actions.iter().find(|a| {
        a.get("action_id")
            .and_then(Value::as_str)
            .is_some_and(|id| id == ACTION_JOIN || id == ACTION_CANCEL)
    }) else {
        info!("Ignoring block action without an entry button");
        return ok_empty();
    };

    let action_id = v_str(action, &["action_id"]).unwrap_or("");
    let Some(week) = v_str(action, &["value"]).and_then(|v| v.parse::<i64>().ok()) else {
        warn!(action_id, "Entry button without a week value");
        return ok_empty();
    };
    let Some(who) = clicker(payload) else {
        warn!(action_id, "Entry button without a user");
        return ok_empty();
    };

    info!(action_id, week, user = %who.user_id, "Entry button pressed");
    handle_entry_button(state, &who, action_id, week).await;
    ok_empty()
}

// ============================================================================
// Main Entry Point
// ============================================================================

/// Handle an interactive payload from Slack.
///
/// Replies go through the payload's `response_url`; the HTTP response itself
/// is always an empty acknowledgement.
pub async fn handle_interactive(state: &AppState, payload: &Value) -> Value {
    let payload_type = payload.get("type").and_then(|s| s.as_str()).unwrap_or("");

    match payload_type {
        "block_actions" => handle_block_actions(state, payload).await,
        _ => {
            info!("Unhandled interactive type: {}", payload_type);
            ok_empty()
        }
    }
}
