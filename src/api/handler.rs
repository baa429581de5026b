//! Request handler - thin router that delegates to specialized handlers.
//!
//! This module handles:
//! - Request validation (headers, signature)
//! - Interactive components (delegated to `interactive_handler` module)
//! - Slash commands (delegated to `slash_handler` module)

use axum::http::HeaderMap;
use chrono::Utc;
use serde_json::Value;
use tracing::{error, info};

use super::state::AppState;
use super::{helpers, interactive_handler, parsing, signature, slash_handler};

/// Verify and route a Slack request.
///
/// Returns a `{statusCode, body}` value: 401 when the signature is missing
/// or wrong, 400 when the body cannot be parsed, otherwise the handler's reply.
#[tracing::instrument(level = "info", skip_all)]
pub async fn handle_slack_request(state: &AppState, headers: &HeaderMap, body: &str) -> Value {
    // ========================================================================
    // Verify Slack signature
    // ========================================================================

    if let Err(response) = verify_signature(body, headers, state) {
        return response;
    }

    info!("Slack signature verified successfully");

    // ========================================================================
    // Route to specialized handlers
    // ========================================================================

    // Interactive components (form-encoded with payload=)
    if parsing::is_interactive_body(body) {
        let payload = match parsing::parse_interactive_payload(body) {
            Ok(v) => v,
            Err(e) => {
                error!("Interactive payload parse error: {}", e);
                return helpers::err_response(400, &format!("Parse Error: {e}"));
            }
        };

        return interactive_handler::handle_interactive(state, &payload).await;
    }

    // Slash command (form-encoded)
    match slash_handler::handle_slash_command(state, body).await {
        Ok(response) => response,
        Err(e) => {
            error!("Failed to parse Slack request: {}", e);
            helpers::err_response(400, &format!("Parse Error: {e}"))
        }
    }
}

// ============================================================================
// Request Validation Helpers
// ============================================================================

fn verify_signature(body: &str, headers: &HeaderMap, state: &AppState) -> Result<(), Value> {
    let Some(sig) = parsing::get_header_value(headers, "X-Slack-Signature") else {
        error!("Missing X-Slack-Signature header");
        return Err(helpers::err_response(
            401,
            "Missing X-Slack-Signature header",
        ));
    };

    let Some(timestamp) = parsing::get_header_value(headers, "X-Slack-Request-Timestamp") else {
        error!("Missing X-Slack-Request-Timestamp header");
        return Err(helpers::err_response(
            401,
            "Missing X-Slack-Request-Timestamp header",
        ));
    };

    if !signature::verify_slack_signature(
        body,
        timestamp,
        sig,
        &state.config.slack_signing_secret,
        Utc::now().timestamp(),
    ) {
        error!("Slack signature verification failed");
        return Err(helpers::err_response(401, "Invalid Slack signature"));
    }

    Ok(())
}
