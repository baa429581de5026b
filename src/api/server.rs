//! HTTP surface: the Slack request URLs plus a health probe.

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;
use tracing::info;

use super::handler::handle_slack_request;
use super::state::SharedState;
use crate::errors::LeagueError;

/// Turn a handler's `{statusCode, body}` value into an HTTP response.
///
/// An empty body becomes a bare 200 so Slack treats it as a plain ack.
#[must_use]
pub fn into_http_response(reply: &Value) -> Response {
    let status = reply
        .get("statusCode")
        .and_then(Value::as_u64)
        .and_then(|code| u16::try_from(code).ok())
        .and_then(|code| StatusCode::from_u16(code).ok())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = reply
        .get("body")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();

    if body.is_empty() {
        return status.into_response();
    }
    (status, [(CONTENT_TYPE, "application/json")], body).into_response()
}

async fn slack_endpoint(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let reply = handle_slack_request(&state, &headers, &body).await;
    into_http_response(&reply)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "application": env!("CARGO_PKG_NAME") }))
}

#[must_use]
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .route("/slack/commands", post(slack_endpoint))
        .route("/slack/interactive", post(slack_endpoint))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");
}

/// Bind `state.config.bind_addr` and serve until Ctrl-C.
///
/// # Errors
///
/// Returns `GeneralError` if the address cannot be bound or the server fails.
pub async fn serve(state: SharedState) -> Result<(), LeagueError> {
    let addr = state.config.bind_addr;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| LeagueError::GeneralError(format!("failed to bind {addr}: {e}")))?;
    info!(%addr, "league-bot listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| LeagueError::GeneralError(format!("server error: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::helpers::{err_response, ok_empty, ok_ephemeral};

    #[test]
    fn empty_reply_is_a_bare_ack() {
        let resp = into_http_response(&ok_empty());
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers().get(CONTENT_TYPE).is_none());
    }

    #[test]
    fn json_reply_keeps_status_and_content_type() {
        let resp = into_http_response(&ok_ephemeral("hi"));
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[CONTENT_TYPE], "application/json");

        let resp = into_http_response(&err_response(401, "nope"));
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
