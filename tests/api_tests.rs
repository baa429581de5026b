mod common;

use std::sync::Arc;

use axum::http::HeaderMap;
use chrono::Utc;
use common::{ADMIN, RecordingMessenger, SIGNING_SECRET, league, slack_id, test_config};
use league_bot::api::signature::compute_signature;
use league_bot::api::{AppState, handle_slack_request};
use league_bot::core::config::LeagueRules;
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use serde_json::{Value, json};

fn setup(messenger: RecordingMessenger) -> (AppState, Arc<RecordingMessenger>) {
    let messenger = Arc::new(messenger);
    let state = AppState::new(
        test_config(LeagueRules::default()),
        league(),
        Arc::clone(&messenger) as Arc<dyn league_bot::slack::Messenger>,
    );
    (state, messenger)
}

fn signed_headers(body: &str) -> HeaderMap {
    let ts = Utc::now().timestamp().to_string();
    let mut headers = HeaderMap::new();
    headers.insert(
        "x-slack-signature",
        compute_signature(&ts, body, SIGNING_SECRET).parse().unwrap(),
    );
    headers.insert("x-slack-request-timestamp", ts.parse().unwrap());
    headers
}

fn enc(s: &str) -> String {
    utf8_percent_encode(s, NON_ALPHANUMERIC).to_string()
}

fn slash_body(user: &str, command: &str, text: &str) -> String {
    format!(
        "team_id=T1&channel_id=C1&channel_name=league&user_id={}&user_name={}&command={}&text={}&response_url={}&trigger_id=1.2",
        enc(user),
        enc(&user.to_lowercase()),
        enc(command),
        enc(text),
        enc("https://hooks.slack.com/commands/1")
    )
}

fn button_body(user: &str, action_id: &str, week: i64) -> String {
    let payload = json!({
        "type": "block_actions",
        "user": { "id": user, "username": user.to_lowercase() },
        "response_url": format!("https://hooks.slack.com/actions/{user}"),
        "actions": [{ "action_id": action_id, "value": week.to_string() }]
    });
    format!("payload={}", enc(&payload.to_string()))
}

async fn send(state: &AppState, body: &str) -> Value {
    handle_slack_request(state, &signed_headers(body), body).await
}

/// Status code and decoded JSON body of a handler reply.
fn decode(reply: &Value) -> (u64, Value) {
    let status = reply["statusCode"].as_u64().unwrap();
    let body = reply["body"].as_str().unwrap();
    let body = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(body).unwrap()
    };
    (status, body)
}

async fn slash(state: &AppState, user: &str, command: &str, text: &str) -> Value {
    let (status, body) = decode(&send(state, &slash_body(user, command, text)).await);
    assert_eq!(status, 200);
    body
}

#[tokio::test]
async fn test_unsigned_requests_are_rejected() {
    let (state, _) = setup(RecordingMessenger::default());
    let body = slash_body("U01", "/register", "");

    let reply = handle_slack_request(&state, &HeaderMap::new(), &body).await;
    assert_eq!(reply["statusCode"], 401);

    let mut headers = signed_headers(&body);
    headers.insert("x-slack-signature", "v0=deadbeef".parse().unwrap());
    let reply = handle_slack_request(&state, &headers, &body).await;
    assert_eq!(reply["statusCode"], 401);
}

#[tokio::test]
async fn test_signed_garbage_is_a_bad_request() {
    let (state, _) = setup(RecordingMessenger::default());
    let reply = send(&state, "user_id=U01&text=hello").await;
    assert_eq!(reply["statusCode"], 400);
}

#[tokio::test]
async fn test_register_and_help() {
    let (state, _) = setup(RecordingMessenger::default());

    let body = slash(&state, "U01", "/register", "").await;
    assert_eq!(body["response_type"], "ephemeral");
    assert!(body["text"].as_str().unwrap().starts_with("Registered!"));

    let body = slash(&state, "U01", "/league", "register").await;
    assert_eq!(body["text"], "You're already registered.");

    let body = slash(&state, "U01", "/league", "").await;
    assert!(body["text"].as_str().unwrap().contains("/leaderboard"));

    let body = slash(&state, "U01", "/league", "dance").await;
    assert!(body["text"].as_str().unwrap().starts_with("Unknown command `dance`"));
}

#[tokio::test]
async fn test_admin_commands_are_restricted() {
    let (state, _) = setup(RecordingMessenger::with_workspace_admins(&["UOWNER"]));

    let body = slash(&state, "U01", "/create_season", "S1").await;
    assert_eq!(body["text"], "This command is only available to league admins.");

    let body = slash(&state, ADMIN, "/create_season", "S1").await;
    assert!(body["text"].as_str().unwrap().starts_with("Season S1 started"));

    // Workspace owners count as admins too.
    let body = slash(&state, "UOWNER", "/create_season", "S2").await;
    assert!(body["text"].as_str().unwrap().starts_with("Season S2 started"));

    let body = slash(&state, ADMIN, "/create_season", "S1").await;
    assert_eq!(body["text"], "season 'S1' already exists");

    let body = slash(&state, ADMIN, "/create_season", "").await;
    assert_eq!(body["text"], "Usage: `/create_season <name>`");
}

#[tokio::test]
async fn test_weekly_flow_through_slack() {
    let (state, messenger) = setup(RecordingMessenger::default());

    let body = slash(&state, ADMIN, "/announce", "1").await;
    assert_eq!(
        body["text"],
        "No active season. Create one with /create_season first."
    );

    slash(&state, ADMIN, "/create_season", "S1").await;
    let body = slash(&state, ADMIN, "/announce", "1").await;
    assert_eq!(body["response_type"], "in_channel");
    assert_eq!(body["blocks"][2]["block_id"], "entry_week_1");

    // Nine players press Join; one of them changes their mind.
    for n in 1..=9 {
        let reply = send(&state, &button_body(&slack_id(n), "entry_join", 1)).await;
        assert_eq!(reply, json!({ "statusCode": 200, "body": "" }));
    }
    send(&state, &button_body(&slack_id(9), "entry_cancel", 1)).await;

    let responses = messenger.responses();
    assert_eq!(responses.len(), 10);
    assert_eq!(responses[0].0, "https://hooks.slack.com/actions/U01");
    assert_eq!(responses[0].1["text"], "You're in for week 1 (+0.5pt).");
    assert_eq!(responses[0].1["replace_original"], false);
    assert_eq!(
        responses[9].1["text"],
        "Your entry for week 1 was canceled (-0.5pt)."
    );

    // Closing entries opens room 1 and posts the first match there.
    let body = slash(&state, ADMIN, "/close_entries", "week=1").await;
    assert_eq!(body["response_type"], "in_channel");
    assert!(body["text"].as_str().unwrap().contains("Room 1 (session 2)"));

    let posts = messenger.posts();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].room_label, "1");
    assert_eq!(posts[0].members, (1..=8).map(slack_id).collect::<Vec<_>>());
    assert!(posts[0].text.contains("Session 2"));
    assert!(posts[0].text.contains("Match #1"));

    let reply = send(&state, &button_body("U10", "entry_join", 1)).await;
    assert_eq!(reply["statusCode"], 200);
    assert_eq!(
        messenger.responses().last().unwrap().1["text"],
        "Entries for week 1 are closed."
    );

    // Anyone can report a result; the room gets the next match.
    let body = slash(&state, "U03", "/win", "2 A Mako Mart").await;
    assert_eq!(
        body["text"],
        "Posted the result and the next match to the room channel."
    );
    let posts = messenger.posts();
    assert_eq!(posts.len(), 2);
    assert!(posts[1].text.starts_with("*Recorded*: Match #1 → Team A wins"));
    assert!(posts[1].text.contains("Match #2"));
    assert!(posts[1].members.is_empty());

    let body = slash(&state, "U03", "/win", "2 C").await;
    assert_eq!(body["text"], "team must be A or B");

    let body = slash(&state, ADMIN, "/finish_session", "2").await;
    assert_eq!(
        body["text"],
        "Session 2 finished. Today's wins were added to season S1."
    );
    assert_eq!(messenger.posts().len(), 3);

    let body = slash(&state, "U03", "/win", "2 B").await;
    assert_eq!(body["text"], "Session 2 has already finished.");

    let body = slash(&state, "U05", "/leaderboard", "").await;
    assert_eq!(body["response_type"], "in_channel");
    let text = body["text"].as_str().unwrap();
    assert!(text.starts_with("*S1 Leaderboard*\n1. u01 — 1.5pt (entry 0.5 + wins 1)"));
    assert!(text.contains("u09 — 0.0pt"));

    let body = slash(&state, "U05", "/leaderboard", "S9").await;
    assert_eq!(body["text"], "Season not found.");
}
