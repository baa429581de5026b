use league_bot::slack::blocks::build_entry_announcement;
use league_bot::slack::response_builder::{
    create_ephemeral_payload, create_in_channel_blocks_payload, create_in_channel_payload,
};

/// Tests for the response payloads returned to Slack.
/// Button replies must never replace the announcement they came from.

#[test]
fn test_ephemeral_payload() {
    let payload = create_ephemeral_payload("Test ephemeral message");

    let payload_str = serde_json::to_string(&payload).unwrap();

    assert!(
        payload_str.contains("\"response_type\":\"ephemeral\""),
        "Payload should include ephemeral response_type"
    );
    assert!(
        payload_str.contains("\"text\":\"Test ephemeral message\""),
        "Payload should include the text field with correct content"
    );
}

#[test]
fn test_ephemeral_payload_keeps_original_message() {
    let v = create_ephemeral_payload("You're in for week 1 (+0.5pt).");
    assert_eq!(
        v.get("replace_original").and_then(|b| b.as_bool()),
        Some(false)
    );
}

#[test]
fn test_in_channel_payload() {
    let v = create_in_channel_payload("*S1 Leaderboard*");
    assert_eq!(v["response_type"], "in_channel");
    assert_eq!(v["text"], "*S1 Leaderboard*");
    assert!(v.get("blocks").is_none());
}

#[test]
fn test_announcement_payload_carries_blocks_and_fallback() {
    let blocks = build_entry_announcement(4, "Spring");
    let v = create_in_channel_blocks_payload("Week 4 entries are open", &blocks);

    assert_eq!(v["response_type"], "in_channel");
    assert_eq!(v["text"], "Week 4 entries are open");
    let sent = v["blocks"].as_array().unwrap();
    assert_eq!(sent.len(), 3);
    assert_eq!(sent[2]["block_id"], "entry_week_4");
    assert!(
        sent[1]["text"]["text"].as_str().unwrap().contains("Spring"),
        "Section should name the season"
    );
}
