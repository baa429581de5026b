use serde_json::{Value, json};

pub const ACTION_JOIN: &str = "entry_join";
pub const ACTION_CANCEL: &str = "entry_cancel";

/// Build the week announcement with Join / Cancel buttons.
///
/// Both buttons carry the week number as their `value`, so a click can be
/// resolved without any server-side view state.
#[must_use]
pub fn build_entry_announcement(week: i64, season_name: &str) -> Value {
    json!([
        {
            "type": "header",
            "text": { "type": "plain_text", "text": format!("Week {week} entries") }
        },
        {
            "type": "section",
            "text": {
                "type": "mrkdwn",
                "text": format!(
                    "Season *{season_name}*: press *Join* or *Cancel* below. You can change your mind until entries close."
                )
            }
        },
        {
            "type": "actions",
            "block_id": format!("entry_week_{week}"),
            "elements": [
                {
                    "type": "button",
                    "action_id": ACTION_JOIN,
                    "style": "primary",
                    "text": { "type": "plain_text", "text": "Join" },
                    "value": week.to_string()
                },
                {
                    "type": "button",
                    "action_id": ACTION_CANCEL,
                    "style": "danger",
                    "text": { "type": "plain_text", "text": "Cancel" },
                    "value": week.to_string()
                }
            ]
        }
    ])
}
