use std::collections::HashMap;

use axum::http::HeaderMap;
use once_cell::sync::Lazy;
use percent_encoding::percent_decode_str;
use regex::Regex;
use serde_json::Value;

use crate::core::models::Team;
use crate::errors::LeagueError;

/// Fields Slack sends when a user invokes a slash command.
#[derive(Debug, Clone, Default)]
pub struct SlashCommand {
    pub team_id: String,
    pub channel_id: String,
    pub channel_name: String,
    pub user_id: String,
    pub user_name: String,
    pub command: String,
    pub text: String,
    pub response_url: String,
    pub trigger_id: String,
}

/// Decodes a URL encoded form component; `+` becomes a space.
///
/// # Examples
///
/// ```
/// use league_bot::api::parsing::decode_url_component;
///
/// assert_eq!(decode_url_component("hello%20world").unwrap(), "hello world");
/// assert_eq!(decode_url_component("hello+world").unwrap(), "hello world");
/// ```
///
/// # Errors
///
/// Returns an error if the decoded bytes are not UTF-8.
pub fn decode_url_component(input: &str) -> Result<String, String> {
    let spaced = input.replace('+', " ");
    percent_decode_str(&spaced)
        .decode_utf8()
        .map(|s| s.to_string())
        .map_err(|e| format!("Failed to decode URL component: {e}"))
}

/// Decode an `application/x-www-form-urlencoded` body into key/value pairs.
///
/// # Errors
///
/// Returns an error if a key or value is not valid UTF-8 after decoding.
pub fn parse_form(body: &str) -> Result<HashMap<String, String>, String> {
    let mut map = HashMap::new();
    for pair in body.split('&').filter(|p| !p.is_empty()) {
        let (raw_key, raw_value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = decode_url_component(raw_key).map_err(|e| format!("Failed to decode key: {e}"))?;
        let value =
            decode_url_component(raw_value).map_err(|e| format!("Failed to decode value: {e}"))?;
        map.insert(key, value);
    }
    Ok(map)
}

/// Parse a slash command form body.
///
/// # Errors
///
/// Returns `ParseError` if the body cannot be decoded or lacks `command`.
pub fn parse_slash_command(body: &str) -> Result<SlashCommand, LeagueError> {
    let map = parse_form(body)
        .map_err(|e| LeagueError::ParseError(format!("Failed to parse form data: {e}")))?;
    let field = |k: &str| map.get(k).cloned().unwrap_or_default();

    let command = SlashCommand {
        team_id: field("team_id"),
        channel_id: field("channel_id"),
        channel_name: field("channel_name"),
        user_id: field("user_id"),
        user_name: field("user_name"),
        command: field("command"),
        text: field("text"),
        response_url: field("response_url"),
        trigger_id: field("trigger_id"),
    };
    if command.command.is_empty() {
        return Err(LeagueError::ParseError("Missing command field".to_string()));
    }
    Ok(command)
}

pub fn is_interactive_body(body: &str) -> bool {
    body.starts_with("payload=") || body.contains("&payload=")
}

/// Extract and parse the JSON `payload=` field of an interactive request.
///
/// # Errors
///
/// Returns `ParseError` if the field is missing, undecodable, or not JSON.
pub fn parse_interactive_payload(form_body: &str) -> Result<Value, LeagueError> {
    for pair in form_body.split('&') {
        if let Some(("payload", raw_val)) = pair.split_once('=') {
            let decoded = decode_url_component(raw_val)
                .map_err(|e| LeagueError::ParseError(format!("Failed to decode payload: {e}")))?;
            let v: Value = serde_json::from_str(&decoded)
                .map_err(|e| LeagueError::ParseError(format!("Invalid JSON payload: {e}")))?;
            return Ok(v);
        }
    }
    Err(LeagueError::ParseError("Missing payload field".to_string()))
}

pub fn v_path<'a>(root: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut cur = root;
    for key in path {
        cur = cur.get(*key)?;
    }
    Some(cur)
}

pub fn v_str<'a>(root: &'a Value, path: &[&str]) -> Option<&'a str> {
    v_path(root, path).and_then(|v| v.as_str())
}

pub fn v_array<'a>(root: &'a Value, path: &[&str]) -> Option<&'a Vec<Value>> {
    v_path(root, path).and_then(|v| v.as_array())
}

pub fn get_header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

// ============================================================================
// Command arguments
// ============================================================================

/// Resolve the subcommand name and its argument text.
///
/// `/win 3 A` gives `("win", "3 A")`; the umbrella form `/league win 3 A`
/// gives the same result.
#[must_use]
pub fn split_command<'a>(command: &'a str, text: &'a str) -> (String, &'a str) {
    let name = command.trim().trim_start_matches('/').to_lowercase();
    if name == "league" {
        let text = text.trim();
        return match text.split_once(char::is_whitespace) {
            Some((sub, rest)) => (sub.to_lowercase(), rest.trim()),
            None => (text.to_lowercase(), ""),
        };
    }
    (name, text.trim())
}

static KV_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(\w+)\s*=\s*("[^"]*"|\S+)"#).expect("static regex compile"));

/// Collect `key=value` pairs (values may be double-quoted) and the remaining
/// positional words.
fn split_args(text: &str) -> (HashMap<String, String>, Vec<String>) {
    let mut named = HashMap::new();
    for cap in KV_RE.captures_iter(text) {
        named.insert(cap[1].to_lowercase(), cap[2].trim_matches('"').to_string());
    }
    let rest = KV_RE.replace_all(text, " ");
    let positional = rest.split_whitespace().map(str::to_string).collect();
    (named, positional)
}

fn parse_int(raw: &str, what: &str) -> Result<i64, String> {
    match raw.trim().parse::<i64>() {
        Ok(n) if n > 0 => Ok(n),
        Ok(_) => Err(format!("{what} must be a positive number")),
        Err(_) => Err(format!("{what} must be a number, got '{raw}'")),
    }
}

/// Parse a week number: `3` or `week=3`.
///
/// # Errors
///
/// Returns a usage message when missing or not a positive integer.
pub fn parse_week(text: &str) -> Result<i64, String> {
    let (named, positional) = split_args(text);
    let raw = named
        .get("week")
        .cloned()
        .or_else(|| positional.first().cloned())
        .ok_or_else(|| "Please give a week number, e.g. `3`.".to_string())?;
    parse_int(&raw, "week")
}

/// Parse a session id: `12` or `session=12`.
///
/// # Errors
///
/// Returns a usage message when missing or not a positive integer.
pub fn parse_session_id(text: &str) -> Result<i64, String> {
    let (named, positional) = split_args(text);
    let raw = named
        .get("session")
        .cloned()
        .or_else(|| positional.first().cloned())
        .ok_or_else(|| "Please give a session id, e.g. `12`.".to_string())?;
    parse_int(&raw, "session")
}

/// Arguments of `/win`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WinArgs {
    pub session_id: i64,
    pub team: Team,
    pub stage: String,
}

/// Parse `/win <session> <A|B> [stage...]` (or `session=`, `team=`, `stage=`).
///
/// # Errors
///
/// Returns a usage message when the session or team is missing or invalid.
pub fn parse_win_args(text: &str) -> Result<WinArgs, String> {
    const USAGE: &str = "Usage: `/win <session> <A|B> [stage]`";
    let (named, positional) = split_args(text);
    let mut positional = positional.into_iter();

    let session_raw = named
        .get("session")
        .cloned()
        .or_else(|| positional.next())
        .ok_or_else(|| USAGE.to_string())?;
    let session_id = parse_int(&session_raw, "session")?;

    let team_raw = named
        .get("team")
        .cloned()
        .or_else(|| positional.next())
        .ok_or_else(|| USAGE.to_string())?;
    let team = team_raw.parse::<Team>().map_err(|_| "team must be A or B".to_string())?;

    let stage = named
        .get("stage")
        .cloned()
        .unwrap_or_else(|| positional.collect::<Vec<_>>().join(" "));

    Ok(WinArgs {
        session_id,
        team,
        stage,
    })
}

/// Parse a free-form name argument: `S1`, `"Spring 2025"` or `name=S1`.
#[must_use]
pub fn parse_name(text: &str) -> Option<String> {
    let (named, _) = split_args(text);
    let name = named
        .get("name")
        .or_else(|| named.get("season"))
        .cloned()
        .unwrap_or_else(|| text.trim().trim_matches('"').to_string());
    let name = name.trim().to_string();
    (!name.is_empty()).then_some(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn slash_command_is_decoded() {
        let body = "team_id=T1&channel_id=C1&channel_name=general&user_id=U1&user_name=alice\
                    &command=%2Fwin&text=3+a+final+round&response_url=https%3A%2F%2Fhooks.slack.com%2Fx\
                    &trigger_id=1.2";
        let cmd = parse_slash_command(body).unwrap();
        assert_eq!(cmd.command, "/win");
        assert_eq!(cmd.text, "3 a final round");
        assert_eq!(cmd.response_url, "https://hooks.slack.com/x");
        assert_eq!(cmd.user_name, "alice");
    }

    #[test]
    fn missing_command_is_a_parse_error() {
        assert!(matches!(
            parse_slash_command("user_id=U1&text=hi"),
            Err(LeagueError::ParseError(_))
        ));
    }

    #[test]
    fn encoded_plus_stays_a_plus() {
        assert_eq!(decode_url_component("a%2Bb+c").unwrap(), "a+b c");
    }

    #[test]
    fn interactive_payload_is_extracted() {
        let body = "payload=%7B%22type%22%3A%22block_actions%22%7D";
        assert!(is_interactive_body(body));
        let v = parse_interactive_payload(body).unwrap();
        assert_eq!(v_str(&v, &["type"]), Some("block_actions"));
        assert!(parse_interactive_payload("token=x").is_err());
    }

    #[test]
    fn umbrella_command_splits_subcommand() {
        assert_eq!(split_command("/league", "Win 3 A"), ("win".to_string(), "3 A"));
        assert_eq!(split_command("/league", "leaderboard"), ("leaderboard".to_string(), ""));
        assert_eq!(split_command("/win", " 3 A "), ("win".to_string(), "3 A"));
    }

    #[test]
    fn week_accepts_positional_and_named() {
        assert_eq!(parse_week("3"), Ok(3));
        assert_eq!(parse_week("week=4"), Ok(4));
        assert!(parse_week("").is_err());
        assert!(parse_week("0").is_err());
        assert!(parse_week("three").is_err());
    }

    #[test]
    fn win_args_parse_stage_rest() {
        assert_eq!(
            parse_win_args("12 b Mako Mart").unwrap(),
            WinArgs {
                session_id: 12,
                team: Team::B,
                stage: "Mako Mart".into()
            }
        );
        assert_eq!(
            parse_win_args("session=5 team=A stage=\"Wahoo World\"").unwrap(),
            WinArgs {
                session_id: 5,
                team: Team::A,
                stage: "Wahoo World".into()
            }
        );
        assert_eq!(parse_win_args("5 A").unwrap().stage, "");
        assert!(parse_win_args("5 C").is_err());
        assert!(parse_win_args("5").is_err());
    }

    #[test]
    fn names_are_trimmed_and_unquoted() {
        assert_eq!(parse_name(" S1 "), Some("S1".into()));
        assert_eq!(parse_name("\"Spring 2025\""), Some("Spring 2025".into()));
        assert_eq!(parse_name("name=S2"), Some("S2".into()));
        assert_eq!(parse_name("   "), None);
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let mut headers = HeaderMap::new();
        headers.insert("x-slack-signature", "v0=abc".parse().unwrap());
        assert_eq!(get_header_value(&headers, "X-Slack-Signature"), Some("v0=abc"));
        assert_eq!(get_header_value(&headers, "X-Missing"), None);
    }
}
