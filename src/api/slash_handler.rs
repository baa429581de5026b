//! Handler for league slash commands.
//!
//! Each command may be installed on its own (`/win 3 A`) or through the
//! umbrella `/league` command (`/league win 3 A`).

use chrono::Utc;
use serde_json::Value;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::helpers::{
    RoomPost, SLACK_ACK_BUDGET_MS, ok_ephemeral, ok_in_channel, ok_in_channel_blocks,
    post_rooms_with_timeout, short_ref,
};
use super::parsing::{
    SlashCommand, parse_name, parse_session_id, parse_slash_command, parse_week, parse_win_args,
    split_command,
};
use super::state::AppState;
use crate::core::league::{AnnounceOutcome, CloseOutcome, FinishOutcome, Member, WinOutcome};
use crate::core::messages;
use crate::errors::LeagueError;
use crate::slack::blocks::build_entry_announcement;

const HELP_TEXT: &str = "*League commands*\n\
    `/register` — join the league\n\
    `/leaderboard [season]` — show standings\n\
    `/win <session> <A|B> [stage]` — record a match result\n\
    *Admin*\n\
    `/create_season <name>` — start a new season\n\
    `/announce <week>` — post the Join/Cancel buttons for a week\n\
    `/close_entries <week>` — close entries and open rooms of 8\n\
    `/finish_session <session>` — finish a session early";

fn slack_ids(members: &[Member]) -> Vec<String> {
    members
        .iter()
        .filter_map(|m| m.slack_user_id.clone())
        .collect()
}

/// Log a failed league operation and build the user-facing reply.
fn failure_reply(command: &str, e: &LeagueError) -> Value {
    match e {
        LeagueError::Conflict(msg) | LeagueError::NotFound(msg) => ok_ephemeral(msg),
        _ => {
            let correlation_id = Uuid::new_v4().to_string();
            error!(
                command,
                correlation_id = %correlation_id,
                "League operation failed: {}", e
            );
            ok_ephemeral(&format!(
                "Something went wrong. Please try again. (ref: {})",
                short_ref(&correlation_id)
            ))
        }
    }
}

// ============================================================================
// Commands
// ============================================================================

async fn register(state: &AppState, cmd: &SlashCommand) -> Value {
    let result = {
        let mut league = state.league.lock().await;
        league.ensure_user(&cmd.user_id, &cmd.user_name, Utc::now())
    };
    match result {
        Ok((_, true)) => ok_ephemeral("Registered! Welcome to the league."),
        Ok((_, false)) => ok_ephemeral("You're already registered."),
        Err(e) => failure_reply("register", &e),
    }
}

async fn create_season(state: &AppState, args: &str) -> Value {
    let Some(name) = parse_name(args) else {
        return ok_ephemeral("Usage: `/create_season <name>`");
    };
    let result = {
        let mut league = state.league.lock().await;
        league.create_season(&name, Utc::now())
    };
    match result {
        Ok(created) => ok_ephemeral(&messages::season_created(&created, state.config.timezone)),
        Err(e) => failure_reply("create_season", &e),
    }
}

async fn announce(state: &AppState, args: &str) -> Value {
    let week = match parse_week(args) {
        Ok(w) => w,
        Err(usage) => return ok_ephemeral(&usage),
    };
    let result = {
        let mut league = state.league.lock().await;
        league.announce(week, Utc::now())
    };
    match result {
        Ok(AnnounceOutcome::Ready { season, week }) => {
            let blocks = build_entry_announcement(week, &season.name);
            ok_in_channel_blocks(&format!("Week {week} entries are open"), &blocks)
        }
        Ok(other) => ok_ephemeral(&messages::announce_refusal(&other).unwrap_or_default()),
        Err(e) => failure_reply("announce", &e),
    }
}

async fn close_entries(state: &AppState, args: &str) -> Value {
    let week = match parse_week(args) {
        Ok(w) => w,
        Err(usage) => return ok_ephemeral(&usage),
    };
    let result = {
        let mut league = state.league.lock().await;
        league.close_entries(week, Utc::now())
    };
    let outcome = match result {
        Ok(o) => o,
        Err(e) => return failure_reply("close_entries", &e),
    };

    let CloseOutcome::Closed { week, rooms, .. } = &outcome else {
        return ok_ephemeral(&messages::close_summary(&outcome));
    };

    let posts = rooms
        .iter()
        .map(|room| RoomPost {
            room_label: room.label.clone(),
            text: messages::room_opening(*week, room),
            members: slack_ids(&room.members),
        })
        .collect();
    post_rooms_with_timeout(&state.messenger, posts, SLACK_ACK_BUDGET_MS).await;

    ok_in_channel(&messages::close_summary(&outcome))
}

async fn record_win(state: &AppState, args: &str) -> Value {
    let win = match parse_win_args(args) {
        Ok(w) => w,
        Err(usage) => return ok_ephemeral(&usage),
    };
    let result = {
        let mut league = state.league.lock().await;
        league.record_win(win.session_id, win.team, &win.stage, Utc::now())
    };
    let outcome = match result {
        Ok(o) => o,
        Err(e) => return failure_reply("win", &e),
    };

    let room = match &outcome {
        WinOutcome::NoPendingMatch { room, .. }
        | WinOutcome::NextMatch { room, .. }
        | WinOutcome::SessionFinished { room, .. } => Some(room.clone()),
        WinOutcome::AlreadyFinished { .. } | WinOutcome::NotFound { .. } => None,
    };
    if let (Some(room_label), Some(text)) = (room, messages::win_room_post(&outcome)) {
        let post = RoomPost {
            room_label,
            text,
            members: Vec::new(),
        };
        post_rooms_with_timeout(&state.messenger, vec![post], SLACK_ACK_BUDGET_MS).await;
    }

    ok_ephemeral(&messages::win_reply(&outcome))
}

async fn finish_session(state: &AppState, args: &str) -> Value {
    let session_id = match parse_session_id(args) {
        Ok(id) => id,
        Err(usage) => return ok_ephemeral(&usage),
    };
    let result = {
        let mut league = state.league.lock().await;
        match league.finish_session(session_id, Utc::now()) {
            Ok(outcome) => league.session_room(session_id).map(|room| (outcome, room)),
            Err(e) => Err(e),
        }
    };
    let (outcome, room) = match result {
        Ok(r) => r,
        Err(e) => return failure_reply("finish_session", &e),
    };

    let text = messages::finish_outcome(&outcome);
    if let (FinishOutcome::Finished { .. }, Some(room_label)) = (&outcome, room) {
        let post = RoomPost {
            room_label,
            text: text.clone(),
            members: Vec::new(),
        };
        post_rooms_with_timeout(&state.messenger, vec![post], SLACK_ACK_BUDGET_MS).await;
    }
    ok_ephemeral(&text)
}

async fn leaderboard(state: &AppState, args: &str) -> Value {
    let season_name = parse_name(args);
    let result = {
        let league = state.league.lock().await;
        league.leaderboard(season_name.as_deref())
    };
    match result {
        Ok(Some(board)) if board.rows.is_empty() => ok_ephemeral(&messages::leaderboard(&board)),
        Ok(Some(board)) => ok_in_channel(&messages::leaderboard(&board)),
        Ok(None) => ok_ephemeral("Season not found."),
        Err(e) => failure_reply("leaderboard", &e),
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

/// Handle a slash command from Slack.
///
/// # Errors
///
/// Returns `ParseError` if the body is not a slash command form.
pub async fn handle_slash_command(state: &AppState, body: &str) -> Result<Value, LeagueError> {
    let cmd = parse_slash_command(body)?;
    let (name, args) = split_command(&cmd.command, &cmd.text);
    info!(command = %name, user = %cmd.user_id, channel = %cmd.channel_id, "Slash command");

    let admin_only = matches!(
        name.as_str(),
        "create_season" | "announce" | "close_entries" | "finish_session"
    );
    if admin_only && !state.is_admin(&cmd.user_id).await {
        warn!(command = %name, user = %cmd.user_id, "Admin command refused");
        return Ok(ok_ephemeral("This command is only available to league admins."));
    }

    let response = match name.as_str() {
        "register" => register(state, &cmd).await,
        "create_season" => create_season(state, args).await,
        "announce" => announce(state, args).await,
        "close_entries" => close_entries(state, args).await,
        "win" => record_win(state, args).await,
        "finish_session" => finish_session(state, args).await,
        "leaderboard" => leaderboard(state, args).await,
        "" | "help" => ok_ephemeral(HELP_TEXT),
        other => ok_ephemeral(&format!("Unknown command `{other}`.\n\n{HELP_TEXT}")),
    };
    Ok(response)
}
