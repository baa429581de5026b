//! Chat text for league outcomes (Slack mrkdwn).

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use super::league::{
    AnnounceOutcome, CancelOutcome, CloseOutcome, FinishOutcome, JoinOutcome, Leaderboard,
    MatchAnnouncement, MatchOutcome, Member, Room, SeasonCreated, StartOutcome, WinOutcome,
};

#[must_use]
pub fn mention(member: &Member) -> String {
    match &member.slack_user_id {
        Some(id) => format!("<@{id}>"),
        None => format!("(uid:{})", member.user_id),
    }
}

#[must_use]
pub fn mentions(members: &[Member]) -> String {
    members.iter().map(mention).collect::<Vec<_>>().join(" ")
}

#[must_use]
pub fn format_date(ts: DateTime<Utc>, tz: Tz) -> String {
    ts.with_timezone(&tz).format("%Y-%m-%d").to_string()
}

#[must_use]
pub fn match_announcement(m: &MatchAnnouncement) -> String {
    format!(
        "*Session {} — Match #{}*\nTeam A: {}\nTeam B: {}",
        m.session_id,
        m.match_index,
        mentions(&m.team_a),
        mentions(&m.team_b)
    )
}

#[must_use]
pub fn match_outcome(outcome: &MatchOutcome) -> String {
    match outcome {
        MatchOutcome::Created(m) => match_announcement(m),
        MatchOutcome::NotFound { .. } => "Session not found.".to_string(),
        MatchOutcome::AlreadyFinished { session_id } => {
            format!("Session {session_id} has already finished.")
        }
        MatchOutcome::NotEnoughPlayers { have, .. } => {
            format!("Not enough players to build a match ({have} present).")
        }
    }
}

#[must_use]
pub fn start_outcome(outcome: &StartOutcome) -> String {
    match outcome {
        StartOutcome::Started { session_id } => format!("Session {session_id} started."),
        StartOutcome::AlreadyLive { session_id } => {
            format!("Session {session_id} is already live.")
        }
        StartOutcome::AlreadyFinished { session_id } => {
            format!("Session {session_id} has finished and cannot be started.")
        }
        StartOutcome::NotFound { .. } => "Session not found.".to_string(),
    }
}

#[must_use]
pub fn finish_outcome(outcome: &FinishOutcome) -> String {
    match outcome {
        FinishOutcome::Finished {
            session_id,
            season_name,
            ..
        } => format!(
            "Session {session_id} finished. Today's wins were added to season {season_name}."
        ),
        FinishOutcome::AlreadyFinished { session_id } => {
            format!("Session {session_id} has already finished.")
        }
        FinishOutcome::NotFound { .. } => "Session not found.".to_string(),
    }
}

#[must_use]
pub fn season_created(created: &SeasonCreated, tz: Tz) -> String {
    format!(
        "Season {} started (until {}).",
        created.season.name,
        format_date(created.season.end_date, tz)
    )
}

#[must_use]
pub fn announce_refusal(outcome: &AnnounceOutcome) -> Option<String> {
    match outcome {
        AnnounceOutcome::Ready { .. } => None,
        AnnounceOutcome::AlreadyClosed { week } => {
            Some(format!("Entries for week {week} are already closed."))
        }
        AnnounceOutcome::NoActiveSeason => {
            Some("No active season. Create one with /create_season first.".to_string())
        }
    }
}

#[must_use]
pub fn join_outcome(outcome: &JoinOutcome) -> String {
    match outcome {
        JoinOutcome::Joined { week, points } => {
            format!("You're in for week {week} (+{points:.1}pt).")
        }
        JoinOutcome::Rejoined { week, points } => {
            format!("Welcome back, you're in for week {week} again (+{points:.1}pt).")
        }
        JoinOutcome::AlreadyJoined { week } => format!("You have already joined week {week}."),
        JoinOutcome::EntriesClosed { week } => format!("Entries for week {week} are closed."),
        JoinOutcome::NoActiveSeason => "There is no active season.".to_string(),
    }
}

#[must_use]
pub fn cancel_outcome(outcome: &CancelOutcome) -> String {
    match outcome {
        CancelOutcome::Canceled { week, points } => {
            format!("Your entry for week {week} was canceled (-{points:.1}pt).")
        }
        CancelOutcome::AlreadyCanceled { week } => {
            format!("Your entry for week {week} is already canceled.")
        }
        CancelOutcome::NotFound { week } => format!("No entry found for week {week}."),
        CancelOutcome::EntriesClosed { week } => format!("Entries for week {week} are closed."),
        CancelOutcome::NoActiveSeason => "There is no active season.".to_string(),
    }
}

/// Message posted into a room channel when the room opens.
#[must_use]
pub fn room_opening(week: i64, room: &Room) -> String {
    format!(
        "*Week {week} Room {} — Session {}*\n{}\n\nPlayers: {}\n\n{}",
        room.label,
        room.session_id,
        start_outcome(&room.start),
        mentions(&room.members),
        match_outcome(&room.first_match)
    )
}

/// Summary returned to the admin who closed entries.
#[must_use]
pub fn close_summary(outcome: &CloseOutcome) -> String {
    match outcome {
        CloseOutcome::Closed {
            week,
            rooms,
            waitlisted,
        } => {
            let mut out = format!("*Week {week}: entries closed*");
            for room in rooms {
                let _ = write!(
                    out,
                    "\nRoom {} (session {}) started and teams were announced.",
                    room.label, room.session_id
                );
            }
            if !waitlisted.is_empty() {
                let _ = write!(out, "\nWaitlist: {}", mentions(waitlisted));
            }
            out
        }
        CloseOutcome::NotEnoughPlayers {
            confirmed, needed, ..
        } => format!(
            "Only {confirmed} confirmed player(s); at least {needed} are needed to open a room."
        ),
        CloseOutcome::AlreadyClosed { week } => {
            format!("Entries for week {week} are already closed.")
        }
        CloseOutcome::NoActiveSeason => "There is no active season.".to_string(),
    }
}

/// Room channel post after `/win`.
#[must_use]
pub fn win_room_post(outcome: &WinOutcome) -> Option<String> {
    match outcome {
        WinOutcome::NoPendingMatch { next, .. } => Some(match_outcome(next)),
        WinOutcome::NextMatch {
            match_index,
            team,
            next,
            ..
        } => Some(format!(
            "*Recorded*: Match #{match_index} → Team {team} wins\n\n{}",
            match_outcome(next)
        )),
        WinOutcome::SessionFinished {
            match_index,
            team,
            finish,
            ..
        } => Some(format!(
            "*Recorded*: Match #{match_index} → Team {team} wins\nSomeone reached the win target!\n{}",
            finish_outcome(finish)
        )),
        WinOutcome::AlreadyFinished { .. } | WinOutcome::NotFound { .. } => None,
    }
}

/// Ephemeral reply to the reporter of `/win`.
#[must_use]
pub fn win_reply(outcome: &WinOutcome) -> String {
    match outcome {
        WinOutcome::NoPendingMatch { .. } => {
            "Posted the next match to the room channel.".to_string()
        }
        WinOutcome::NextMatch { .. } => {
            "Posted the result and the next match to the room channel.".to_string()
        }
        WinOutcome::SessionFinished { .. } => {
            "Posted the result to the room channel and finished the session.".to_string()
        }
        WinOutcome::AlreadyFinished { session_id } => {
            format!("Session {session_id} has already finished.")
        }
        WinOutcome::NotFound { .. } => "Session not found.".to_string(),
    }
}

#[must_use]
pub fn leaderboard(board: &Leaderboard) -> String {
    if board.rows.is_empty() {
        return format!("No scores yet for season {}.", board.season_name);
    }
    let mut out = format!("*{} Leaderboard*", board.season_name);
    for row in &board.rows {
        let _ = write!(
            out,
            "\n{}. {} — {:.1}pt (entry {:.1} + wins {})",
            row.rank, row.display_name, row.total, row.entry_points, row.win_points
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::league::LeaderboardRow;
    use pretty_assertions::assert_eq;

    fn m(id: i64, slack: Option<&str>) -> Member {
        Member {
            user_id: id,
            slack_user_id: slack.map(str::to_string),
        }
    }

    #[test]
    fn mention_falls_back_to_row_id() {
        assert_eq!(mention(&m(3, Some("U3"))), "<@U3>");
        assert_eq!(mention(&m(4, None)), "(uid:4)");
    }

    #[test]
    fn match_announcement_lists_both_teams() {
        let text = match_announcement(&MatchAnnouncement {
            session_id: 7,
            match_index: 2,
            team_a: vec![m(1, Some("U1")), m(2, Some("U2"))],
            team_b: vec![m(3, Some("U3")), m(4, None)],
        });
        assert_eq!(
            text,
            "*Session 7 — Match #2*\nTeam A: <@U1> <@U2>\nTeam B: <@U3> (uid:4)"
        );
    }

    #[test]
    fn leaderboard_formats_points() {
        let text = leaderboard(&Leaderboard {
            season_name: "S1".into(),
            rows: vec![LeaderboardRow {
                rank: 1,
                display_name: "alice".into(),
                slack_user_id: "U1".into(),
                entry_points: 1.5,
                win_points: 12,
                total: 13.5,
            }],
        });
        assert_eq!(
            text,
            "*S1 Leaderboard*\n1. alice — 13.5pt (entry 1.5 + wins 12)"
        );
    }

    #[test]
    fn empty_leaderboard_says_so() {
        let text = leaderboard(&Leaderboard {
            season_name: "S1".into(),
            rows: vec![],
        });
        assert_eq!(text, "No scores yet for season S1.");
    }

    #[test]
    fn dates_use_league_timezone() {
        let ts = DateTime::parse_from_rfc3339("2025-01-01T20:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(format_date(ts, chrono_tz::UTC), "2025-01-01");
        assert_eq!(format_date(ts, chrono_tz::Asia::Tokyo), "2025-01-02");
    }

    #[test]
    fn win_post_is_skipped_for_unknown_sessions() {
        assert_eq!(win_room_post(&WinOutcome::NotFound { session_id: 1 }), None);
        assert_eq!(win_reply(&WinOutcome::NotFound { session_id: 1 }), "Session not found.");
    }
}
