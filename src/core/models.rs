use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

/// Database row id of a league user.
pub type UserId = i64;

/// Label of the weekly entry box session that collects Join/Cancel presses.
pub const PENDING_ROOM: &str = "PENDING";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub slack_user_id: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Season {
    pub id: i64,
    pub name: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Scheduled,
    Live,
    Finished,
}

impl SessionStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Live => "live",
            Self::Finished => "finished",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "scheduled" => Some(Self::Scheduled),
            "live" => Some(Self::Live),
            "finished" => Some(Self::Finished),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSession {
    pub id: i64,
    pub season_id: i64,
    pub week_number: i64,
    pub room_label: String,
    pub scheduled_at: DateTime<Utc>,
    pub status: SessionStatus,
}

impl GameSession {
    #[must_use]
    pub fn is_pending_box(&self) -> bool {
        self.room_label == PENDING_ROOM
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    Confirmed,
    Canceled,
    Waitlist,
}

impl EntryStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::Canceled => "canceled",
            Self::Waitlist => "waitlist",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "confirmed" => Some(Self::Confirmed),
            "canceled" => Some(Self::Canceled),
            "waitlist" => Some(Self::Waitlist),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub id: i64,
    pub session_id: i64,
    pub user_id: UserId,
    pub status: EntryStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStat {
    pub session_id: i64,
    pub user_id: UserId,
    pub wins: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettlement {
    pub season_id: i64,
    pub session_id: i64,
    pub user_id: UserId,
    pub win_delta: i64,
    pub calculated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeasonScore {
    pub season_id: i64,
    pub user_id: UserId,
    pub entry_points: f64,
    pub win_points: i64,
}

impl SeasonScore {
    #[must_use]
    pub fn total(&self) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let wins = self.win_points as f64;
        self.entry_points + wins
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Team {
    A,
    B,
}

impl Team {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Team {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(Self::A),
            "B" => Ok(Self::B),
            other => Err(format!("team must be A or B, got '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub id: i64,
    pub session_id: i64,
    pub match_index: i64,
    pub team_a: Vec<UserId>,
    pub team_b: Vec<UserId>,
    pub stage: String,
    pub winner: Option<Team>,
}

impl Match {
    #[must_use]
    pub fn team(&self, team: Team) -> &[UserId] {
        match team {
            Team::A => &self.team_a,
            Team::B => &self.team_b,
        }
    }
}

/// Input to team balancing: a room member and their wins in the session so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Player {
    pub user_id: UserId,
    pub wins: i64,
}

/// Encode a team as the comma separated id list stored in the `matches` table.
#[must_use]
pub fn encode_team(ids: &[UserId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Decode a stored team column. Empty segments are skipped.
///
/// # Errors
///
/// Returns the offending segment if it is not an integer.
pub fn decode_team(raw: &str) -> Result<Vec<UserId>, String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<UserId>().map_err(|e| format!("bad team id '{s}': {e}")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn team_parses_case_insensitively() {
        assert_eq!("a".parse::<Team>(), Ok(Team::A));
        assert_eq!(" B ".parse::<Team>(), Ok(Team::B));
        assert!("C".parse::<Team>().is_err());
    }

    #[test]
    fn team_columns_use_csv() {
        assert_eq!(encode_team(&[1, 3, 5, 8]), "1,3,5,8");
        assert_eq!(decode_team("1,3,5,8"), Ok(vec![1, 3, 5, 8]));
        assert_eq!(decode_team(""), Ok(vec![]));
        assert!(decode_team("1,x").is_err());
    }

    #[test]
    fn status_strings_match_storage_values() {
        for s in [SessionStatus::Scheduled, SessionStatus::Live, SessionStatus::Finished] {
            assert_eq!(SessionStatus::parse(s.as_str()), Some(s));
        }
        for s in [EntryStatus::Confirmed, EntryStatus::Canceled, EntryStatus::Waitlist] {
            assert_eq!(EntryStatus::parse(s.as_str()), Some(s));
        }
        assert_eq!(SessionStatus::parse("open"), None);
    }
}
