//! Row-level queries. Every function takes a `&Connection`, so callers can pass
//! either the raw connection or an open transaction.

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::core::models::{
    Entry, EntryStatus, GameSession, Match, SeasonScore, Season, SessionSettlement, SessionStat,
    SessionStatus, Team, User, UserId, decode_team, encode_team,
};
use crate::errors::Result;

// ─────────────────────────────────────────────────────────────────────────────
// Column decoding
// ─────────────────────────────────────────────────────────────────────────────

fn conversion_error(idx: usize, msg: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, msg.into())
}

fn ts(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, format!("bad timestamp '{raw}': {e}")))
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        slack_user_id: row.get(1)?,
        display_name: row.get(2)?,
        created_at: ts(row, 3)?,
    })
}

fn season_from_row(row: &Row<'_>) -> rusqlite::Result<Season> {
    Ok(Season {
        id: row.get(0)?,
        name: row.get(1)?,
        start_date: ts(row, 2)?,
        end_date: ts(row, 3)?,
        is_active: row.get(4)?,
    })
}

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<GameSession> {
    let status: String = row.get(5)?;
    Ok(GameSession {
        id: row.get(0)?,
        season_id: row.get(1)?,
        week_number: row.get(2)?,
        room_label: row.get(3)?,
        scheduled_at: ts(row, 4)?,
        status: SessionStatus::parse(&status)
            .ok_or_else(|| conversion_error(5, format!("unknown session status '{status}'")))?,
    })
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<Entry> {
    let status: String = row.get(3)?;
    Ok(Entry {
        id: row.get(0)?,
        session_id: row.get(1)?,
        user_id: row.get(2)?,
        status: EntryStatus::parse(&status)
            .ok_or_else(|| conversion_error(3, format!("unknown entry status '{status}'")))?,
        created_at: ts(row, 4)?,
    })
}

fn match_from_row(row: &Row<'_>) -> rusqlite::Result<Match> {
    let team_a: String = row.get(3)?;
    let team_b: String = row.get(4)?;
    let winner: Option<String> = row.get(6)?;
    Ok(Match {
        id: row.get(0)?,
        session_id: row.get(1)?,
        match_index: row.get(2)?,
        team_a: decode_team(&team_a).map_err(|e| conversion_error(3, e))?,
        team_b: decode_team(&team_b).map_err(|e| conversion_error(4, e))?,
        stage: row.get(5)?,
        winner: winner
            .map(|w| w.parse::<Team>().map_err(|e| conversion_error(6, e)))
            .transpose()?,
    })
}

fn score_from_row(row: &Row<'_>) -> rusqlite::Result<SeasonScore> {
    Ok(SeasonScore {
        season_id: row.get(0)?,
        user_id: row.get(1)?,
        entry_points: row.get(2)?,
        win_points: row.get(3)?,
    })
}

const USER_COLS: &str = "id, slack_user_id, display_name, created_at";
const SEASON_COLS: &str = "id, name, start_date, end_date, is_active";
const SESSION_COLS: &str = "id, season_id, week_number, room_label, scheduled_at, status";
const ENTRY_COLS: &str = "id, session_id, user_id, status, created_at";
const MATCH_COLS: &str = "id, session_id, match_index, team_a_ids, team_b_ids, stage, winner";

// ─────────────────────────────────────────────────────────────────────────────
// users
// ─────────────────────────────────────────────────────────────────────────────

pub fn get_user(conn: &Connection, id: UserId) -> Result<Option<User>> {
    let sql = format!("SELECT {USER_COLS} FROM users WHERE id = ?1");
    Ok(conn.query_row(&sql, params![id], user_from_row).optional()?)
}

pub fn find_user_by_slack_id(conn: &Connection, slack_user_id: &str) -> Result<Option<User>> {
    let sql = format!("SELECT {USER_COLS} FROM users WHERE slack_user_id = ?1");
    Ok(conn
        .query_row(&sql, params![slack_user_id], user_from_row)
        .optional()?)
}

pub fn insert_user(
    conn: &Connection,
    slack_user_id: &str,
    display_name: &str,
    now: DateTime<Utc>,
) -> Result<User> {
    conn.execute(
        "INSERT INTO users (slack_user_id, display_name, created_at) VALUES (?1, ?2, ?3)",
        params![slack_user_id, display_name, now.to_rfc3339()],
    )?;
    Ok(User {
        id: conn.last_insert_rowid(),
        slack_user_id: slack_user_id.to_string(),
        display_name: display_name.to_string(),
        created_at: now,
    })
}

pub fn update_display_name(conn: &Connection, id: UserId, display_name: &str) -> Result<()> {
    conn.execute(
        "UPDATE users SET display_name = ?2 WHERE id = ?1",
        params![id, display_name],
    )?;
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// seasons
// ─────────────────────────────────────────────────────────────────────────────

pub fn active_season(conn: &Connection) -> Result<Option<Season>> {
    let sql =
        format!("SELECT {SEASON_COLS} FROM seasons WHERE is_active = 1 ORDER BY id DESC LIMIT 1");
    Ok(conn.query_row(&sql, [], season_from_row).optional()?)
}

pub fn get_season(conn: &Connection, id: i64) -> Result<Option<Season>> {
    let sql = format!("SELECT {SEASON_COLS} FROM seasons WHERE id = ?1");
    Ok(conn.query_row(&sql, params![id], season_from_row).optional()?)
}

pub fn season_by_name(conn: &Connection, name: &str) -> Result<Option<Season>> {
    let sql = format!("SELECT {SEASON_COLS} FROM seasons WHERE name = ?1");
    Ok(conn.query_row(&sql, params![name], season_from_row).optional()?)
}

pub fn deactivate_seasons(conn: &Connection) -> Result<usize> {
    Ok(conn.execute("UPDATE seasons SET is_active = 0 WHERE is_active = 1", [])?)
}

pub fn insert_season(
    conn: &Connection,
    name: &str,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
) -> Result<Season> {
    conn.execute(
        "INSERT INTO seasons (name, start_date, end_date, is_active) VALUES (?1, ?2, ?3, 1)",
        params![name, start_date.to_rfc3339(), end_date.to_rfc3339()],
    )?;
    Ok(Season {
        id: conn.last_insert_rowid(),
        name: name.to_string(),
        start_date,
        end_date,
        is_active: true,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// sessions
// ─────────────────────────────────────────────────────────────────────────────

pub fn get_session(conn: &Connection, id: i64) -> Result<Option<GameSession>> {
    let sql = format!("SELECT {SESSION_COLS} FROM sessions WHERE id = ?1");
    Ok(conn.query_row(&sql, params![id], session_from_row).optional()?)
}

pub fn find_session(
    conn: &Connection,
    season_id: i64,
    week_number: i64,
    room_label: &str,
) -> Result<Option<GameSession>> {
    let sql = format!(
        "SELECT {SESSION_COLS} FROM sessions
         WHERE season_id = ?1 AND week_number = ?2 AND room_label = ?3
         ORDER BY id ASC LIMIT 1"
    );
    Ok(conn
        .query_row(&sql, params![season_id, week_number, room_label], session_from_row)
        .optional()?)
}

pub fn insert_session(
    conn: &Connection,
    season_id: i64,
    week_number: i64,
    room_label: &str,
    scheduled_at: DateTime<Utc>,
    status: SessionStatus,
) -> Result<GameSession> {
    conn.execute(
        "INSERT INTO sessions (season_id, week_number, room_label, scheduled_at, status)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            season_id,
            week_number,
            room_label,
            scheduled_at.to_rfc3339(),
            status.as_str()
        ],
    )?;
    Ok(GameSession {
        id: conn.last_insert_rowid(),
        season_id,
        week_number,
        room_label: room_label.to_string(),
        scheduled_at,
        status,
    })
}

pub fn set_session_status(conn: &Connection, id: i64, status: SessionStatus) -> Result<()> {
    conn.execute(
        "UPDATE sessions SET status = ?2 WHERE id = ?1",
        params![id, status.as_str()],
    )?;
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// entries
// ─────────────────────────────────────────────────────────────────────────────

pub fn find_entry(conn: &Connection, session_id: i64, user_id: UserId) -> Result<Option<Entry>> {
    let sql = format!(
        "SELECT {ENTRY_COLS} FROM entries WHERE session_id = ?1 AND user_id = ?2
         ORDER BY id ASC LIMIT 1"
    );
    Ok(conn
        .query_row(&sql, params![session_id, user_id], entry_from_row)
        .optional()?)
}

pub fn insert_entry(
    conn: &Connection,
    session_id: i64,
    user_id: UserId,
    status: EntryStatus,
    now: DateTime<Utc>,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO entries (session_id, user_id, status, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![session_id, user_id, status.as_str(), now.to_rfc3339()],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn set_entry_status(conn: &Connection, id: i64, status: EntryStatus) -> Result<()> {
    conn.execute(
        "UPDATE entries SET status = ?2 WHERE id = ?1",
        params![id, status.as_str()],
    )?;
    Ok(())
}

/// Confirmed entries of a session in join order.
pub fn confirmed_entries(conn: &Connection, session_id: i64) -> Result<Vec<Entry>> {
    let sql = format!(
        "SELECT {ENTRY_COLS} FROM entries WHERE session_id = ?1 AND status = 'confirmed'
         ORDER BY id ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![session_id], entry_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

// ─────────────────────────────────────────────────────────────────────────────
// session_stats / settlements
// ─────────────────────────────────────────────────────────────────────────────

pub fn ensure_stat(conn: &Connection, session_id: i64, user_id: UserId) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO session_stats (session_id, user_id, wins) VALUES (?1, ?2, 0)",
        params![session_id, user_id],
    )?;
    Ok(())
}

pub fn session_stats(conn: &Connection, session_id: i64) -> Result<Vec<SessionStat>> {
    let mut stmt = conn.prepare(
        "SELECT session_id, user_id, wins FROM session_stats WHERE session_id = ?1
         ORDER BY user_id ASC",
    )?;
    let rows = stmt
        .query_map(params![session_id], |row| {
            Ok(SessionStat {
                session_id: row.get(0)?,
                user_id: row.get(1)?,
                wins: row.get(2)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

pub fn increment_wins(conn: &Connection, session_id: i64, user_id: UserId) -> Result<()> {
    conn.execute(
        "UPDATE session_stats SET wins = wins + 1 WHERE session_id = ?1 AND user_id = ?2",
        params![session_id, user_id],
    )?;
    Ok(())
}

pub fn max_session_wins(conn: &Connection, session_id: i64) -> Result<i64> {
    Ok(conn.query_row(
        "SELECT COALESCE(MAX(wins), 0) FROM session_stats WHERE session_id = ?1",
        params![session_id],
        |row| row.get(0),
    )?)
}

pub fn insert_settlement(
    conn: &Connection,
    season_id: i64,
    session_id: i64,
    user_id: UserId,
    win_delta: i64,
    now: DateTime<Utc>,
) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO session_settlements
            (season_id, session_id, user_id, win_delta, calculated_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![season_id, session_id, user_id, win_delta, now.to_rfc3339()],
    )?;
    Ok(())
}

pub fn session_settlements(conn: &Connection, session_id: i64) -> Result<Vec<SessionSettlement>> {
    let mut stmt = conn.prepare(
        "SELECT season_id, session_id, user_id, win_delta, calculated_at
         FROM session_settlements WHERE session_id = ?1 ORDER BY user_id ASC",
    )?;
    let rows = stmt
        .query_map(params![session_id], |row| {
            Ok(SessionSettlement {
                season_id: row.get(0)?,
                session_id: row.get(1)?,
                user_id: row.get(2)?,
                win_delta: row.get(3)?,
                calculated_at: ts(row, 4)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

// ─────────────────────────────────────────────────────────────────────────────
// season_scores
// ─────────────────────────────────────────────────────────────────────────────

pub fn ensure_score(conn: &Connection, season_id: i64, user_id: UserId) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO season_scores (season_id, user_id, entry_points, win_points)
         VALUES (?1, ?2, 0.0, 0)",
        params![season_id, user_id],
    )?;
    Ok(())
}

pub fn get_score(
    conn: &Connection,
    season_id: i64,
    user_id: UserId,
) -> Result<Option<SeasonScore>> {
    Ok(conn
        .query_row(
            "SELECT season_id, user_id, entry_points, win_points FROM season_scores
             WHERE season_id = ?1 AND user_id = ?2",
            params![season_id, user_id],
            score_from_row,
        )
        .optional()?)
}

pub fn add_entry_points(
    conn: &Connection,
    season_id: i64,
    user_id: UserId,
    delta: f64,
) -> Result<()> {
    conn.execute(
        "UPDATE season_scores SET entry_points = entry_points + ?3
         WHERE season_id = ?1 AND user_id = ?2",
        params![season_id, user_id, delta],
    )?;
    Ok(())
}

pub fn add_win_points(
    conn: &Connection,
    season_id: i64,
    user_id: UserId,
    delta: i64,
) -> Result<()> {
    conn.execute(
        "UPDATE season_scores SET win_points = win_points + ?3
         WHERE season_id = ?1 AND user_id = ?2",
        params![season_id, user_id, delta],
    )?;
    Ok(())
}

/// Scores of a season joined with their users, best total first.
pub fn leaderboard_rows(conn: &Connection, season_id: i64) -> Result<Vec<(SeasonScore, User)>> {
    let mut stmt = conn.prepare(
        "SELECT s.season_id, s.user_id, s.entry_points, s.win_points,
                u.id, u.slack_user_id, u.display_name, u.created_at
         FROM season_scores s
         JOIN users u ON u.id = s.user_id
         WHERE s.season_id = ?1
         ORDER BY (s.entry_points + s.win_points) DESC, u.id ASC",
    )?;
    let rows = stmt
        .query_map(params![season_id], |row| {
            let score = score_from_row(row)?;
            let user = User {
                id: row.get(4)?,
                slack_user_id: row.get(5)?,
                display_name: row.get(6)?,
                created_at: ts(row, 7)?,
            };
            Ok((score, user))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

// ─────────────────────────────────────────────────────────────────────────────
// matches
// ─────────────────────────────────────────────────────────────────────────────

pub fn last_match_index(conn: &Connection, session_id: i64) -> Result<Option<i64>> {
    Ok(conn.query_row(
        "SELECT MAX(match_index) FROM matches WHERE session_id = ?1",
        params![session_id],
        |row| row.get(0),
    )?)
}

pub fn insert_match(
    conn: &Connection,
    session_id: i64,
    match_index: i64,
    team_a: &[UserId],
    team_b: &[UserId],
) -> Result<Match> {
    conn.execute(
        "INSERT INTO matches (session_id, match_index, team_a_ids, team_b_ids, stage)
         VALUES (?1, ?2, ?3, ?4, '')",
        params![session_id, match_index, encode_team(team_a), encode_team(team_b)],
    )?;
    Ok(Match {
        id: conn.last_insert_rowid(),
        session_id,
        match_index,
        team_a: team_a.to_vec(),
        team_b: team_b.to_vec(),
        stage: String::new(),
        winner: None,
    })
}

/// The earliest match of a session that has no recorded winner.
pub fn first_undecided_match(conn: &Connection, session_id: i64) -> Result<Option<Match>> {
    let sql = format!(
        "SELECT {MATCH_COLS} FROM matches WHERE session_id = ?1 AND winner IS NULL
         ORDER BY match_index ASC LIMIT 1"
    );
    Ok(conn
        .query_row(&sql, params![session_id], match_from_row)
        .optional()?)
}

pub fn set_match_result(conn: &Connection, id: i64, winner: Team, stage: &str) -> Result<()> {
    conn.execute(
        "UPDATE matches SET winner = ?2, stage = ?3 WHERE id = ?1",
        params![id, winner.as_str(), stage],
    )?;
    Ok(())
}

pub fn session_matches(conn: &Connection, session_id: i64) -> Result<Vec<Match>> {
    let sql =
        format!("SELECT {MATCH_COLS} FROM matches WHERE session_id = ?1 ORDER BY match_index ASC");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![session_id], match_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}
