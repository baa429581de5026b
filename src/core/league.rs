//! League service: seasons, weekly entry boxes, rooms, matches and scores.
//!
//! Every public operation runs in a single SQLite transaction and returns a
//! typed outcome. Turning outcomes into chat text is the job of
//! [`crate::core::messages`].

use std::collections::HashMap;

use chrono::{DateTime, TimeDelta, Utc};
use rusqlite::Connection;
use tracing::{debug, info};

use super::config::LeagueRules;
use super::models::{
    EntryStatus, GameSession, PENDING_ROOM, Player, Season, SessionStatus, Team, User, UserId,
};
use super::team_balance::split_min_diff;
use crate::errors::{LeagueError, Result};
use crate::storage::{LeagueDb, queries};

/// A player as shown in chat: the row id plus the Slack id used for mentions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub user_id: UserId,
    pub slack_user_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchAnnouncement {
    pub session_id: i64,
    pub match_index: i64,
    pub team_a: Vec<Member>,
    pub team_b: Vec<Member>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    Created(MatchAnnouncement),
    NotFound { session_id: i64 },
    AlreadyFinished { session_id: i64 },
    NotEnoughPlayers { session_id: i64, have: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started { session_id: i64 },
    AlreadyLive { session_id: i64 },
    AlreadyFinished { session_id: i64 },
    NotFound { session_id: i64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishOutcome {
    Finished {
        session_id: i64,
        season_name: String,
        credited: usize,
    },
    AlreadyFinished { session_id: i64 },
    NotFound { session_id: i64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WinOutcome {
    /// Nothing was waiting for a result; a new match was generated instead.
    NoPendingMatch { room: String, next: MatchOutcome },
    NextMatch {
        room: String,
        match_index: i64,
        team: Team,
        next: MatchOutcome,
    },
    SessionFinished {
        room: String,
        match_index: i64,
        team: Team,
        finish: FinishOutcome,
    },
    AlreadyFinished { session_id: i64 },
    NotFound { session_id: i64 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum JoinOutcome {
    Joined { week: i64, points: f64 },
    Rejoined { week: i64, points: f64 },
    AlreadyJoined { week: i64 },
    EntriesClosed { week: i64 },
    NoActiveSeason,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CancelOutcome {
    Canceled { week: i64, points: f64 },
    AlreadyCanceled { week: i64 },
    NotFound { week: i64 },
    EntriesClosed { week: i64 },
    NoActiveSeason,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnounceOutcome {
    Ready { season: Season, week: i64 },
    AlreadyClosed { week: i64 },
    NoActiveSeason,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    pub label: String,
    pub session_id: i64,
    pub members: Vec<Member>,
    pub start: StartOutcome,
    pub first_match: MatchOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseOutcome {
    Closed {
        week: i64,
        rooms: Vec<Room>,
        waitlisted: Vec<Member>,
    },
    NotEnoughPlayers { week: i64, confirmed: usize, needed: usize },
    AlreadyClosed { week: i64 },
    NoActiveSeason,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardRow {
    pub rank: usize,
    pub display_name: String,
    pub slack_user_id: String,
    pub entry_points: f64,
    pub win_points: i64,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Leaderboard {
    pub season_name: String,
    pub rows: Vec<LeaderboardRow>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeasonCreated {
    pub season: Season,
    pub deactivated: usize,
}

pub struct League {
    db: LeagueDb,
    rules: LeagueRules,
}

impl League {
    #[must_use]
    pub fn new(db: LeagueDb, rules: LeagueRules) -> Self {
        Self { db, rules }
    }

    #[must_use]
    pub fn db(&self) -> &LeagueDb {
        &self.db
    }

    /// Run `op` inside a transaction, committing only when it succeeds.
    fn in_tx<T>(
        &mut self,
        op: impl FnOnce(&Connection, &LeagueRules) -> Result<T>,
    ) -> Result<T> {
        let rules = self.rules.clone();
        let tx = self.db.transaction()?;
        let out = op(&*tx, &rules)?;
        tx.commit()?;
        Ok(out)
    }

    /// Get or create the league user for a Slack account.
    ///
    /// Returns the user and whether it was created by this call.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on database failure.
    pub fn ensure_user(
        &mut self,
        slack_user_id: &str,
        display_name: &str,
        now: DateTime<Utc>,
    ) -> Result<(User, bool)> {
        self.in_tx(|conn, _| ensure_user_in(conn, slack_user_id, display_name, now))
    }

    /// # Errors
    ///
    /// Returns `StorageError` on database failure.
    pub fn active_season(&self) -> Result<Option<Season>> {
        queries::active_season(self.db.conn())
    }

    /// Start a new active season, deactivating any other active one.
    ///
    /// # Errors
    ///
    /// Returns `Conflict` if a season with this name already exists.
    pub fn create_season(&mut self, name: &str, now: DateTime<Utc>) -> Result<SeasonCreated> {
        self.in_tx(|conn, rules| {
            if queries::season_by_name(conn, name)?.is_some() {
                return Err(LeagueError::Conflict(format!("season '{name}' already exists")));
            }
            let deactivated = queries::deactivate_seasons(conn)?;
            let end = TimeDelta::try_days(rules.season_days)
                .and_then(|length| now.checked_add_signed(length))
                .ok_or_else(|| {
                    LeagueError::ConfigError(format!(
                        "season length of {} days is out of range",
                        rules.season_days
                    ))
                })?;
            let season = queries::insert_season(conn, name, now, end)?;
            info!(season = %season.name, deactivated, "Season created");
            Ok(SeasonCreated { season, deactivated })
        })
    }

    /// Get the week's entry box session, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on database failure.
    pub fn ensure_pending_session(
        &mut self,
        season_id: i64,
        week: i64,
        now: DateTime<Utc>,
    ) -> Result<GameSession> {
        self.in_tx(|conn, _| ensure_pending_in(conn, season_id, week, now))
    }

    /// Prepare the entry box for a week announcement.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on database failure.
    pub fn announce(&mut self, week: i64, now: DateTime<Utc>) -> Result<AnnounceOutcome> {
        self.in_tx(|conn, _| {
            let Some(season) = queries::active_season(conn)? else {
                return Ok(AnnounceOutcome::NoActiveSeason);
            };
            let pending = ensure_pending_in(conn, season.id, week, now)?;
            if pending.status == SessionStatus::Finished {
                return Ok(AnnounceOutcome::AlreadyClosed { week });
            }
            Ok(AnnounceOutcome::Ready { season, week })
        })
    }

    /// Register a Join press for `week`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on database failure.
    pub fn join(
        &mut self,
        slack_user_id: &str,
        display_name: &str,
        week: i64,
        now: DateTime<Utc>,
    ) -> Result<JoinOutcome> {
        self.in_tx(|conn, rules| {
            let (user, _) = ensure_user_in(conn, slack_user_id, display_name, now)?;
            let Some(season) = queries::active_season(conn)? else {
                return Ok(JoinOutcome::NoActiveSeason);
            };
            let pending = ensure_pending_in(conn, season.id, week, now)?;
            if pending.status == SessionStatus::Finished {
                return Ok(JoinOutcome::EntriesClosed { week });
            }

            let outcome = match queries::find_entry(conn, pending.id, user.id)? {
                None => {
                    queries::insert_entry(conn, pending.id, user.id, EntryStatus::Confirmed, now)?;
                    JoinOutcome::Joined { week, points: rules.entry_points }
                }
                Some(entry) if entry.status == EntryStatus::Canceled => {
                    queries::set_entry_status(conn, entry.id, EntryStatus::Confirmed)?;
                    JoinOutcome::Rejoined { week, points: rules.entry_points }
                }
                Some(_) => return Ok(JoinOutcome::AlreadyJoined { week }),
            };

            queries::ensure_score(conn, season.id, user.id)?;
            queries::add_entry_points(conn, season.id, user.id, rules.entry_points)?;
            debug!(user = %slack_user_id, week, "Entry confirmed");
            Ok(outcome)
        })
    }

    /// Register a Cancel press for `week`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on database failure.
    pub fn cancel(
        &mut self,
        slack_user_id: &str,
        display_name: &str,
        week: i64,
        now: DateTime<Utc>,
    ) -> Result<CancelOutcome> {
        self.in_tx(|conn, rules| {
            let (user, _) = ensure_user_in(conn, slack_user_id, display_name, now)?;
            let Some(season) = queries::active_season(conn)? else {
                return Ok(CancelOutcome::NoActiveSeason);
            };
            let pending = ensure_pending_in(conn, season.id, week, now)?;
            if pending.status == SessionStatus::Finished {
                return Ok(CancelOutcome::EntriesClosed { week });
            }

            let Some(entry) = queries::find_entry(conn, pending.id, user.id)? else {
                return Ok(CancelOutcome::NotFound { week });
            };
            if entry.status != EntryStatus::Confirmed {
                return Ok(CancelOutcome::AlreadyCanceled { week });
            }

            queries::set_entry_status(conn, entry.id, EntryStatus::Canceled)?;
            if queries::get_score(conn, season.id, user.id)?.is_some() {
                queries::add_entry_points(conn, season.id, user.id, -rules.entry_points)?;
            }
            debug!(user = %slack_user_id, week, "Entry canceled");
            Ok(CancelOutcome::Canceled { week, points: rules.entry_points })
        })
    }

    /// Close the week's entry box and open one room per full group of entrants.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on database failure.
    pub fn close_entries(&mut self, week: i64, now: DateTime<Utc>) -> Result<CloseOutcome> {
        self.in_tx(|conn, rules| {
            let Some(season) = queries::active_season(conn)? else {
                return Ok(CloseOutcome::NoActiveSeason);
            };
            let pending = ensure_pending_in(conn, season.id, week, now)?;
            if pending.status == SessionStatus::Finished {
                return Ok(CloseOutcome::AlreadyClosed { week });
            }

            let entries = queries::confirmed_entries(conn, pending.id)?;
            if entries.len() < rules.room_size {
                return Ok(CloseOutcome::NotEnoughPlayers {
                    week,
                    confirmed: entries.len(),
                    needed: rules.room_size,
                });
            }

            let mut rooms = Vec::new();
            let mut placed = 0;
            for (chunk, label) in entries.chunks(rules.room_size).zip(&rules.room_labels) {
                if chunk.len() < rules.room_size {
                    break;
                }
                let user_ids: Vec<UserId> = chunk.iter().map(|e| e.user_id).collect();
                rooms.push(open_room(conn, rules, season.id, week, label, &user_ids, now)?);
                placed += chunk.len();
            }

            let mut waitlisted = Vec::new();
            for entry in &entries[placed..] {
                queries::set_entry_status(conn, entry.id, EntryStatus::Waitlist)?;
                waitlisted.push(member(conn, entry.user_id)?);
            }

            queries::set_session_status(conn, pending.id, SessionStatus::Finished)?;
            info!(
                week,
                rooms = rooms.len(),
                waitlisted = waitlisted.len(),
                "Entries closed"
            );
            Ok(CloseOutcome::Closed { week, rooms, waitlisted })
        })
    }

    /// # Errors
    ///
    /// Returns `StorageError` on database failure.
    pub fn start_session(&mut self, session_id: i64) -> Result<StartOutcome> {
        self.in_tx(|conn, _| start_session_in(conn, session_id))
    }

    /// Generate and persist the next balanced match of a session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on database failure.
    pub fn create_next_match(&mut self, session_id: i64) -> Result<MatchOutcome> {
        self.in_tx(|conn, rules| next_match_in(conn, rules, session_id))
    }

    /// Record `team` as the winner of the session's earliest undecided match.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on database failure.
    pub fn record_win(
        &mut self,
        session_id: i64,
        team: Team,
        stage: &str,
        now: DateTime<Utc>,
    ) -> Result<WinOutcome> {
        self.in_tx(|conn, rules| {
            let Some(session) = room_session(conn, session_id)? else {
                return Ok(WinOutcome::NotFound { session_id });
            };
            if session.status == SessionStatus::Finished {
                return Ok(WinOutcome::AlreadyFinished { session_id });
            }
            let room = session.room_label.clone();

            let Some(current) = queries::first_undecided_match(conn, session_id)? else {
                let next = next_match_in(conn, rules, session_id)?;
                return Ok(WinOutcome::NoPendingMatch { room, next });
            };

            queries::set_match_result(conn, current.id, team, stage)?;
            for uid in current.team(team) {
                queries::increment_wins(conn, session_id, *uid)?;
            }
            info!(session_id, match_index = current.match_index, %team, "Match result recorded");

            if queries::max_session_wins(conn, session_id)? >= rules.win_target {
                let finish = finish_session_in(conn, session_id, now)?;
                return Ok(WinOutcome::SessionFinished {
                    room,
                    match_index: current.match_index,
                    team,
                    finish,
                });
            }

            let next = next_match_in(conn, rules, session_id)?;
            Ok(WinOutcome::NextMatch {
                room,
                match_index: current.match_index,
                team,
                next,
            })
        })
    }

    /// Credit a session's wins to its season and mark it finished.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on database failure.
    pub fn finish_session(&mut self, session_id: i64, now: DateTime<Utc>) -> Result<FinishOutcome> {
        self.in_tx(|conn, _| finish_session_in(conn, session_id, now))
    }

    /// Standings of the named season, or the active one when `season_name` is `None`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on database failure.
    pub fn leaderboard(&self, season_name: Option<&str>) -> Result<Option<Leaderboard>> {
        let conn = self.db.conn();
        let season = match season_name {
            Some(name) => queries::season_by_name(conn, name)?,
            None => queries::active_season(conn)?,
        };
        let Some(season) = season else {
            return Ok(None);
        };

        let rows = queries::leaderboard_rows(conn, season.id)?
            .into_iter()
            .enumerate()
            .map(|(i, (score, user))| LeaderboardRow {
                rank: i + 1,
                total: score.total(),
                display_name: user.display_name,
                slack_user_id: user.slack_user_id,
                entry_points: score.entry_points,
                win_points: score.win_points,
            })
            .collect();

        Ok(Some(Leaderboard {
            season_name: season.name,
            rows,
        }))
    }

    /// Room label of a session, used to pick the room channel.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on database failure.
    pub fn session_room(&self, session_id: i64) -> Result<Option<String>> {
        Ok(queries::get_session(self.db.conn(), session_id)?.map(|s| s.room_label))
    }

    /// Current session wins keyed by user id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on database failure.
    pub fn session_wins(&self, session_id: i64) -> Result<HashMap<UserId, i64>> {
        Ok(queries::session_stats(self.db.conn(), session_id)?
            .into_iter()
            .map(|s| (s.user_id, s.wins))
            .collect())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Transaction-scoped building blocks
// ─────────────────────────────────────────────────────────────────────────────

fn ensure_user_in(
    conn: &Connection,
    slack_user_id: &str,
    display_name: &str,
    now: DateTime<Utc>,
) -> Result<(User, bool)> {
    if let Some(mut user) = queries::find_user_by_slack_id(conn, slack_user_id)? {
        if !display_name.is_empty() && user.display_name != display_name {
            queries::update_display_name(conn, user.id, display_name)?;
            user.display_name = display_name.to_string();
        }
        return Ok((user, false));
    }
    let user = queries::insert_user(conn, slack_user_id, display_name, now)?;
    info!(user = %slack_user_id, "User registered");
    Ok((user, true))
}

fn ensure_pending_in(
    conn: &Connection,
    season_id: i64,
    week: i64,
    now: DateTime<Utc>,
) -> Result<GameSession> {
    if let Some(session) = queries::find_session(conn, season_id, week, PENDING_ROOM)? {
        return Ok(session);
    }
    queries::insert_session(conn, season_id, week, PENDING_ROOM, now, SessionStatus::Scheduled)
}

/// A playable session; the weekly entry box never counts as one.
fn room_session(conn: &Connection, session_id: i64) -> Result<Option<GameSession>> {
    Ok(queries::get_session(conn, session_id)?.filter(|s| !s.is_pending_box()))
}

fn member(conn: &Connection, user_id: UserId) -> Result<Member> {
    Ok(Member {
        user_id,
        slack_user_id: queries::get_user(conn, user_id)?.map(|u| u.slack_user_id),
    })
}

fn members(conn: &Connection, user_ids: &[UserId]) -> Result<Vec<Member>> {
    user_ids.iter().map(|id| member(conn, *id)).collect()
}

fn open_room(
    conn: &Connection,
    rules: &LeagueRules,
    season_id: i64,
    week: i64,
    label: &str,
    user_ids: &[UserId],
    now: DateTime<Utc>,
) -> Result<Room> {
    let session =
        queries::insert_session(conn, season_id, week, label, now, SessionStatus::Scheduled)?;
    for uid in user_ids {
        queries::insert_entry(conn, session.id, *uid, EntryStatus::Confirmed, now)?;
        queries::ensure_stat(conn, session.id, *uid)?;
    }
    let start = start_session_in(conn, session.id)?;
    let first_match = next_match_in(conn, rules, session.id)?;
    info!(week, room = %label, session_id = session.id, "Room opened");

    Ok(Room {
        label: label.to_string(),
        session_id: session.id,
        members: members(conn, user_ids)?,
        start,
        first_match,
    })
}

fn start_session_in(conn: &Connection, session_id: i64) -> Result<StartOutcome> {
    let Some(session) = room_session(conn, session_id)? else {
        return Ok(StartOutcome::NotFound { session_id });
    };
    match session.status {
        SessionStatus::Finished => Ok(StartOutcome::AlreadyFinished { session_id }),
        SessionStatus::Live => Ok(StartOutcome::AlreadyLive { session_id }),
        SessionStatus::Scheduled => {
            queries::set_session_status(conn, session_id, SessionStatus::Live)?;
            Ok(StartOutcome::Started { session_id })
        }
    }
}

fn next_match_in(conn: &Connection, rules: &LeagueRules, session_id: i64) -> Result<MatchOutcome> {
    let Some(session) = room_session(conn, session_id)? else {
        return Ok(MatchOutcome::NotFound { session_id });
    };
    if session.status == SessionStatus::Finished {
        return Ok(MatchOutcome::AlreadyFinished { session_id });
    }

    let user_ids: Vec<UserId> = queries::confirmed_entries(conn, session_id)?
        .into_iter()
        .take(rules.room_size)
        .map(|e| e.user_id)
        .collect();
    for uid in &user_ids {
        queries::ensure_stat(conn, session_id, *uid)?;
    }
    let wins: HashMap<UserId, i64> = queries::session_stats(conn, session_id)?
        .into_iter()
        .map(|s| (s.user_id, s.wins))
        .collect();
    let players: Vec<Player> = user_ids
        .iter()
        .map(|uid| Player {
            user_id: *uid,
            wins: wins.get(uid).copied().unwrap_or(0),
        })
        .collect();

    if players.len() < rules.room_size {
        return Ok(MatchOutcome::NotEnoughPlayers {
            session_id,
            have: players.len(),
        });
    }
    let Some((team_a, team_b)) = split_min_diff(&players) else {
        return Ok(MatchOutcome::NotEnoughPlayers {
            session_id,
            have: players.len(),
        });
    };

    let index = queries::last_match_index(conn, session_id)?.map_or(1, |last| last + 1);
    let created = queries::insert_match(conn, session_id, index, &team_a, &team_b)?;
    debug!(session_id, match_index = created.match_index, "Match created");

    Ok(MatchOutcome::Created(MatchAnnouncement {
        session_id,
        match_index: created.match_index,
        team_a: members(conn, &created.team_a)?,
        team_b: members(conn, &created.team_b)?,
    }))
}

fn finish_session_in(
    conn: &Connection,
    session_id: i64,
    now: DateTime<Utc>,
) -> Result<FinishOutcome> {
    let Some(session) = room_session(conn, session_id)? else {
        return Ok(FinishOutcome::NotFound { session_id });
    };
    if session.status == SessionStatus::Finished {
        return Ok(FinishOutcome::AlreadyFinished { session_id });
    }

    let season_name = season_name_of(conn, session.season_id)?;
    let stats = queries::session_stats(conn, session_id)?;
    for stat in &stats {
        queries::ensure_score(conn, session.season_id, stat.user_id)?;
        queries::add_win_points(conn, session.season_id, stat.user_id, stat.wins)?;
        queries::insert_settlement(
            conn,
            session.season_id,
            session_id,
            stat.user_id,
            stat.wins,
            now,
        )?;
    }
    queries::set_session_status(conn, session_id, SessionStatus::Finished)?;
    info!(session_id, credited = stats.len(), "Session finished");

    Ok(FinishOutcome::Finished {
        session_id,
        season_name,
        credited: stats.len(),
    })
}

fn season_name_of(conn: &Connection, season_id: i64) -> Result<String> {
    queries::get_season(conn, season_id)?
        .map(|s| s.name)
        .ok_or_else(|| LeagueError::NotFound(format!("season {season_id}")))
}
