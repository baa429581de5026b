use std::env;
use std::net::SocketAddr;

use chrono::TimeDelta;
use chrono_tz::Tz;

/// Longest season `LEAGUE_SEASON_DAYS` may configure.
const MAX_SEASON_DAYS: i64 = 3650;

/// Gameplay constants shared by the league service and the message formatter.
#[derive(Debug, Clone, PartialEq)]
pub struct LeagueRules {
    /// Players per room; split into two equal teams.
    pub room_size: usize,
    pub entry_points: f64,
    /// Session wins that end a session.
    pub win_target: i64,
    pub season_days: i64,
    pub room_labels: Vec<String>,
}

impl Default for LeagueRules {
    fn default() -> Self {
        Self {
            room_size: 8,
            entry_points: 0.5,
            win_target: 10,
            season_days: 90,
            room_labels: (1..=9).map(|n| n.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub slack_signing_secret: String,
    pub slack_bot_token: String,
    pub database_path: String,
    pub bind_addr: SocketAddr,
    pub timezone: Tz,
    pub admin_user_ids: Vec<String>,
    pub rules: LeagueRules,
}

impl AppConfig {
    /// Read configuration from the process environment.
    ///
    /// A `.env` file in the working directory is loaded first if present.
    ///
    /// # Errors
    ///
    /// Returns a message naming the offending variable when a required one is
    /// missing or a value cannot be parsed.
    pub fn from_env() -> Result<Self, String> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`AppConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| format!("{key}: environment variable not found"))
        };

        let bind_addr = lookup("BIND_ADDR")
            .unwrap_or_else(|| "0.0.0.0:3000".to_string())
            .parse::<SocketAddr>()
            .map_err(|e| format!("BIND_ADDR: {e}"))?;

        let timezone = lookup("TZ")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| "UTC".to_string())
            .parse::<Tz>()
            .map_err(|e| format!("TZ: {e}"))?;

        let admin_user_ids = lookup("LEAGUE_ADMIN_IDS")
            .unwrap_or_default()
            .split(',')
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .collect();

        let mut rules = LeagueRules::default();
        if let Some(raw) = lookup("LEAGUE_WIN_TARGET") {
            rules.win_target =
                parse_positive(&raw).map_err(|e| format!("LEAGUE_WIN_TARGET: {e}"))?;
        }
        if let Some(raw) = lookup("LEAGUE_SEASON_DAYS") {
            rules.season_days =
                parse_season_days(&raw).map_err(|e| format!("LEAGUE_SEASON_DAYS: {e}"))?;
        }

        Ok(Self {
            slack_signing_secret: required("SLACK_SIGNING_SECRET")?,
            slack_bot_token: required("SLACK_BOT_TOKEN")?,
            database_path: lookup("DATABASE_PATH").unwrap_or_else(|| "./league.db".to_string()),
            bind_addr,
            timezone,
            admin_user_ids,
            rules,
        })
    }

    #[must_use]
    pub fn is_listed_admin(&self, slack_user_id: &str) -> bool {
        self.admin_user_ids.iter().any(|id| id == slack_user_id)
    }
}

fn parse_positive(raw: &str) -> Result<i64, String> {
    match raw.trim().parse::<i64>() {
        Ok(n) if n > 0 => Ok(n),
        Ok(n) => Err(format!("must be positive, got {n}")),
        Err(e) => Err(e.to_string()),
    }
}

fn parse_season_days(raw: &str) -> Result<i64, String> {
    let days = parse_positive(raw)?;
    if days > MAX_SEASON_DAYS || TimeDelta::try_days(days).is_none() {
        return Err(format!("must be at most {MAX_SEASON_DAYS}, got {days}"));
    }
    Ok(days)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_optional_values_missing() {
        let cfg = AppConfig::from_lookup(lookup_from(&[
            ("SLACK_SIGNING_SECRET", "secret"),
            ("SLACK_BOT_TOKEN", "xoxb-1"),
        ]))
        .unwrap();

        assert_eq!(cfg.database_path, "./league.db");
        assert_eq!(cfg.bind_addr.port(), 3000);
        assert_eq!(cfg.timezone, chrono_tz::UTC);
        assert!(cfg.admin_user_ids.is_empty());
        assert_eq!(cfg.rules, LeagueRules::default());
    }

    #[test]
    fn missing_token_names_the_variable() {
        let err = AppConfig::from_lookup(lookup_from(&[("SLACK_SIGNING_SECRET", "s")]))
            .unwrap_err();
        assert!(err.starts_with("SLACK_BOT_TOKEN"));
    }

    #[test]
    fn parses_admins_timezone_and_rules() {
        let cfg = AppConfig::from_lookup(lookup_from(&[
            ("SLACK_SIGNING_SECRET", "s"),
            ("SLACK_BOT_TOKEN", "t"),
            ("TZ", "Asia/Tokyo"),
            ("LEAGUE_ADMIN_IDS", "U1, U2,,"),
            ("LEAGUE_WIN_TARGET", "5"),
        ]))
        .unwrap();

        assert_eq!(cfg.timezone, chrono_tz::Asia::Tokyo);
        assert_eq!(cfg.admin_user_ids, vec!["U1", "U2"]);
        assert!(cfg.is_listed_admin("U2"));
        assert!(!cfg.is_listed_admin("U3"));
        assert_eq!(cfg.rules.win_target, 5);
    }

    #[test]
    fn rejects_bad_timezone_and_zero_target() {
        let base = [("SLACK_SIGNING_SECRET", "s"), ("SLACK_BOT_TOKEN", "t")];

        let mut tz = base.to_vec();
        tz.push(("TZ", "Mars/Olympus"));
        assert!(AppConfig::from_lookup(lookup_from(&tz)).unwrap_err().starts_with("TZ"));

        let mut target = base.to_vec();
        target.push(("LEAGUE_WIN_TARGET", "0"));
        assert!(
            AppConfig::from_lookup(lookup_from(&target))
                .unwrap_err()
                .starts_with("LEAGUE_WIN_TARGET")
        );
    }

    #[test]
    fn season_days_must_fit_a_calendar() {
        let base = [("SLACK_SIGNING_SECRET", "s"), ("SLACK_BOT_TOKEN", "t")];

        let mut ok = base.to_vec();
        ok.push(("LEAGUE_SEASON_DAYS", "3650"));
        assert_eq!(AppConfig::from_lookup(lookup_from(&ok)).unwrap().rules.season_days, 3650);

        for raw in ["3651", "100000000", "-5"] {
            let mut days = base.to_vec();
            days.push(("LEAGUE_SEASON_DAYS", raw));
            let err = AppConfig::from_lookup(lookup_from(&days)).unwrap_err();
            assert!(err.starts_with("LEAGUE_SEASON_DAYS"), "{raw}: {err}");
        }
    }
}
