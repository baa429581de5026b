#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use league_bot::core::config::{AppConfig, LeagueRules};
use league_bot::core::league::League;
use league_bot::errors::LeagueError;
use league_bot::slack::Messenger;
use league_bot::storage::LeagueDb;
use serde_json::Value;

pub const SIGNING_SECRET: &str = "test-signing-secret";
pub const ADMIN: &str = "UADMIN";

/// A room post captured by [`RecordingMessenger`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedPost {
    pub room_label: String,
    pub text: String,
    pub members: Vec<String>,
}

/// In-memory stand-in for Slack.
#[derive(Default)]
pub struct RecordingMessenger {
    pub posts: Mutex<Vec<RecordedPost>>,
    pub responses: Mutex<Vec<(String, Value)>>,
    pub workspace_admins: HashSet<String>,
}

impl RecordingMessenger {
    pub fn with_workspace_admins(ids: &[&str]) -> Self {
        Self {
            workspace_admins: ids.iter().map(|id| (*id).to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn posts(&self) -> Vec<RecordedPost> {
        self.posts.lock().unwrap().clone()
    }

    pub fn responses(&self) -> Vec<(String, Value)> {
        self.responses.lock().unwrap().clone()
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn post_to_room(
        &self,
        room_label: &str,
        text: &str,
        members: &[String],
    ) -> Result<(), LeagueError> {
        self.posts.lock().unwrap().push(RecordedPost {
            room_label: room_label.to_string(),
            text: text.to_string(),
            members: members.to_vec(),
        });
        Ok(())
    }

    async fn respond(&self, response_url: &str, payload: &Value) -> Result<(), LeagueError> {
        self.responses
            .lock()
            .unwrap()
            .push((response_url.to_string(), payload.clone()));
        Ok(())
    }

    async fn is_workspace_admin(&self, user_id: &str) -> Result<bool, LeagueError> {
        Ok(self.workspace_admins.contains(user_id))
    }
}

pub fn at(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 4, day, 12, 0, 0).unwrap()
}

pub fn league_with(rules: LeagueRules) -> League {
    League::new(LeagueDb::open_in_memory().unwrap(), rules)
}

pub fn league() -> League {
    league_with(LeagueRules::default())
}

pub fn slack_id(n: usize) -> String {
    format!("U{n:02}")
}

pub fn test_config(rules: LeagueRules) -> AppConfig {
    let vars: HashMap<&str, &str> = HashMap::from([
        ("SLACK_SIGNING_SECRET", SIGNING_SECRET),
        ("SLACK_BOT_TOKEN", "xoxb-test"),
        ("DATABASE_PATH", ":memory:"),
        ("TZ", "Asia/Tokyo"),
        ("LEAGUE_ADMIN_IDS", ADMIN),
    ]);
    let mut config = AppConfig::from_lookup(|key| vars.get(key).map(|v| (*v).to_string())).unwrap();
    config.rules = rules;
    config
}
