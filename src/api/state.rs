use std::sync::Arc;

use tokio::sync::Mutex;

use crate::core::config::AppConfig;
use crate::core::league::League;
use crate::slack::Messenger;

/// Everything a request handler needs.
pub struct AppState {
    pub config: AppConfig,
    pub league: Mutex<League>,
    pub messenger: Arc<dyn Messenger>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    #[must_use]
    pub fn new(config: AppConfig, league: League, messenger: Arc<dyn Messenger>) -> Self {
        Self {
            config,
            league: Mutex::new(league),
            messenger,
        }
    }

    /// Whether a Slack user may run admin commands: listed in
    /// `LEAGUE_ADMIN_IDS`, or a workspace admin/owner.
    pub async fn is_admin(&self, slack_user_id: &str) -> bool {
        if self.config.is_listed_admin(slack_user_id) {
            return true;
        }
        match self.messenger.is_workspace_admin(slack_user_id).await {
            Ok(is_admin) => is_admin,
            Err(e) => {
                tracing::warn!(user = %slack_user_id, "Admin lookup failed: {}", e);
                false
            }
        }
    }
}
