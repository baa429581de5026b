use std::path::Path;
use std::sync::Arc;

use league_bot::api::{self, AppState};
use league_bot::core::config::AppConfig;
use league_bot::core::league::League;
use league_bot::errors::LeagueError;
use league_bot::slack::SlackMessenger;
use league_bot::storage::LeagueDb;
use tracing::info;

async fn run() -> Result<(), LeagueError> {
    let config = AppConfig::from_env().map_err(LeagueError::ConfigError)?;

    let db = LeagueDb::open(Path::new(&config.database_path))?;
    info!(path = %config.database_path, timezone = %config.timezone, "Database ready");

    let league = League::new(db, config.rules.clone());
    let messenger = Arc::new(SlackMessenger::new(config.slack_bot_token.clone()));
    let state = Arc::new(AppState::new(config, league, messenger));

    api::serve(state).await
}

#[tokio::main]
async fn main() {
    league_bot::setup_logging();
    if let Err(err) = run().await {
        tracing::error!(error = %err, "league-bot failed");
        std::process::exit(1);
    }
}
