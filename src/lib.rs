/// League Bot - A Slack bot that runs a weekly 8-player game league.
///
/// Players press Join/Cancel on a weekly announcement, admins close entries
/// to open rooms of eight, and room members report match results with `/win`
/// until someone reaches the season's win target.
///
/// # Architecture
///
/// The system uses:
/// - axum for the HTTP endpoints Slack calls
/// - SQLite (rusqlite) for seasons, entries, sessions and scores
/// - slack-morphism and reqwest for Slack Web API calls
/// - Tokio for async runtime
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
///
/// use league_bot::api::AppState;
/// use league_bot::core::config::AppConfig;
/// use league_bot::core::league::League;
/// use league_bot::slack::SlackMessenger;
/// use league_bot::storage::LeagueDb;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     // Set up structured logging
///     league_bot::setup_logging();
///
///     let config = AppConfig::from_env()?;
///     let db = LeagueDb::open(std::path::Path::new(&config.database_path))?;
///     let league = League::new(db, config.rules.clone());
///     let messenger = Arc::new(SlackMessenger::new(config.slack_bot_token.clone()));
///
///     let state = Arc::new(AppState::new(config, league, messenger));
///     league_bot::api::serve(state).await?;
///     Ok(())
/// }
/// ```
// Module declarations
pub mod api;
pub mod core;
pub mod errors;
pub mod slack;
pub mod storage;

/// Configure structured logging with JSON format.
///
/// The filter comes from `RUST_LOG` and defaults to `info`. Calling this more
/// than once is harmless; later calls leave the first subscriber in place.
///
/// # Example
///
/// ```
/// // Initialize structured logging at startup
/// league_bot::setup_logging();
/// ```
pub fn setup_logging() {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let default_level = if cfg!(feature = "debug-logs") {
        "debug"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let fmt_layer = tracing_subscriber::fmt::layer().json().with_target(true);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}
