use slack_morphism::errors::SlackClientError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LeagueError {
    #[error("Failed to parse Slack request: {0}")]
    ParseError(String),

    #[error("Failed to access Slack API: {0}")]
    ApiError(String),

    #[error("Failed to send HTTP request: {0}")]
    HttpError(String),

    #[error("Database error: {0}")]
    StorageError(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("{0}")]
    GeneralError(String),
}

impl From<SlackClientError> for LeagueError {
    fn from(error: SlackClientError) -> Self {
        LeagueError::ApiError(error.to_string())
    }
}

impl From<reqwest::Error> for LeagueError {
    fn from(error: reqwest::Error) -> Self {
        LeagueError::HttpError(error.to_string())
    }
}

impl From<rusqlite::Error> for LeagueError {
    fn from(error: rusqlite::Error) -> Self {
        LeagueError::StorageError(error.to_string())
    }
}

impl From<anyhow::Error> for LeagueError {
    fn from(error: anyhow::Error) -> Self {
        LeagueError::GeneralError(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LeagueError>;
