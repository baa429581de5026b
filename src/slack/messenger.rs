//! Outbound chat seam used by the API handlers.
//!
//! Handlers talk to [`Messenger`] rather than to [`SlackClient`] directly so the
//! command flow can run against a recording double in tests.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

use super::client::SlackClient;
use crate::errors::LeagueError;

/// Channel name used for a room label, e.g. `room-1`.
#[must_use]
pub fn room_channel_name(room_label: &str) -> String {
    format!("room-{}", room_label.to_lowercase())
}

#[async_trait]
pub trait Messenger: Send + Sync {
    /// Post `text` to the room's channel, creating it for `members` if missing.
    async fn post_to_room(
        &self,
        room_label: &str,
        text: &str,
        members: &[String],
    ) -> Result<(), LeagueError>;

    /// Reply through an interaction `response_url`.
    async fn respond(&self, response_url: &str, payload: &Value) -> Result<(), LeagueError>;

    async fn is_workspace_admin(&self, user_id: &str) -> Result<bool, LeagueError>;
}

pub struct SlackMessenger {
    client: SlackClient,
}

impl SlackMessenger {
    #[must_use]
    pub fn new(bot_token: String) -> Self {
        Self {
            client: SlackClient::new(bot_token),
        }
    }
}

#[async_trait]
impl Messenger for SlackMessenger {
    async fn post_to_room(
        &self,
        room_label: &str,
        text: &str,
        members: &[String],
    ) -> Result<(), LeagueError> {
        let name = room_channel_name(room_label);
        let channel_id = match self.client.find_channel_by_name(&name).await? {
            Some(id) => id,
            None => match self.client.create_private_channel(&name).await? {
                Some(id) => {
                    info!(channel = %name, channel_id = %id, "Created room channel");
                    id
                }
                // Taken but not listed yet: look it up once more.
                None => self.client.find_channel_by_name(&name).await?.ok_or_else(|| {
                    LeagueError::ApiError(format!(
                        "channel {name} exists but is not visible to the bot"
                    ))
                })?,
            },
        };

        if let Err(e) = self.client.invite_users(&channel_id, members).await {
            warn!(channel = %name, "Failed to invite room members: {}", e);
        }

        self.client.post_message(&channel_id, text).await
    }

    async fn respond(&self, response_url: &str, payload: &Value) -> Result<(), LeagueError> {
        self.client.respond(response_url, payload).await
    }

    async fn is_workspace_admin(&self, user_id: &str) -> Result<bool, LeagueError> {
        self.client.get_user_is_admin(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_channels_are_lowercase() {
        assert_eq!(room_channel_name("1"), "room-1");
        assert_eq!(room_channel_name("B"), "room-b");
    }
}
