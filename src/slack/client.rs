//! Slack API client module
//!
//! Encapsulates the Slack Web API calls the league needs, with retry logic
//! and error handling.

use reqwest::Client;
use serde_json::Value;
use slack_morphism::errors::SlackClientError;
use slack_morphism::hyper_tokio::{SlackClientHyperConnector, SlackHyperClient};
use slack_morphism::prelude::{
    SlackApiChatPostMessageRequest, SlackApiConversationsCreateRequest,
    SlackApiConversationsInviteRequest, SlackApiConversationsListRequest, SlackApiUsersInfoRequest,
};
use slack_morphism::{
    SlackApiToken, SlackApiTokenValue, SlackChannelId, SlackConversationType, SlackCursorId,
    SlackMessageContent, SlackUserId,
};
use std::time::Duration;
use tokio_retry::strategy::jitter;
use tokio_retry::{Retry, strategy::ExponentialBackoff};
use tracing::{debug, warn};

use crate::errors::LeagueError;

// Build the Slack client connector safely without panicking.
// If connector construction fails, store None and surface a LeagueError at call sites.
static SLACK_CLIENT: std::sync::LazyLock<Option<SlackHyperClient>> =
    std::sync::LazyLock::new(|| match SlackClientHyperConnector::new() {
        Ok(connector) => Some(SlackHyperClient::new(connector)),
        Err(e) => {
            warn!("Failed to create Slack HTTP connector: {}", e);
            None
        }
    });

static HTTP_CLIENT: std::sync::LazyLock<Client> = std::sync::LazyLock::new(|| {
    Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .unwrap_or_else(|_| Client::new())
});

fn slack_client() -> Result<&'static SlackHyperClient, LeagueError> {
    SLACK_CLIENT.as_ref().ok_or_else(|| {
        LeagueError::GeneralError("Slack HTTP connector not initialized".to_string())
    })
}

/// Slack's error code when a Web API call answered `ok: false`.
#[must_use]
pub fn api_error_code(error: &SlackClientError) -> Option<&str> {
    match error {
        SlackClientError::ApiError(api) => Some(api.code.as_str()),
        _ => None,
    }
}

/// Slack API client with retry logic and error handling
pub struct SlackClient {
    token: SlackApiToken,
}

impl SlackClient {
    #[must_use]
    pub fn new(token: String) -> Self {
        Self {
            token: SlackApiToken::new(SlackApiTokenValue::new(token)),
        }
    }

    async fn with_retry<F, Fut, T>(&self, operation: F) -> Result<T, LeagueError>
    where
        F: FnMut() -> Fut + Send,
        Fut: std::future::Future<Output = Result<T, LeagueError>> + Send,
        T: Send,
    {
        let strategy = ExponentialBackoff::from_millis(100).map(jitter).take(5);

        Retry::spawn(strategy, operation).await
    }

    /// # Errors
    ///
    /// Returns an error if the Slack API call fails.
    pub async fn post_message(&self, channel_id: &str, message: &str) -> Result<(), LeagueError> {
        self.with_retry(|| async {
            let session = slack_client()?.open_session(&self.token);

            let post_req = SlackApiChatPostMessageRequest::new(
                SlackChannelId(channel_id.to_string()),
                SlackMessageContent::new().with_text(message.to_string()),
            );

            session.chat_post_message(&post_req).await?;

            Ok(())
        })
        .await
    }

    /// Look up a public or private channel the bot can see by its exact name.
    ///
    /// # Errors
    ///
    /// Returns an error if a `conversations.list` page fails.
    pub async fn find_channel_by_name(&self, name: &str) -> Result<Option<String>, LeagueError> {
        let mut cursor: Option<SlackCursorId> = None;
        loop {
            let list_req = SlackApiConversationsListRequest::new()
                .with_types(vec![SlackConversationType::Public, SlackConversationType::Private])
                .with_exclude_archived(true)
                .with_limit(200)
                .opt_cursor(cursor.clone());

            let page = self
                .with_retry(|| async {
                    let session = slack_client()?.open_session(&self.token);
                    Ok(session.conversations_list(&list_req).await?)
                })
                .await?;

            if let Some(channel) = page
                .channels
                .iter()
                .find(|c| c.name.as_deref() == Some(name))
            {
                return Ok(Some(channel.id.0.clone()));
            }

            cursor = page
                .response_metadata
                .and_then(|m| m.next_cursor)
                .filter(|c| !c.0.is_empty());
            if cursor.is_none() {
                return Ok(None);
            }
        }
    }

    /// Create a private channel and return its id.
    ///
    /// Returns `None` when Slack reports `name_taken`, so the caller can look
    /// the existing channel up instead. A retried create that already went
    /// through lands here too.
    ///
    /// # Errors
    ///
    /// Returns an error if `conversations.create` fails for another reason.
    pub async fn create_private_channel(&self, name: &str) -> Result<Option<String>, LeagueError> {
        let create_req = SlackApiConversationsCreateRequest::new(name.to_string())
            .with_is_private(true);

        self.with_retry(|| async {
            let session = slack_client()?.open_session(&self.token);
            match session.conversations_create(&create_req).await {
                Ok(created) => Ok(Some(created.channel.id.0)),
                Err(e) if api_error_code(&e) == Some("name_taken") => {
                    debug!(channel = %name, "Channel name already taken");
                    Ok(None)
                }
                Err(e) => Err(e.into()),
            }
        })
        .await
    }

    /// Invite users to a channel. Users already present are not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if `conversations.invite` fails for another reason.
    pub async fn invite_users(
        &self,
        channel_id: &str,
        user_ids: &[String],
    ) -> Result<(), LeagueError> {
        if user_ids.is_empty() {
            return Ok(());
        }
        let invite_req = SlackApiConversationsInviteRequest::new(
            SlackChannelId(channel_id.to_string()),
            user_ids.iter().map(|id| SlackUserId(id.clone())).collect(),
        );

        self.with_retry(|| async {
            let session = slack_client()?.open_session(&self.token);
            match session.conversations_invite(&invite_req).await {
                Ok(_) => Ok(()),
                Err(e) if api_error_code(&e) == Some("already_in_channel") => {
                    debug!(channel = %channel_id, "Users already in channel");
                    Ok(())
                }
                Err(e) => Err(e.into()),
            }
        })
        .await
    }

    /// Whether a user is a workspace admin or owner.
    ///
    /// # Errors
    ///
    /// Returns an error if `users.info` fails.
    pub async fn get_user_is_admin(&self, user_id: &str) -> Result<bool, LeagueError> {
        self.with_retry(|| async {
            let session = slack_client()?.open_session(&self.token);
            let user_info_req = SlackApiUsersInfoRequest::new(SlackUserId(user_id.to_string()));

            let info = session.users_info(&user_info_req).await?;
            let flags = &info.user.flags;
            Ok(flags.is_admin.unwrap_or(false) || flags.is_owner.unwrap_or(false))
        })
        .await
    }

    /// POST a message payload to an interaction `response_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or Slack answers with a non-2xx status.
    pub async fn respond(&self, response_url: &str, payload: &Value) -> Result<(), LeagueError> {
        self.with_retry(|| async {
            let resp = HTTP_CLIENT.post(response_url).json(payload).send().await?;
            if !resp.status().is_success() {
                return Err(LeagueError::ApiError(format!(
                    "response_url HTTP {}",
                    resp.status()
                )));
            }
            Ok(())
        })
        .await
    }
}
