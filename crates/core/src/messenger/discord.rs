//! Discord REST messenger implementation.

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use reqwest::{header::AUTHORIZATION, Client, Method, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::DiscordConfig;

use super::{
    ChannelId, Embed, MessageId, Messenger, MessengerError, OutgoingMessage, PostedMessage, UserId,
};

/// Page size for channel history requests (API maximum).
const HISTORY_PAGE: usize = 100;
/// Deletes issued concurrently while clearing a channel.
const CLEAR_CONCURRENCY: usize = 4;

#[derive(Debug, Deserialize)]
struct CreatedMessage {
    id: MessageId,
}

#[derive(Debug, Deserialize)]
struct RateLimitBody {
    retry_after: f64,
}

/// Discord messenger over the REST API.
pub struct DiscordMessenger {
    client: Client,
    config: DiscordConfig,
}

impl DiscordMessenger {
    pub fn new(config: DiscordConfig) -> Result<Self, MessengerError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .map_err(|e| MessengerError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Get the base URL without trailing slash.
    fn base_url(&self) -> &str {
        self.config.api_url.trim_end_matches('/')
    }

    /// Issue a request, retrying once when rate limited.
    async fn request(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&Value>,
    ) -> Result<Response, MessengerError> {
        let url = format!("{}{}", self.base_url(), endpoint);
        let mut retried = false;

        loop {
            let mut request = self
                .client
                .request(method.clone(), &url)
                .header(AUTHORIZATION, format!("Bot {}", self.config.token));
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = request.send().await.map_err(|e| {
                if e.is_timeout() {
                    MessengerError::Timeout
                } else if e.is_connect() {
                    MessengerError::ConnectionFailed(e.to_string())
                } else {
                    MessengerError::ApiError(e.to_string())
                }
            })?;

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS {
                let wait = retry_after(response).await;
                if retried {
                    return Err(MessengerError::RateLimited(wait));
                }
                warn!(
                    endpoint = endpoint,
                    wait_ms = wait.as_millis() as u64,
                    "Discord rate limit hit, retrying"
                );
                tokio::time::sleep(wait).await;
                retried = true;
                continue;
            }

            if status == StatusCode::NOT_FOUND {
                return Err(MessengerError::NotFound(endpoint.to_string()));
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(MessengerError::ApiError(format!(
                    "HTTP {}: {}",
                    status,
                    body.chars().take(200).collect::<String>()
                )));
            }

            return Ok(response);
        }
    }

    async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&Value>,
    ) -> Result<T, MessengerError> {
        self.request(method, endpoint, body)
            .await?
            .json()
            .await
            .map_err(|e| MessengerError::ApiError(format!("Failed to parse response: {}", e)))
    }

    fn reaction_endpoint(
        channel: ChannelId,
        message: MessageId,
        emoji: &str,
        target: &str,
    ) -> String {
        format!(
            "/channels/{}/messages/{}/reactions/{}/{}",
            channel,
            message,
            urlencoding::encode(emoji),
            target
        )
    }
}

async fn retry_after(response: Response) -> Duration {
    let seconds = response
        .json::<RateLimitBody>()
        .await
        .map(|b| b.retry_after)
        .unwrap_or(1.0);
    Duration::from_secs_f64(seconds.clamp(0.0, 60.0))
}

fn message_body(message: &OutgoingMessage) -> Value {
    let mut body = json!({});
    if let Some(content) = &message.content {
        body["content"] = json!(content);
    }
    if let Some(embed) = &message.embed {
        body["embeds"] = json!([embed]);
    }
    body
}

#[async_trait]
impl Messenger for DiscordMessenger {
    fn name(&self) -> &str {
        "discord"
    }

    async fn send_message(
        &self,
        channel: ChannelId,
        message: OutgoingMessage,
    ) -> Result<MessageId, MessengerError> {
        let endpoint = format!("/channels/{}/messages", channel);
        let created: CreatedMessage = self
            .request_json(Method::POST, &endpoint, Some(&message_body(&message)))
            .await?;
        debug!(channel = %channel, message = %created.id, "Sent message");
        Ok(created.id)
    }

    async fn fetch_message(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> Result<PostedMessage, MessengerError> {
        let endpoint = format!("/channels/{}/messages/{}", channel, message);
        self.request_json(Method::GET, &endpoint, None).await
    }

    async fn edit_embed(
        &self,
        channel: ChannelId,
        message: MessageId,
        embed: Embed,
    ) -> Result<(), MessengerError> {
        let endpoint = format!("/channels/{}/messages/{}", channel, message);
        self.request(Method::PATCH, &endpoint, Some(&json!({ "embeds": [embed] })))
            .await?;
        Ok(())
    }

    async fn delete_message(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> Result<(), MessengerError> {
        let endpoint = format!("/channels/{}/messages/{}", channel, message);
        self.request(Method::DELETE, &endpoint, None).await?;
        Ok(())
    }

    async fn add_reaction(
        &self,
        channel: ChannelId,
        message: MessageId,
        emoji: &str,
    ) -> Result<(), MessengerError> {
        let endpoint = Self::reaction_endpoint(channel, message, emoji, "@me");
        self.request(Method::PUT, &endpoint, None).await?;
        Ok(())
    }

    async fn remove_reaction(
        &self,
        channel: ChannelId,
        message: MessageId,
        emoji: &str,
        user: UserId,
    ) -> Result<(), MessengerError> {
        let endpoint = Self::reaction_endpoint(channel, message, emoji, &user.to_string());
        self.request(Method::DELETE, &endpoint, None).await?;
        Ok(())
    }

    async fn clear_channel(&self, channel: ChannelId) -> Result<usize, MessengerError> {
        let endpoint = format!("/channels/{}/messages?limit={}", channel, HISTORY_PAGE);
        let mut removed = 0;

        loop {
            let page: Vec<PostedMessage> = self.request_json(Method::GET, &endpoint, None).await?;
            if page.is_empty() {
                break;
            }

            let ids: Vec<MessageId> = page.iter().map(|m| m.id).collect();
            let results: Vec<_> = stream::iter(ids)
                .map(|id| self.delete_message(channel, id))
                .buffer_unordered(CLEAR_CONCURRENCY)
                .collect()
                .await;

            let deleted = results.iter().filter(|r| r.is_ok()).count();
            for err in results.into_iter().filter_map(Result::err) {
                warn!(
                    channel = %channel,
                    error = %err,
                    "Failed to delete message while clearing channel"
                );
            }

            // Nothing went away, so the next page would be identical.
            if deleted == 0 {
                break;
            }
            removed += deleted;
        }

        debug!(channel = %channel, removed = removed, "Cleared channel");
        Ok(removed)
    }

    async fn crosspost(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> Result<(), MessengerError> {
        let endpoint = format!("/channels/{}/messages/{}/crosspost", channel, message);
        self.request(Method::POST, &endpoint, None).await?;
        Ok(())
    }

    fn message_link(&self, channel: ChannelId, message: MessageId) -> String {
        format!(
            "https://discord.com/channels/{}/{}/{}",
            self.config.guild_id, channel, message
        )
    }
}
