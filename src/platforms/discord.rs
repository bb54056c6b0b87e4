//! Discord REST implementation of [`ChatPlatform`]
//!
//! Only REST is used: renaming a channel needs no gateway session. The login
//! check fetches the bot's own user so that a bad token fails at startup
//! instead of on the first rename.

use crate::{
    constants::{DISCORD_API_URL, DISCORD_USER_AGENT, REQUEST_TIMEOUT_SECS},
    error::{PublishError, StartupError},
    publisher::{Channel, ChatPlatform},
};
use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct DiscordUser {
    id: String,
    username: String,
}

#[derive(Debug, Deserialize)]
struct DiscordChannel {
    id: String,
    #[serde(default)]
    name: Option<String>,
}

impl From<DiscordChannel> for Channel {
    fn from(channel: DiscordChannel) -> Self {
        Channel {
            id: channel.id,
            name: channel.name.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ModifyChannel<'a> {
    name: &'a str,
}

#[derive(Debug, Deserialize)]
struct RateLimitBody {
    retry_after: Option<f64>,
}

/// Authenticated Discord REST session
pub struct DiscordClient {
    client: Client,
    api_url: String,
    bot_user: String,
}

impl DiscordClient {
    /// Logs in against the public Discord API
    pub async fn connect(token: &str) -> Result<Self, StartupError> {
        Self::connect_to(DISCORD_API_URL, token).await
    }

    /// Logs in against an explicit API base URL
    pub async fn connect_to(api_url: &str, token: &str) -> Result<Self, StartupError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(StartupError::MissingCredential(crate::constants::DISCORD_TOKEN_ENV));
        }

        let mut auth = HeaderValue::from_str(&format!("Bot {}", token))
            .map_err(|_| StartupError::InvalidCredential)?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, auth);

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(DISCORD_USER_AGENT)
            .default_headers(headers)
            .build()?;

        let api_url = api_url.trim_end_matches('/').to_string();
        let response = client.get(format!("{}/users/@me", api_url)).send().await?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::UNAUTHORIZED => {
                return Err(StartupError::LoginRejected("token rejected (HTTP 401)".to_string()))
            }
            status => {
                return Err(StartupError::LoginRejected(format!(
                    "HTTP {}: {}",
                    status,
                    response.text().await.unwrap_or_default()
                )))
            }
        }

        let user: DiscordUser = response.json().await?;
        tracing::info!(user_id = %user.id, username = %user.username, "Logged in to Discord");

        Ok(Self {
            client,
            api_url,
            bot_user: user.username,
        })
    }

    /// Username of the logged-in bot
    pub fn bot_user(&self) -> &str {
        &self.bot_user
    }

    fn channel_url(&self, id: &str) -> String {
        format!("{}/channels/{}", self.api_url, id)
    }

    /// Maps a non-success response to a publish error
    async fn error_for(id: &str, response: Response) -> PublishError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        match status {
            StatusCode::NOT_FOUND => PublishError::NotFound(id.to_string()),
            StatusCode::UNAUTHORIZED => PublishError::Unauthorized(id.to_string()),
            StatusCode::FORBIDDEN => PublishError::Forbidden(id.to_string()),
            StatusCode::TOO_MANY_REQUESTS => PublishError::RateLimited {
                retry_after_secs: serde_json::from_str::<RateLimitBody>(&body)
                    .ok()
                    .and_then(|b| b.retry_after),
            },
            StatusCode::BAD_REQUEST => PublishError::InvalidName(body),
            status => PublishError::Api {
                status: status.as_u16(),
                message: body,
            },
        }
    }

    async fn read_channel(response: Response) -> Result<Channel, PublishError> {
        let channel: DiscordChannel = response
            .json()
            .await
            .map_err(|e| PublishError::Network(e.to_string()))?;
        Ok(channel.into())
    }
}

#[async_trait]
impl ChatPlatform for DiscordClient {
    async fn resolve_channel(&self, id: &str) -> Result<Channel, PublishError> {
        let response = self
            .client
            .get(self.channel_url(id))
            .send()
            .await
            .map_err(|e| PublishError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::error_for(id, response).await);
        }
        Self::read_channel(response).await
    }

    async fn rename_channel(&self, id: &str, name: &str) -> Result<Channel, PublishError> {
        let response = self
            .client
            .patch(self.channel_url(id))
            .json(&ModifyChannel { name })
            .send()
            .await
            .map_err(|e| PublishError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Self::error_for(id, response).await);
        }
        Self::read_channel(response).await
    }

    fn platform_name(&self) -> &'static str {
        "discord"
    }
}
