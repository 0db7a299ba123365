//! Telegram Bot API transport
//!
//! Long-polls `getUpdates`, turns each `/command` message into a
//! [`CommandContext`] and hands it to [`bot::dispatch`]. Updates are handled
//! one at a time, in the order the platform delivers them.

use crate::bot::{self, BotState, CommandContext, CommandLine};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Pause before polling again after a failed `getUpdates`
const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Telegram rejects messages longer than this many characters
const MAX_MESSAGE_CHARS: usize = 4096;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub username: Option<String>,
}

impl User {
    /// `@username` when set, otherwise the first name.
    pub fn handle(&self) -> Option<String> {
        match &self.username {
            Some(username) => Some(format!("@{}", username)),
            None if !self.first_name.trim().is_empty() => Some(self.first_name.clone()),
            None => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    #[serde(default)]
    pub from: Option<User>,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct TelegramClient {
    http: reqwest::Client,
    /// `{api_base}/bot{token}`; never logged
    endpoint: String,
}

impl std::fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramClient")
            .field("endpoint", &"<REDACTED>")
            .finish()
    }
}

impl TelegramClient {
    pub fn new(api_base: &str, token: &str, poll_timeout_secs: u64) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(poll_timeout_secs + 10))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            http,
            endpoint: format!("{}/bot{}", api_base.trim_end_matches('/'), token),
        })
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, payload: &serde_json::Value) -> Result<T> {
        let resp = self
            .http
            .post(format!("{}/{}", self.endpoint, method))
            .json(payload)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("{} request failed: {}", method, e.without_url()))?;

        let status = resp.status();
        let body = resp.text().await.context("Failed to read response body")?;
        let parsed: ApiResponse<T> = serde_json::from_str(&body)
            .with_context(|| format!("Failed to parse {} response ({})", method, status))?;

        if !parsed.ok {
            anyhow::bail!(
                "Bot API error {} on {}: {}",
                status,
                method,
                parsed.description.unwrap_or_default()
            );
        }
        parsed
            .result
            .with_context(|| format!("{} returned no result", method))
    }

    /// The bot's own account.
    pub async fn get_me(&self) -> Result<User> {
        self.call("getMe", &serde_json::json!({})).await
    }

    /// Long-poll for updates after `offset`.
    pub async fn get_updates(&self, offset: Option<i64>, timeout_secs: u64) -> Result<Vec<Update>> {
        let mut payload = serde_json::json!({
            "timeout": timeout_secs,
            "allowed_updates": ["message"],
        });
        if let Some(offset) = offset {
            payload["offset"] = serde_json::json!(offset);
        }
        self.call("getUpdates", &payload).await
    }

    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        let text: String = text.chars().take(MAX_MESSAGE_CHARS).collect();
        let _: Message = self
            .call(
                "sendMessage",
                &serde_json::json!({
                    "chat_id": chat_id,
                    "text": text,
                    "disable_web_page_preview": true,
                }),
            )
            .await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Command context
// ---------------------------------------------------------------------------

/// One `/command` message, bound to the chat it came from
pub struct TelegramContext<'a> {
    client: &'a TelegramClient,
    chat_id: i64,
    user_id: String,
    handle: Option<String>,
    args: Vec<String>,
}

#[async_trait]
impl CommandContext for TelegramContext<'_> {
    fn user_id(&self) -> &str {
        &self.user_id
    }

    fn handle(&self) -> Option<&str> {
        self.handle.as_deref()
    }

    fn args(&self) -> &[String] {
        &self.args
    }

    async fn reply(&mut self, text: &str) -> Result<()> {
        self.client.send_message(self.chat_id, text).await
    }
}

// ---------------------------------------------------------------------------
// Polling loop
// ---------------------------------------------------------------------------

/// Poll until Ctrl-C, dispatching every command addressed to this bot.
pub async fn run(client: &TelegramClient, state: &BotState, poll_timeout_secs: u64) -> Result<()> {
    let mut offset: Option<i64> = None;
    tracing::info!(bot = %state.settings().username, "Polling for updates");

    loop {
        let polled = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown signal received, stopping");
                return Ok(());
            }
            polled = client.get_updates(offset, poll_timeout_secs) => polled,
        };

        let updates = match polled {
            Ok(updates) => updates,
            Err(e) => {
                tracing::warn!(error = %e, "getUpdates failed");
                tokio::time::sleep(POLL_RETRY_DELAY).await;
                continue;
            }
        };

        for update in updates {
            offset = Some(update.update_id + 1);
            if let Err(e) = handle_update(client, state, update).await {
                tracing::error!(error = %e, "Failed to deliver reply");
            }
        }
    }
}

async fn handle_update(client: &TelegramClient, state: &BotState, update: Update) -> Result<()> {
    let Some((name, mut ctx)) = command_context(client, update, &state.settings().username) else {
        return Ok(());
    };
    bot::dispatch(state, &name, &mut ctx).await
}

/// Command name and context for a `/command` message from a human sender.
fn command_context<'a>(
    client: &'a TelegramClient,
    update: Update,
    bot_username: &str,
) -> Option<(String, TelegramContext<'a>)> {
    let message = update.message?;
    let from = message.from.filter(|user| !user.is_bot)?;
    let line = CommandLine::parse(message.text.as_deref()?)?;
    if !line.is_for(bot_username) {
        return None;
    }

    Some((
        line.name,
        TelegramContext {
            client,
            chat_id: message.chat.id,
            user_id: from.id.to_string(),
            handle: from.handle(),
            args: line.args,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(json: &str) -> Update {
        serde_json::from_str(json).unwrap()
    }

    fn client() -> TelegramClient {
        TelegramClient::new("https://api.telegram.org", "123:secret", 30).unwrap()
    }

    #[test]
    fn test_builds_context_for_command_message() {
        let client = client();
        let update = update(
            r#"{"update_id": 10, "message": {"message_id": 1,
                "from": {"id": 42, "is_bot": false, "first_name": "Ana", "username": "ana"},
                "chat": {"id": 42, "type": "private"}, "text": "/start 7"}}"#,
        );

        let (name, ctx) = command_context(&client, update, "giveaway_bot").unwrap();
        assert_eq!(name, "start");
        assert_eq!(ctx.user_id(), "42");
        assert_eq!(ctx.handle(), Some("@ana"));
        assert_eq!(ctx.args(), ["7".to_string()]);
    }

    #[test]
    fn test_ignores_plain_text_bots_and_other_targets() {
        let client = client();
        let plain = update(
            r#"{"update_id": 1, "message": {"message_id": 1,
                "from": {"id": 1, "is_bot": false, "first_name": "A"},
                "chat": {"id": 1}, "text": "hello"}}"#,
        );
        let from_bot = update(
            r#"{"update_id": 2, "message": {"message_id": 2,
                "from": {"id": 2, "is_bot": true, "first_name": "B"},
                "chat": {"id": 2}, "text": "/top"}}"#,
        );
        let other_bot = update(
            r#"{"update_id": 3, "message": {"message_id": 3,
                "from": {"id": 3, "is_bot": false, "first_name": "C"},
                "chat": {"id": -100}, "text": "/top@someone_else_bot"}}"#,
        );
        let no_message = update(r#"{"update_id": 4}"#);

        for u in [plain, from_bot, other_bot, no_message] {
            assert!(command_context(&client, u, "giveaway_bot").is_none());
        }
    }

    #[test]
    fn test_handle_falls_back_to_first_name() {
        let user = User {
            id: 1,
            is_bot: false,
            first_name: "Ionuț".to_string(),
            username: None,
        };
        assert_eq!(user.handle().as_deref(), Some("Ionuț"));
    }

    #[test]
    fn test_debug_redacts_token() {
        let rendered = format!("{:?}", client());
        assert!(!rendered.contains("secret"));
    }
}
