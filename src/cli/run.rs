//! Bot mode: connect to the platform and serve commands until interrupted

use crate::bot::{BotSettings, BotState};
use crate::config::{Config, require_token};
use crate::telegram::{self, TelegramClient};
use anyhow::{Context, Result};

pub async fn execute(config: Config, token: Option<String>) -> Result<()> {
    let token = match require_token(token.as_deref()) {
        Ok(token) => token,
        Err(e) => {
            tracing::error!(error = %e, "Refusing to start");
            return Err(e.into());
        }
    };
    let tiers = config.tier_table()?;

    let client = TelegramClient::new(&config.bot.api_base, &token, config.bot.poll_timeout_secs)?;
    let username = match &config.bot.username {
        Some(username) => username.clone(),
        None => client
            .get_me()
            .await
            .context("Failed to reach the Bot API")?
            .username
            .context("Bot account has no username; set bot.username")?,
    };

    let data_dir = config.data_dir();
    let settings = BotSettings {
        username,
        leaderboard_size: config.bot.leaderboard_size,
    };
    let state = BotState::open(&data_dir, tiers, settings)
        .await
        .context("Failed to load bot data")?;

    tracing::info!(
        bot = %state.settings().username,
        data_dir = %data_dir.display(),
        "Bot starting"
    );
    telegram::run(&client, &state, config.bot.poll_timeout_secs).await
}
