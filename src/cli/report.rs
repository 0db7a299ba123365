//! Offline reports
//!
//! Renders the bot's own replies from the data directory and prints them, so
//! operators see exactly what users would. Reports never write to the data
//! files, and any failure is returned to the caller.

use super::{StatsArgs, TopArgs};
use crate::bot::{self, BotSettings, BotState, Command};
use crate::config::Config;
use anyhow::{Context, Result};

/// Id reports run as when no user is involved
const CONSOLE_USER: &str = "console";

async fn open_state(config: &Config, leaderboard_size: Option<usize>) -> Result<BotState> {
    let settings = BotSettings {
        username: config
            .bot
            .username
            .clone()
            .unwrap_or_else(|| BotSettings::default().username),
        leaderboard_size: leaderboard_size.unwrap_or(config.bot.leaderboard_size),
    };
    let data_dir = config.data_dir();
    BotState::open(&data_dir, config.tier_table()?, settings)
        .await
        .with_context(|| format!("Failed to load data from {}", data_dir.display()))
}

async fn render(state: &BotState, command: Command) -> Result<String> {
    bot::execute(state, &command, CONSOLE_USER, None)
        .await
        .with_context(|| format!("Failed to render {:?} report", command))
}

pub async fn stats(config: Config, args: StatsArgs) -> Result<()> {
    let state = open_state(&config, None).await?;
    let text = bot::stats_snapshot(&state, &args.user)
        .await
        .with_context(|| format!("Failed to render stats for {}", args.user))?;
    println!("{}", text);
    Ok(())
}

pub async fn top(config: Config, args: TopArgs) -> Result<()> {
    let state = open_state(&config, args.limit).await?;
    println!("{}", render(&state, Command::Top).await?);
    Ok(())
}

pub async fn members(config: Config) -> Result<()> {
    let state = open_state(&config, None).await?;
    println!("{}", render(&state, Command::Members).await?);
    Ok(())
}

pub async fn global(config: Config) -> Result<()> {
    let state = open_state(&config, None).await?;
    println!("{}", render(&state, Command::Global).await?);
    Ok(())
}
