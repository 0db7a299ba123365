//! invitebot - referral-link giveaway bot
//!
//! By default, long-polls the Bot API and answers commands.
//! Use the report subcommands (`stats`, `top`, `members`, `global`) to inspect
//! the data files offline.
//!
//! The bot token is read from INVITEBOT_TOKEN (or --token) and nowhere else.

use clap::Parser;
use invitebot::cli::{self, Cli, Command};
use invitebot::config::Config;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let data_dir = cli.data_dir;

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => cli::run::execute(load_config(data_dir).await?, cli.token).await,
        Command::Stats(args) => cli::report::stats(load_config(data_dir).await?, args).await,
        Command::Top(args) => cli::report::top(load_config(data_dir).await?, args).await,
        Command::Members => cli::report::members(load_config(data_dir).await?).await,
        Command::Global => cli::report::global(load_config(data_dir).await?).await,
        Command::Config(args) => cli::config::execute(args).await,
    }
}

/// Layered config, with `--data-dir` taking precedence over every file
async fn load_config(data_dir: Option<PathBuf>) -> anyhow::Result<Config> {
    let mut config = Config::load().await?;
    if let Some(dir) = data_dir {
        config.storage.data_dir = Some(dir);
    }
    Ok(config)
}
