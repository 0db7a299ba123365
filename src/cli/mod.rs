//! CLI command definitions and handlers

pub mod config;
pub mod report;
pub mod run;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// invitebot - referral-link giveaway bot
///
/// By default, connects to the chat platform and serves commands.
/// The report subcommands read the same data files offline.
#[derive(Parser, Debug)]
#[command(name = "invitebot")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Directory holding referrals.json, display_names.json and badges.json
    #[arg(long, global = true, env = "INVITEBOT_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Bot API token
    #[arg(short, long, global = true, env = "INVITEBOT_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the bot (the default)
    Run,

    /// Show one user's invites, rank, badges and progress
    Stats(StatsArgs),

    /// Print the leaderboard
    Top(TopArgs),

    /// List every known user
    Members,

    /// Print total users and invites
    Global,

    /// Manage configuration
    Config(ConfigArgs),
}

#[derive(Parser, Debug)]
pub struct StatsArgs {
    /// Platform user id
    pub user: String,
}

#[derive(Parser, Debug)]
pub struct TopArgs {
    /// Number of rows (defaults to bot.leaderboard_size)
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
}

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Show current configuration
    #[arg(long)]
    pub show: bool,

    /// Initialize default configuration
    #[arg(long)]
    pub init: bool,

    /// Set a configuration value
    #[arg(long)]
    pub set: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_means_run() {
        let cli = Cli::try_parse_from(["invitebot", "--token", "abc"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.token.as_deref(), Some("abc"));
    }

    #[test]
    fn test_report_subcommands() {
        let cli = Cli::try_parse_from(["invitebot", "top", "-n", "3", "--data-dir", "/tmp/x"]).unwrap();
        match cli.command {
            Some(Command::Top(args)) => assert_eq!(args.limit, Some(3)),
            other => panic!("unexpected command: {other:?}"),
        }
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/x")));

        let cli = Cli::try_parse_from(["invitebot", "stats", "42"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Stats(ref a)) if a.user == "42"));
    }
}
