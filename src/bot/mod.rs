//! Command surface
//!
//! Transports hand every inbound command to [`dispatch`] through the narrow
//! [`CommandContext`] seam: who sent it, its arguments, and a way to reply.
//! Nothing in here knows which chat platform is on the other end.

pub mod replies;
pub mod state;

pub use state::{BotSettings, BotState};

use crate::directory::normalize_display_name;
use crate::ledger::ReferralOutcome;
use crate::ranking;
use anyhow::Result;
use async_trait::async_trait;

/// One inbound command invocation, as seen by the core
#[async_trait]
pub trait CommandContext: Send {
    /// Stable platform account id of the sender
    fn user_id(&self) -> &str;

    /// Platform handle, used as the default display name
    fn handle(&self) -> Option<&str>;

    /// Positional arguments after the command name
    fn args(&self) -> &[String];

    /// Send plain text back to where the command came from
    async fn reply(&mut self, text: &str) -> Result<()>;
}

/// Commands understood by the bot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start { referrer: Option<String> },
    Stats,
    Top,
    Members,
    Global,
    Badges,
    Name { nickname: Option<String> },
    Help,
    Unknown(String),
}

impl Command {
    pub fn parse(name: &str, args: &[String]) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "start" => Command::Start {
                referrer: args
                    .first()
                    .map(|a| a.trim())
                    .filter(|a| !a.is_empty())
                    .map(str::to_string),
            },
            "stats" | "me" => Command::Stats,
            "top" | "leaderboard" => Command::Top,
            "members" | "membri" => Command::Members,
            "global" => Command::Global,
            "badges" | "prizes" => Command::Badges,
            "name" | "rename" => Command::Name {
                nickname: normalize_display_name(&args.join(" ")),
            },
            "help" => Command::Help,
            other => Command::Unknown(other.to_string()),
        }
    }
}

/// A chat line split into its command parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub name: String,
    /// Bot addressed with `/cmd@bot`, if any
    pub target: Option<String>,
    pub args: Vec<String>,
}

impl CommandLine {
    /// Parse `/name[@bot] arg...`; `None` for text that is not a command.
    pub fn parse(text: &str) -> Option<Self> {
        let mut words = text.split_whitespace();
        let head = words.next()?.strip_prefix('/')?;
        let (name, target) = match head.split_once('@') {
            Some((name, bot)) => (name, Some(bot.to_string())),
            None => (head, None),
        };
        if name.is_empty() {
            return None;
        }
        Some(Self {
            name: name.to_string(),
            target,
            args: words.map(str::to_string).collect(),
        })
    }

    /// Whether this command is meant for the bot called `username`.
    pub fn is_for(&self, username: &str) -> bool {
        self.target
            .as_deref()
            .is_none_or(|t| t.eq_ignore_ascii_case(username))
    }
}

/// Run `command_name` for the sender in `ctx` and deliver the reply.
///
/// Storage failures are logged and answered with a generic notice; only a
/// failure to deliver the reply itself is returned to the transport.
pub async fn dispatch(
    state: &BotState,
    command_name: &str,
    ctx: &mut dyn CommandContext,
) -> Result<()> {
    let command = Command::parse(command_name, ctx.args());
    let user = ctx.user_id().to_string();
    let handle = ctx.handle().map(str::to_string);

    tracing::debug!(user = %user, command = ?command, "Handling command");
    let text = match execute(state, &command, &user, handle.as_deref()).await {
        Ok(text) => text,
        Err(e) => {
            tracing::error!(user = %user, command = ?command, error = %e, "Command failed");
            replies::FAILURE_NOTICE.to_string()
        }
    };
    ctx.reply(&text).await
}

/// Run a parsed command and render its reply text.
pub async fn execute(
    state: &BotState,
    command: &Command,
    user: &str,
    handle: Option<&str>,
) -> Result<String> {
    match command {
        Command::Start { referrer } => start(state, user, handle, referrer.as_deref()).await,
        Command::Stats => stats(state, user, true).await,
        Command::Top => top(state).await,
        Command::Members => members(state).await,
        Command::Global => {
            let counts = ranking::global_counts(&*state.ledger().await);
            Ok(replies::global(&counts))
        }
        Command::Badges => badges(state, user).await,
        Command::Name { nickname } => rename(state, user, nickname.as_deref()).await,
        Command::Help | Command::Unknown(_) => Ok(replies::help()),
    }
}

async fn start(
    state: &BotState,
    user: &str,
    handle: Option<&str>,
    referrer: Option<&str>,
) -> Result<String> {
    let user_id = user.to_string();
    if let Some(handle) = handle {
        state.names().await.record_contact(&user_id, handle).await?;
    }

    let referral = {
        let mut ledger = state.ledger().await;
        ledger.ensure_referrer(user).await?;
        match referrer {
            Some(referrer) => {
                let outcome = ledger.register_referral(referrer, user).await?;
                Some((outcome, referrer.to_string(), ledger.invite_count(referrer)))
            }
            None => None,
        }
    };

    if let Some((ReferralOutcome::Accepted, referrer, count)) = &referral {
        let awarded = state
            .badges()
            .await
            .evaluate_and_award(referrer, *count)
            .await?;
        if !awarded.is_empty() {
            tracing::info!(referrer = %referrer, badges = ?awarded, "Referrer reached a new tier");
        }
    }

    let link = state.referral_link(user);
    let names = state.names().await;
    Ok(match &referral {
        Some((outcome, referrer, _)) => {
            replies::welcome(&link, Some((*outcome, names.label(referrer))))
        }
        None => replies::welcome(&link, None),
    })
}

/// The `/stats` reply as currently recorded, without awarding any badge.
pub async fn stats_snapshot(state: &BotState, user: &str) -> Result<String> {
    stats(state, user, false).await
}

async fn stats(state: &BotState, user: &str, award: bool) -> Result<String> {
    let (invitees, rank) = {
        let ledger = state.ledger().await;
        (ledger.invites_of(user).to_vec(), ranking::rank_of(&ledger, user))
    };

    let (newly_awarded, held, progress) = {
        let mut book = state.badges().await;
        let newly = if award {
            book.evaluate_and_award(&user.to_string(), invitees.len())
                .await?
        } else {
            Vec::new()
        };
        (
            newly,
            book.badges_of(user).to_vec(),
            book.table().progress_message(invitees.len()),
        )
    };

    let names = state.names().await;
    Ok(replies::stats(&replies::StatsView {
        invitees: invitees.iter().map(|id| names.label(id)).collect(),
        rank,
        badges: &held,
        newly_awarded: &newly_awarded,
        progress,
    }))
}

async fn top(state: &BotState) -> Result<String> {
    let rows = {
        let ledger = state.ledger().await;
        ranking::top_n(&ledger, state.settings().leaderboard_size)
    };

    let names = state.names().await;
    let labelled: Vec<(&str, usize)> = rows
        .iter()
        .map(|row| (names.label(&row.user), row.invites))
        .collect();
    Ok(replies::leaderboard(&labelled))
}

async fn members(state: &BotState) -> Result<String> {
    let users = state.ledger().await.all_known_users();

    let names = state.names().await;
    let labelled: Vec<(&str, &str)> = users
        .iter()
        .map(|id| (names.label(id), id.as_str()))
        .collect();
    Ok(replies::members(&labelled))
}

async fn badges(state: &BotState, user: &str) -> Result<String> {
    let count = state.ledger().await.invite_count(user);
    let book = state.badges().await;
    let table = book.table();
    Ok(replies::badges(
        table.tiers(),
        book.badges_of(user),
        &table.progress_message(count),
    ))
}

async fn rename(state: &BotState, user: &str, nickname: Option<&str>) -> Result<String> {
    let Some(nickname) = nickname else {
        return Ok(replies::NAME_USAGE.to_string());
    };
    state
        .names()
        .await
        .set_display_name(&user.to_string(), nickname)
        .await?;
    Ok(replies::renamed(nickname))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_parse_start_with_and_without_referrer() {
        assert_eq!(
            Command::parse("start", &args(&["123"])),
            Command::Start {
                referrer: Some("123".to_string())
            }
        );
        assert_eq!(
            Command::parse("start", &[]),
            Command::Start { referrer: None }
        );
    }

    #[test]
    fn test_parse_aliases_and_unknown() {
        assert_eq!(Command::parse("membri", &[]), Command::Members);
        assert_eq!(Command::parse("TOP", &[]), Command::Top);
        assert_eq!(
            Command::parse("dance", &[]),
            Command::Unknown("dance".to_string())
        );
    }

    #[test]
    fn test_parse_name_joins_words() {
        assert_eq!(
            Command::parse("name", &args(&["Big", "Winner"])),
            Command::Name {
                nickname: Some("Big Winner".to_string())
            }
        );
        assert_eq!(
            Command::parse("name", &[]),
            Command::Name { nickname: None }
        );
    }

    #[test]
    fn test_command_line_parsing() {
        let line = CommandLine::parse("/start@giveaway_bot 42").unwrap();
        assert_eq!(line.name, "start");
        assert_eq!(line.target.as_deref(), Some("giveaway_bot"));
        assert_eq!(line.args, vec!["42"]);
        assert!(line.is_for("Giveaway_Bot"));
        assert!(!line.is_for("other_bot"));

        let plain = CommandLine::parse("/top").unwrap();
        assert!(plain.args.is_empty());
        assert!(plain.is_for("anything"));

        assert!(CommandLine::parse("hello /start").is_none());
        assert!(CommandLine::parse("/").is_none());
        assert!(CommandLine::parse("").is_none());
    }
}
