//! Plain-text replies
//!
//! Rendering only: every function here takes already-resolved data and
//! returns the text sent back to the user.

use crate::badges::{BadgeId, Tier};
use crate::ledger::ReferralOutcome;
use crate::ranking::GlobalCounts;

pub const FAILURE_NOTICE: &str = "⚠️ Something went wrong on our side. Please try again later.";

pub const NO_LEADERBOARD_DATA: &str = "🏆 No invite data yet.";

pub const NO_MEMBERS: &str = "🤷 No users in the database yet.";

pub const NAME_USAGE: &str = "Usage: /name <nickname>";

fn plural(count: usize, one: &str, many: &str) -> String {
    if count == 1 {
        format!("{} {}", count, one)
    } else {
        format!("{} {}", count, many)
    }
}

pub fn help() -> String {
    [
        "Available commands:",
        "/start - get your personal giveaway link",
        "/stats - how many friends you brought, your rank and badges",
        "/top - leaderboard by invites",
        "/members - everyone who generated a link or joined through one",
        "/global - total users and invites",
        "/badges - prize tiers and which ones you hold",
        "/name <nickname> - change how you appear on the leaderboard",
        "/help - show this list",
    ]
    .join("\n")
}

/// Reply to `/start`.
///
/// `referral` is `None` when the user opened the bot without a link.
pub fn welcome(link: &str, referral: Option<(ReferralOutcome, &str)>) -> String {
    let mut text = String::new();
    match referral {
        Some((ReferralOutcome::Accepted, referrer)) => {
            text.push_str(&format!("🤝 You joined through {}'s link.\n", referrer));
        }
        Some((ReferralOutcome::SelfReferral, _)) => {
            text.push_str("ℹ️ That is your own link, it does not count as an invite.\n");
        }
        Some((ReferralOutcome::AlreadyReferred, _)) => {
            text.push_str("ℹ️ You were already invited by someone, so this link was not counted.\n");
        }
        None => {}
    }
    text.push_str(&format!(
        "👋 Hi! Your unique giveaway link:\n{}\nShare it with friends to climb the leaderboard and win prizes!",
        link
    ));
    text
}

/// Summary shown by `/stats`.
pub struct StatsView<'a> {
    pub invitees: Vec<&'a str>,
    pub rank: Option<usize>,
    pub badges: &'a [BadgeId],
    pub newly_awarded: &'a [BadgeId],
    pub progress: String,
}

pub fn stats(view: &StatsView<'_>) -> String {
    let mut lines = Vec::new();
    if view.invitees.is_empty() {
        lines.push("📊 You have not brought any friends yet.".to_string());
    } else {
        lines.push(format!(
            "📊 You brought {}:",
            plural(view.invitees.len(), "friend", "friends")
        ));
        lines.extend(view.invitees.iter().map(|name| format!("- {}", name)));
    }
    if let Some(rank) = view.rank {
        lines.push(format!("🏅 Leaderboard position: #{}", rank));
    }
    if !view.newly_awarded.is_empty() {
        lines.push(format!("🎉 New badges: {}", view.newly_awarded.join(", ")));
    }
    if !view.badges.is_empty() {
        lines.push(format!("🎖 Badges: {}", view.badges.join(", ")));
    }
    lines.push(format!("➡️ Progress: {}", view.progress));
    lines.join("\n")
}

pub fn leaderboard(rows: &[(&str, usize)]) -> String {
    if rows.is_empty() {
        return NO_LEADERBOARD_DATA.to_string();
    }
    let mut text = format!("🏆 Top {} by invites:", plural(rows.len(), "user", "users"));
    for (i, (name, invites)) in rows.iter().enumerate() {
        text.push_str(&format!(
            "\n{}. {} - {}",
            i + 1,
            name,
            plural(*invites, "invite", "invites")
        ));
    }
    text
}

/// `(label, id)` pairs; the id is shown only when it differs from the label.
pub fn members(users: &[(&str, &str)]) -> String {
    if users.is_empty() {
        return NO_MEMBERS.to_string();
    }
    let mut text = format!(
        "👥 All {} who generated or used a link:",
        plural(users.len(), "user", "users")
    );
    for (label, id) in users {
        if label == id {
            text.push_str(&format!("\n{}", id));
        } else {
            text.push_str(&format!("\n{} ({})", label, id));
        }
    }
    text
}

pub fn global(counts: &GlobalCounts) -> String {
    format!(
        "🌍 {}, {} recorded.",
        plural(counts.total_users, "user", "users"),
        plural(counts.total_invites, "invite", "invites")
    )
}

pub fn badges(tiers: &[Tier], held: &[BadgeId], progress: &str) -> String {
    let mut text = "🎁 Prize tiers:".to_string();
    for tier in tiers {
        let mark = if held.contains(&tier.badge) { "✅" } else { "▫️" };
        text.push_str(&format!(
            "\n{} {} - {} invites",
            mark, tier.badge, tier.threshold
        ));
        if !tier.reward.is_empty() {
            text.push_str(&format!(": {}", tier.reward));
        }
    }
    text.push_str(&format!("\n➡️ Progress: {}", progress));
    text
}

pub fn renamed(name: &str) -> String {
    format!("✏️ You will now appear as {}.", name)
}
