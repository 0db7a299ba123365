//! Leaderboards and aggregate counts computed from the referral ledger

use crate::ledger::{ReferralLedger, UserId};
use serde::Serialize;
use std::cmp::Reverse;

/// One leaderboard row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankEntry {
    pub user: UserId,
    pub invites: usize,
}

/// Ledger-wide totals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GlobalCounts {
    /// Every referrer and invitee, counted once
    pub total_users: usize,
    /// Sum of invite counts over all referrers
    pub total_invites: usize,
}

/// Referrers with at least one invitee, most invites first.
///
/// `sort_by_key` is stable, so equal counts keep ledger (first-appearance) order.
pub fn ranked(ledger: &ReferralLedger) -> Vec<RankEntry> {
    let mut rows: Vec<RankEntry> = ledger
        .iter()
        .filter(|(_, invitees)| !invitees.is_empty())
        .map(|(user, invitees)| RankEntry {
            user: user.to_string(),
            invites: invitees.len(),
        })
        .collect();
    rows.sort_by_key(|row| Reverse(row.invites));
    rows
}

/// The first `n` rows of the leaderboard.
pub fn top_n(ledger: &ReferralLedger, n: usize) -> Vec<RankEntry> {
    let mut rows = ranked(ledger);
    rows.truncate(n);
    rows
}

/// 1-based leaderboard position of `user`, if they have any invitees.
pub fn rank_of(ledger: &ReferralLedger, user: &str) -> Option<usize> {
    ranked(ledger)
        .iter()
        .position(|row| row.user == user)
        .map(|i| i + 1)
}

pub fn global_counts(ledger: &ReferralLedger) -> GlobalCounts {
    GlobalCounts {
        total_users: ledger.all_known_users().len(),
        total_invites: ledger.iter().map(|(_, invitees)| invitees.len()).sum(),
    }
}
