//! Badge and prize tiers
//!
//! A [`TierTable`] maps invite-count thresholds to badges and reward
//! descriptions. [`BadgeBook`] keeps the badges each user has been awarded;
//! awards are never revoked, even when the tier table changes later.

use crate::ledger::UserId;
use crate::store::{JsonDocument, OrderedMap, StoreError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use thiserror::Error;

pub type BadgeId = String;

/// On-disk shape: user id → awarded badge ids
pub type BadgeDocument = OrderedMap<Vec<BadgeId>>;

/// One rung of the prize ladder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tier {
    /// Invites needed to unlock this tier
    pub threshold: usize,

    /// Stable badge identifier stored in the badge record
    pub badge: BadgeId,

    /// What the badge wins
    #[serde(default)]
    pub reward: String,
}

impl Tier {
    pub fn new(threshold: usize, badge: impl Into<String>, reward: impl Into<String>) -> Self {
        Self {
            threshold,
            badge: badge.into(),
            reward: reward.into(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TierError {
    #[error("tier table must contain at least one tier")]
    Empty,

    #[error("tier '{0}' has a zero threshold")]
    ZeroThreshold(BadgeId),

    #[error("tier thresholds must be strictly increasing ({previous} then {next})")]
    NotIncreasing { previous: usize, next: usize },

    #[error("badge id must not be empty")]
    EmptyBadgeId,

    #[error("badge id '{0}' is used by more than one tier")]
    DuplicateBadge(BadgeId),
}

/// Validated tier ladder, thresholds strictly increasing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierTable {
    tiers: Vec<Tier>,
}

impl Default for TierTable {
    fn default() -> Self {
        Self {
            tiers: default_tiers(),
        }
    }
}

/// The stock ladder: 5, 15 and 50 invites.
pub fn default_tiers() -> Vec<Tier> {
    vec![
        Tier::new(5, "bronze", "Entry into the weekly prize draw"),
        Tier::new(15, "silver", "Giveaway merch pack"),
        Tier::new(50, "gold", "Grand prize draw entry"),
    ]
}

impl TierTable {
    pub fn new(tiers: Vec<Tier>) -> Result<Self, TierError> {
        if tiers.is_empty() {
            return Err(TierError::Empty);
        }

        let mut seen = HashSet::new();
        for (i, tier) in tiers.iter().enumerate() {
            if tier.badge.trim().is_empty() {
                return Err(TierError::EmptyBadgeId);
            }
            if tier.threshold == 0 {
                return Err(TierError::ZeroThreshold(tier.badge.clone()));
            }
            if i > 0 && tiers[i - 1].threshold >= tier.threshold {
                return Err(TierError::NotIncreasing {
                    previous: tiers[i - 1].threshold,
                    next: tier.threshold,
                });
            }
            if !seen.insert(tier.badge.as_str()) {
                return Err(TierError::DuplicateBadge(tier.badge.clone()));
            }
        }

        Ok(Self { tiers })
    }

    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    /// Tiers unlocked at `invite_count`, lowest threshold first.
    pub fn reached(&self, invite_count: usize) -> impl Iterator<Item = &Tier> {
        self.tiers
            .iter()
            .take_while(move |t| t.threshold <= invite_count)
    }

    /// Lowest tier whose threshold is strictly above `invite_count`.
    pub fn next_tier(&self, invite_count: usize) -> Option<&Tier> {
        self.tiers.iter().find(|t| t.threshold > invite_count)
    }

    pub fn progress_message(&self, invite_count: usize) -> String {
        match self.next_tier(invite_count) {
            Some(tier) => format!(
                "{} of {} invites toward {}",
                invite_count, tier.threshold, tier.badge
            ),
            None => "all tiers reached".to_string(),
        }
    }

    pub fn find(&self, badge: &str) -> Option<&Tier> {
        self.tiers.iter().find(|t| t.badge == badge)
    }
}

/// Badge awards per user, persisted after every new award
#[derive(Debug)]
pub struct BadgeBook {
    records: BadgeDocument,
    table: TierTable,
    document: JsonDocument<BadgeDocument>,
}

impl BadgeBook {
    pub async fn open(path: impl Into<PathBuf>, table: TierTable) -> Result<Self, StoreError> {
        let document = JsonDocument::new(path);
        let records: BadgeDocument = document.load().await?;
        tracing::info!(
            path = %document.path().display(),
            users = records.len(),
            tiers = table.tiers().len(),
            "Badge records loaded"
        );
        Ok(Self {
            records,
            table,
            document,
        })
    }

    pub fn table(&self) -> &TierTable {
        &self.table
    }

    pub fn badges_of(&self, user: &str) -> &[BadgeId] {
        self.records
            .get(user)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn has_badge(&self, user: &str, badge: &str) -> bool {
        self.badges_of(user).iter().any(|b| b == badge)
    }

    /// Award every reached tier `user` does not hold yet.
    ///
    /// Returns the newly awarded badges in ascending threshold order; the
    /// record is persisted only when that list is non-empty.
    pub async fn evaluate_and_award(
        &mut self,
        user: &UserId,
        invite_count: usize,
    ) -> Result<Vec<BadgeId>, StoreError> {
        let awarded: Vec<BadgeId> = self
            .table
            .reached(invite_count)
            .filter(|tier| !self.has_badge(user, &tier.badge))
            .map(|tier| tier.badge.clone())
            .collect();

        if awarded.is_empty() {
            return Ok(awarded);
        }

        let mut staged = self.records.clone();
        staged
            .get_or_insert_with(user, Vec::new)
            .extend(awarded.iter().cloned());
        self.document.save(&staged).await?;
        self.records = staged;

        tracing::info!(user = %user, invites = invite_count, badges = ?awarded, "Badges awarded");
        Ok(awarded)
    }

    pub fn records(&self) -> &BadgeDocument {
        &self.records
    }
}
