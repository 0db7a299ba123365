//! Process-wide bot state
//!
//! The three stores are loaded once at startup and shared by handle. Each sits
//! behind its own mutex so that one read-modify-write-persist sequence on a
//! store runs to completion before the next one starts. Handlers lock one
//! store at a time and release it before taking another.

use crate::badges::{BadgeBook, TierTable};
use crate::directory::DisplayNames;
use crate::ledger::ReferralLedger;
use crate::store::StoreError;
use std::path::Path;
use tokio::sync::{Mutex, MutexGuard};

pub const LEDGER_FILE: &str = "referrals.json";
pub const NAMES_FILE: &str = "display_names.json";
pub const BADGES_FILE: &str = "badges.json";

/// Presentation settings fixed at startup
#[derive(Debug, Clone)]
pub struct BotSettings {
    /// Bot username, without the leading `@`
    pub username: String,
    /// Rows shown by `/top`
    pub leaderboard_size: usize,
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            username: "invitebot".to_string(),
            leaderboard_size: 5,
        }
    }
}

#[derive(Debug)]
pub struct BotState {
    ledger: Mutex<ReferralLedger>,
    names: Mutex<DisplayNames>,
    badges: Mutex<BadgeBook>,
    settings: BotSettings,
}

impl BotState {
    /// Load every store from `data_dir`; missing documents start empty.
    pub async fn open(
        data_dir: &Path,
        tiers: TierTable,
        settings: BotSettings,
    ) -> Result<Self, StoreError> {
        let ledger = ReferralLedger::open(data_dir.join(LEDGER_FILE)).await?;
        let names = DisplayNames::open(data_dir.join(NAMES_FILE)).await?;
        let badges = BadgeBook::open(data_dir.join(BADGES_FILE), tiers).await?;

        Ok(Self {
            ledger: Mutex::new(ledger),
            names: Mutex::new(names),
            badges: Mutex::new(badges),
            settings,
        })
    }

    pub fn settings(&self) -> &BotSettings {
        &self.settings
    }

    pub async fn ledger(&self) -> MutexGuard<'_, ReferralLedger> {
        self.ledger.lock().await
    }

    pub async fn names(&self) -> MutexGuard<'_, DisplayNames> {
        self.names.lock().await
    }

    pub async fn badges(&self) -> MutexGuard<'_, BadgeBook> {
        self.badges.lock().await
    }

    /// Deep link that registers the opener as `user`'s invitee.
    pub fn referral_link(&self, user: &str) -> String {
        format!("https://t.me/{}?start={}", self.settings.username, user)
    }
}
