//! Referral ledger
//!
//! The authoritative referrer → invitees record. Invariants:
//! - a user never refers themselves
//! - an invitee has at most one referrer across the whole ledger (first write wins)
//! - edges are never removed
//!
//! The ledger is rewritten to disk after every accepted mutation. A failed
//! write leaves the in-memory ledger exactly as it was before the call.

use crate::store::{JsonDocument, OrderedMap, StoreError};
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;

/// Opaque, platform-assigned account identifier
pub type UserId = String;

/// On-disk shape: referrer id → invitee ids, both in first-seen order
pub type LedgerDocument = OrderedMap<Vec<UserId>>;

/// Result of a referral registration attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferralOutcome {
    /// Edge recorded and persisted
    Accepted,
    /// Referrer and invitee are the same user
    SelfReferral,
    /// Invitee already has a referrer (possibly this one)
    AlreadyReferred,
}

impl ReferralOutcome {
    pub fn is_accepted(self) -> bool {
        matches!(self, ReferralOutcome::Accepted)
    }
}

impl std::fmt::Display for ReferralOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReferralOutcome::Accepted => write!(f, "accepted"),
            ReferralOutcome::SelfReferral => write!(f, "rejected: self-referral"),
            ReferralOutcome::AlreadyReferred => write!(f, "rejected: already referred"),
        }
    }
}

/// In-memory referral graph backed by a JSON document
#[derive(Debug)]
pub struct ReferralLedger {
    entries: LedgerDocument,
    /// invitee → referrer, rebuilt on load
    referred_by: HashMap<UserId, UserId>,
    document: JsonDocument<LedgerDocument>,
}

impl ReferralLedger {
    /// Load the ledger from `path` (empty when the file is absent).
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let document = JsonDocument::new(path);
        let entries: LedgerDocument = document.load().await?;
        let ledger = Self::from_entries(entries, document);
        tracing::info!(
            path = %ledger.document.path().display(),
            referrers = ledger.entries.len(),
            invites = ledger.referred_by.len(),
            "Referral ledger loaded"
        );
        Ok(ledger)
    }

    fn from_entries(entries: LedgerDocument, document: JsonDocument<LedgerDocument>) -> Self {
        // A repeated invitee keeps only its first edge, in the index and in the entries.
        let mut kept = LedgerDocument::new();
        let mut referred_by = HashMap::new();
        for (referrer, invitees) in entries.iter() {
            let mut unique = Vec::with_capacity(invitees.len());
            for invitee in invitees {
                if let Some(first) = referred_by.get(invitee) {
                    tracing::warn!(
                        invitee = %invitee,
                        first_referrer = %first,
                        duplicate_referrer = %referrer,
                        "Invitee listed more than once; keeping the first"
                    );
                    continue;
                }
                referred_by.insert(invitee.clone(), referrer.to_string());
                unique.push(invitee.clone());
            }
            kept.insert(referrer.to_string(), unique);
        }
        Self {
            entries: kept,
            referred_by,
            document,
        }
    }

    /// Decide what `register_referral` would do, without touching anything.
    pub fn check_referral(&self, referrer: &str, invitee: &str) -> ReferralOutcome {
        if referrer == invitee {
            ReferralOutcome::SelfReferral
        } else if self.referred_by.contains_key(invitee) {
            ReferralOutcome::AlreadyReferred
        } else {
            ReferralOutcome::Accepted
        }
    }

    /// Record `referrer` → `invitee`, persisting on acceptance only.
    pub async fn register_referral(
        &mut self,
        referrer: &str,
        invitee: &str,
    ) -> Result<ReferralOutcome, StoreError> {
        let outcome = self.check_referral(referrer, invitee);
        if !outcome.is_accepted() {
            tracing::debug!(referrer = %referrer, invitee = %invitee, %outcome, "Referral rejected");
            return Ok(outcome);
        }

        let mut staged = self.entries.clone();
        staged
            .get_or_insert_with(referrer, Vec::new)
            .push(invitee.to_string());
        self.document.save(&staged).await?;

        self.entries = staged;
        self.referred_by
            .insert(invitee.to_string(), referrer.to_string());
        tracing::info!(referrer = %referrer, invitee = %invitee, "Referral recorded");
        Ok(outcome)
    }

    /// Make `user` a known referrer with no invitees yet.
    ///
    /// Returns `true` when the user was newly added (and the ledger persisted).
    pub async fn ensure_referrer(&mut self, user: &str) -> Result<bool, StoreError> {
        if self.entries.contains_key(user) {
            return Ok(false);
        }

        let mut staged = self.entries.clone();
        staged.insert(user.to_string(), Vec::new());
        self.document.save(&staged).await?;

        self.entries = staged;
        tracing::debug!(user = %user, "Referral link initialized");
        Ok(true)
    }

    /// Invitees of `referrer` in registration order; empty when unknown.
    pub fn invites_of(&self, referrer: &str) -> &[UserId] {
        self.entries
            .get(referrer)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn invite_count(&self, referrer: &str) -> usize {
        self.invites_of(referrer).len()
    }

    /// Who invited `invitee`, if anyone.
    pub fn referrer_of(&self, invitee: &str) -> Option<&str> {
        self.referred_by.get(invitee).map(String::as_str)
    }

    /// Every referrer key and every invitee, including referrers with no invitees.
    pub fn all_known_users(&self) -> BTreeSet<UserId> {
        let mut users: BTreeSet<UserId> = self.entries.keys().map(str::to_string).collect();
        for invitees in self.entries.values() {
            users.extend(invitees.iter().cloned());
        }
        users
    }

    /// Referrers with their invitees, in first-appearance order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[UserId])> {
        self.entries.iter().map(|(k, v)| (k, v.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &LedgerDocument {
        &self.entries
    }
}
