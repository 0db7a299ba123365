//! invitebot - referral-link giveaway bot
//!
//! Issues every participant a personal invite link, records who invited whom,
//! and reports leaderboards, badge tiers and aggregate counts. All state lives
//! in three JSON documents loaded at startup and rewritten on each change.

pub mod badges;
pub mod bot;
pub mod cli;
pub mod config;
pub mod directory;
pub mod ledger;
pub mod ranking;
pub mod store;
pub mod telegram;
