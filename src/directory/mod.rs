//! Display-name directory: user id → human-readable label

use crate::ledger::UserId;
use crate::store::{JsonDocument, OrderedMap, StoreError};
use std::path::PathBuf;

/// On-disk shape: user id → display name
pub type NameDocument = OrderedMap<String>;

/// Longest nickname accepted by an explicit rename, in characters
pub const MAX_DISPLAY_NAME_CHARS: usize = 64;

#[derive(Debug)]
pub struct DisplayNames {
    names: NameDocument,
    document: JsonDocument<NameDocument>,
}

impl DisplayNames {
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let document = JsonDocument::new(path);
        let names: NameDocument = document.load().await?;
        tracing::info!(path = %document.path().display(), users = names.len(), "Display names loaded");
        Ok(Self { names, document })
    }

    /// Stored name for `user`, otherwise `fallback`.
    pub fn resolve<'a>(&'a self, user: &str, fallback: &'a str) -> &'a str {
        self.names.get(user).map(String::as_str).unwrap_or(fallback)
    }

    /// Stored name for `user`, otherwise the raw id.
    pub fn label<'a>(&'a self, user: &'a str) -> &'a str {
        self.resolve(user, user)
    }

    pub fn get(&self, user: &str) -> Option<&str> {
        self.names.get(user).map(String::as_str)
    }

    /// Overwrite `user`'s name and persist. Names need not be unique.
    pub async fn set_display_name(
        &mut self,
        user: &UserId,
        name: impl Into<String>,
    ) -> Result<(), StoreError> {
        let name = name.into();
        let mut staged = self.names.clone();
        staged.insert(user.clone(), name.clone());
        self.document.save(&staged).await?;
        self.names = staged;

        tracing::info!(user = %user, name = %name, "Display name set");
        Ok(())
    }

    /// First-contact registration: store `handle` only when `user` has no name yet.
    ///
    /// Returns `true` when a name was stored.
    pub async fn record_contact(&mut self, user: &UserId, handle: &str) -> Result<bool, StoreError> {
        if self.names.contains_key(user) || handle.trim().is_empty() {
            return Ok(false);
        }
        self.set_display_name(user, handle).await?;
        Ok(true)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Trim and bound a user-supplied nickname; `None` if nothing usable remains.
pub fn normalize_display_name(raw: &str) -> Option<String> {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return None;
    }
    Some(collapsed.chars().take(MAX_DISPLAY_NAME_CHARS).collect())
}
