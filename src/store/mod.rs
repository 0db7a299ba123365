//! Flat-file JSON persistence
//!
//! Every logical table (referrals, display names, badges) lives in its own
//! pretty-printed JSON document. Documents are read fully into memory at
//! startup and rewritten fully after each mutation:
//! - a missing file loads as the empty value
//! - writes go to a `.tmp` sibling first and are renamed into place

pub mod ordered;

pub use ordered::OrderedMap;

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;

/// Errors raised while reading or writing a document
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode {}: {source}", path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Handle on one JSON document holding a `T`.
///
/// The handle carries no data itself; callers own the in-memory value and
/// hand it back to [`JsonDocument::save`] after every mutation.
pub struct JsonDocument<T> {
    path: PathBuf,
    _marker: PhantomData<fn() -> T>,
}

impl<T> std::fmt::Debug for JsonDocument<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonDocument")
            .field("path", &self.path)
            .finish()
    }
}

impl<T> Clone for JsonDocument<T> {
    fn clone(&self) -> Self {
        Self::new(self.path.clone())
    }
}

impl<T> JsonDocument<T> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<T> JsonDocument<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    /// Read the document, or `T::default()` when the file does not exist yet.
    pub async fn load(&self) -> Result<T, StoreError> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "Document missing, starting empty");
                return Ok(T::default());
            }
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        if content.trim().is_empty() {
            return Ok(T::default());
        }

        serde_json::from_str(&content).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    /// Rewrite the whole document (atomic: tmp + rename).
    pub async fn save(&self, value: &T) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(value).map_err(|source| StoreError::Encode {
            path: self.path.clone(),
            source,
        })?;

        let write_err = |source: std::io::Error| StoreError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await.map_err(write_err)?;
        }

        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, json.as_bytes())
            .await
            .map_err(write_err)?;
        fs::rename(&tmp_path, &self.path)
            .await
            .map_err(write_err)?;

        tracing::debug!(path = %self.path.display(), bytes = json.len(), "Document saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_missing_file_loads_empty() {
        let dir = tempdir().unwrap();
        let doc: JsonDocument<OrderedMap<Vec<String>>> =
            JsonDocument::new(dir.path().join("referrals.json"));

        let loaded = doc.load().await.unwrap();
        assert!(loaded.is_empty());
    }

    #[tokio::test]
    async fn test_save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let doc = JsonDocument::new(dir.path().join("nested").join("names.json"));

        let mut names = OrderedMap::new();
        names.insert("42".to_string(), "Ștefan".to_string());
        names.insert("7".to_string(), "bob".to_string());
        doc.save(&names).await.unwrap();

        let loaded: OrderedMap<String> = doc.load().await.unwrap();
        assert_eq!(loaded, names);
    }

    #[tokio::test]
    async fn test_saved_file_is_pretty_and_keeps_non_ascii() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("names.json");
        let doc = JsonDocument::new(&path);

        let mut names = OrderedMap::new();
        names.insert("1".to_string(), "Ionuț".to_string());
        doc.save(&names).await.unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("Ionuț"));
        assert!(raw.contains('\n'));
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_malformed_file_is_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("badges.json");
        std::fs::write(&path, "{ not json").unwrap();

        let doc: JsonDocument<OrderedMap<Vec<String>>> = JsonDocument::new(&path);
        let err = doc.load().await.unwrap_err();
        assert!(matches!(err, StoreError::Parse { .. }));
    }

    #[tokio::test]
    async fn test_empty_file_loads_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("referrals.json");
        std::fs::write(&path, "  \n").unwrap();

        let doc: JsonDocument<OrderedMap<Vec<String>>> = JsonDocument::new(&path);
        assert!(doc.load().await.unwrap().is_empty());
    }
}
