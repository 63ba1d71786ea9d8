//! Data-source selection store.
//!
//! Reviews come either from the scraping pipeline (`parsing`) or from JSON
//! uploads (`uploading`). The selection is sent as the `source` query
//! parameter on every metric request.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::error::{Error, Result};
use crate::filter::{read_optional, write_json};

/// Storage key (and file stem) of the persisted source selection.
pub const SOURCE_STORAGE_KEY: &str = "data-source-v1";

/// Origin of review data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceValue {
    /// Reviews collected by the scraping pipeline.
    Parsing,
    /// Reviews uploaded as JSON.
    Uploading,
}

impl SourceValue {
    /// Both sources, the default selection.
    pub const ALL: [SourceValue; 2] = [SourceValue::Parsing, SourceValue::Uploading];

    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            SourceValue::Parsing => "parsing",
            SourceValue::Uploading => "uploading",
        }
    }
}

impl fmt::Display for SourceValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceValue {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "parsing" => Ok(SourceValue::Parsing),
            "uploading" => Ok(SourceValue::Uploading),
            other => Err(Error::validation_field(
                "source",
                format!("unknown source '{other}'"),
            )),
        }
    }
}

/// Current source selection plus metadata about the last upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceState {
    /// Selected sources; never empty.
    pub sources: Vec<SourceValue>,
    /// Number of items in the last upload.
    #[serde(default)]
    pub last_upload_count: Option<usize>,
    /// When the last upload finished.
    #[serde(default)]
    pub last_upload_at: Option<DateTime<Utc>>,
}

impl Default for SourceState {
    fn default() -> Self {
        Self {
            sources: SourceValue::ALL.to_vec(),
            last_upload_count: None,
            last_upload_at: None,
        }
    }
}

/// Thread-safe handle to the source selection (Arc internals).
#[derive(Clone)]
pub struct SourceStore {
    inner: Arc<watch::Sender<SourceState>>,
}

impl SourceStore {
    /// Creates a store selecting both sources.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SourceState::default());
        Self { inner: Arc::new(tx) }
    }

    /// Current state.
    pub fn snapshot(&self) -> SourceState {
        self.inner.borrow().clone()
    }

    /// Selected sources.
    pub fn sources(&self) -> Vec<SourceValue> {
        self.inner.borrow().sources.clone()
    }

    /// Subscribe to selection changes.
    pub fn subscribe(&self) -> watch::Receiver<SourceState> {
        self.inner.subscribe()
    }

    /// Replaces the selection; an empty selection means both sources.
    pub fn set_sources(&self, sources: Vec<SourceValue>) {
        let sources = normalize_sources(sources);
        log::debug!("Sources → {sources:?}");
        self.inner.send_modify(|state| state.sources = sources);
    }

    /// Adds a source to the selection if it is not already present.
    pub fn add_source(&self, source: SourceValue) {
        self.inner.send_if_modified(|state| {
            if state.sources.contains(&source) {
                return false;
            }
            state.sources.push(source);
            true
        });
    }

    /// Records the size and time of a finished upload.
    pub fn set_last_upload_meta(&self, count: usize) {
        self.inner.send_modify(|state| {
            state.last_upload_count = Some(count);
            state.last_upload_at = Some(Utc::now());
        });
    }

    /// Forgets the last upload.
    pub fn reset_upload_meta(&self) {
        self.inner.send_modify(|state| {
            state.last_upload_count = None;
            state.last_upload_at = None;
        });
    }

    /// Location of the persisted state inside `dir`.
    pub fn storage_path(dir: &Path) -> PathBuf {
        dir.join(format!("{SOURCE_STORAGE_KEY}.json"))
    }

    /// Writes the current state to `dir`.
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        let path = Self::storage_path(dir);
        write_json(&path, &self.snapshot())?;
        Ok(path)
    }

    /// Loads persisted state from `dir`.
    ///
    /// A missing file keeps the current state; a file that cannot be read
    /// or parsed resets to both sources with no upload recorded.
    pub fn hydrate(&self, dir: &Path) -> Result<()> {
        let path = Self::storage_path(dir);
        let state = match read_optional(&path) {
            Ok(None) => return Ok(()),
            Ok(Some(raw)) => serde_json::from_str::<SourceState>(&raw).unwrap_or_else(|e| {
                log::warn!("Ignoring unreadable sources at {}: {e}", path.display());
                SourceState::default()
            }),
            Err(e) => {
                log::warn!("Ignoring unreadable sources: {e}");
                SourceState::default()
            }
        };
        let sources = normalize_sources(state.sources);
        self.inner.send_replace(SourceState { sources, ..state });
        Ok(())
    }
}

impl Default for SourceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SourceStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SourceStore").field(&*self.inner.borrow()).finish()
    }
}

fn normalize_sources(sources: Vec<SourceValue>) -> Vec<SourceValue> {
    let mut unique = Vec::with_capacity(sources.len());
    for source in sources {
        if !unique.contains(&source) {
            unique.push(source);
        }
    }
    if unique.is_empty() {
        SourceValue::ALL.to_vec()
    } else {
        unique
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_to_both_sources() {
        let store = SourceStore::new();
        assert_eq!(store.sources(), SourceValue::ALL.to_vec());
    }

    #[test]
    fn test_empty_selection_falls_back() {
        let store = SourceStore::new();
        store.set_sources(vec![SourceValue::Uploading]);
        assert_eq!(store.sources(), vec![SourceValue::Uploading]);
        store.set_sources(Vec::new());
        assert_eq!(store.sources(), SourceValue::ALL.to_vec());
    }

    #[test]
    fn test_add_source_is_idempotent() {
        let store = SourceStore::new();
        store.set_sources(vec![SourceValue::Parsing]);
        store.add_source(SourceValue::Uploading);
        store.add_source(SourceValue::Uploading);
        assert_eq!(store.sources(), SourceValue::ALL.to_vec());
    }

    #[test]
    fn test_upload_meta() {
        let store = SourceStore::new();
        store.set_last_upload_meta(42);
        let state = store.snapshot();
        assert_eq!(state.last_upload_count, Some(42));
        assert!(state.last_upload_at.is_some());
        store.reset_upload_meta();
        assert!(store.snapshot().last_upload_at.is_none());
    }

    #[test]
    fn test_parse_source() {
        assert_eq!("parsing".parse::<SourceValue>().unwrap(), SourceValue::Parsing);
        assert!("scraping".parse::<SourceValue>().is_err());
    }

    #[test]
    fn test_save_and_hydrate() {
        let dir = TempDir::new().unwrap();
        let store = SourceStore::new();
        store.set_sources(vec![SourceValue::Uploading]);
        store.set_last_upload_meta(3);
        store.save(dir.path()).unwrap();

        let restored = SourceStore::new();
        restored.hydrate(dir.path()).unwrap();
        assert_eq!(restored.snapshot(), store.snapshot());
    }

    #[test]
    fn test_hydrate_unreadable_file_resets() {
        let dir = TempDir::new().unwrap();
        let store = SourceStore::new();
        store.set_sources(vec![SourceValue::Parsing]);

        std::fs::write(SourceStore::storage_path(dir.path()), [0xff, 0xfe, 0x00]).unwrap();
        store.hydrate(dir.path()).unwrap();
        assert_eq!(store.snapshot(), SourceState::default());

        store.set_sources(vec![SourceValue::Parsing]);
        std::fs::write(SourceStore::storage_path(dir.path()), "{not json").unwrap();
        store.hydrate(dir.path()).unwrap();
        assert_eq!(store.snapshot(), SourceState::default());
    }

    #[test]
    fn test_hydrate_empty_sources_normalized() {
        let dir = TempDir::new().unwrap();
        std::fs::write(SourceStore::storage_path(dir.path()), r#"{"sources":[]}"#).unwrap();
        let store = SourceStore::new();
        store.hydrate(dir.path()).unwrap();
        assert_eq!(store.sources(), SourceValue::ALL.to_vec());
    }
}
