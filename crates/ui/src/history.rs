use std::collections::VecDeque;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use shared_types::SavedRequest;

pub const MAX_REQUESTS: usize = 20;

/// A single named slot holding the serialized history.
pub trait Storage: Send + Sync {
    fn read(&self) -> Result<Option<String>>;
    fn write(&self, contents: &str) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Storage for FileStorage {
    fn read(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err).with_context(|| format!("Failed to read {:?}", self.path)),
        }
    }

    fn write(&self, contents: &str) -> Result<()> {
        fs::write(&self.path, contents).with_context(|| format!("Failed to write {:?}", self.path))
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    slot: Arc<Mutex<Option<String>>>,
}

impl MemoryStorage {
    pub fn with_contents(contents: impl Into<String>) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(contents.into()))),
        }
    }

    pub fn contents(&self) -> Option<String> {
        self.slot.lock().clone()
    }
}

impl Storage for MemoryStorage {
    fn read(&self) -> Result<Option<String>> {
        Ok(self.slot.lock().clone())
    }

    fn write(&self, contents: &str) -> Result<()> {
        *self.slot.lock() = Some(contents.to_string());
        Ok(())
    }
}

/// Saved requests, most recent first, capped at [`MAX_REQUESTS`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct History {
    entries: VecDeque<SavedRequest>,
}

impl History {
    /// Unreadable or corrupt contents are treated as an empty history.
    pub fn load(storage: &dyn Storage) -> Self {
        let contents = match storage.read() {
            Ok(Some(contents)) => contents,
            Ok(None) => return Self::default(),
            Err(err) => {
                tracing::warn!("Failed to load saved requests: {:?}", err);
                return Self::default();
            }
        };

        match serde_json::from_str::<Vec<SavedRequest>>(&contents) {
            Ok(entries) => {
                let mut entries: VecDeque<SavedRequest> = entries.into();
                entries.truncate(MAX_REQUESTS);
                Self { entries }
            }
            Err(err) => {
                tracing::warn!("Failed to load saved requests: {}", err);
                Self::default()
            }
        }
    }

    pub fn persist(&self, storage: &dyn Storage) -> Result<()> {
        let contents = serde_json::to_string(&self.entries)?;
        storage.write(&contents)
    }

    /// Moves `request` to the front, replacing any entry with the same id,
    /// and evicts whatever falls past the cap.
    pub fn upsert(&mut self, request: SavedRequest) {
        self.remove(&request.id);
        self.entries.push_front(request);
        self.entries.truncate(MAX_REQUESTS);
    }

    pub fn remove(&mut self, id: &str) -> Option<SavedRequest> {
        let index = self.entries.iter().position(|r| r.id == id)?;
        self.entries.remove(index)
    }

    pub fn get(&self, id: &str) -> Option<&SavedRequest> {
        self.entries.iter().find(|r| r.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SavedRequest> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::HttpMethod;

    fn saved(id: &str) -> SavedRequest {
        SavedRequest {
            id: id.to_string(),
            name: format!("GET /{}", id),
            url: format!("https://example.com/{}", id),
            method: HttpMethod::Get,
            headers: vec![],
            query_params: vec![],
            body: String::new(),
            timestamp: 0,
        }
    }

    fn ids(history: &History) -> Vec<&str> {
        history.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn upsert_moves_existing_entry_to_front() {
        let mut history = History::default();
        history.upsert(saved("a"));
        history.upsert(saved("b"));
        history.upsert(saved("c"));
        assert_eq!(ids(&history), vec!["c", "b", "a"]);

        let mut renamed = saved("a");
        renamed.name = "renamed".to_string();
        history.upsert(renamed);
        assert_eq!(ids(&history), vec!["a", "c", "b"]);
        assert_eq!(history.get("a").unwrap().name, "renamed");
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn oldest_entry_is_evicted_past_the_cap() {
        let mut history = History::default();
        for i in 0..MAX_REQUESTS {
            history.upsert(saved(&i.to_string()));
        }
        assert_eq!(history.len(), MAX_REQUESTS);

        history.upsert(saved("newest"));
        assert_eq!(history.len(), MAX_REQUESTS);
        assert_eq!(history.iter().next().unwrap().id, "newest");
        assert!(history.get("0").is_none());
        assert!(history.get("1").is_some());
    }

    #[test]
    fn remove_returns_the_entry() {
        let mut history = History::default();
        history.upsert(saved("a"));
        assert_eq!(history.remove("a").unwrap().id, "a");
        assert!(history.remove("a").is_none());
        assert!(history.is_empty());
    }

    #[test]
    fn corrupt_slot_loads_as_empty() {
        let storage = MemoryStorage::with_contents("not json at all");
        assert!(History::load(&storage).is_empty());

        let storage = MemoryStorage::default();
        assert!(History::load(&storage).is_empty());
    }

    #[test]
    fn persisted_history_round_trips_through_the_slot() {
        let storage = MemoryStorage::default();
        let mut history = History::default();
        history.upsert(saved("a"));
        history.upsert(saved("b"));
        history.persist(&storage).unwrap();

        let contents = storage.contents().unwrap();
        assert!(contents.contains("\"queryParams\""));
        assert_eq!(History::load(&storage), history);
    }

    #[test]
    fn missing_file_is_an_empty_slot() {
        let path = std::env::temp_dir().join(format!(
            "postie-history-missing-{}.json",
            std::process::id()
        ));
        let storage = FileStorage::new(&path);
        assert_eq!(storage.read().unwrap(), None);

        storage.write("[]").unwrap();
        assert_eq!(storage.read().unwrap().as_deref(), Some("[]"));
        fs::remove_file(&path).unwrap();
    }
}
