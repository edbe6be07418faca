//! Key-value storage behind the persisted grid state.
//!
//! The engine never blocks on storage: reads happen once at mount, writes
//! go through the debounced writer, and a failing store degrades to an
//! in-memory-only session.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

pub trait StateStore {
    /// Raw stored payload for a key, `None` when absent or unreadable.
    fn read(&self, key: &str) -> Option<String>;

    fn write(&mut self, key: &str, payload: &str) -> Result<(), String>;

    /// Delete the stored entry. Removing an absent key is not an error.
    fn remove(&mut self, key: &str) -> Result<(), String>;
}

/// JSON files under the user config directory, one per grid key.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Default location: `<config dir>/rowgrid/grids`.
    pub fn default_location() -> Self {
        let dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("rowgrid")
            .join("grids");
        Self { dir }
    }

    fn path(&self, key: &str) -> PathBuf {
        // Keys are caller-supplied; keep filenames tame.
        let safe: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                    c
                } else {
                    '-'
                }
            })
            .collect();
        self.dir.join(format!("{}.json", safe))
    }
}

impl StateStore for FileStore {
    fn read(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.path(key)).ok()
    }

    fn write(&mut self, key: &str, payload: &str) -> Result<(), String> {
        fs::create_dir_all(&self.dir).map_err(|e| e.to_string())?;
        fs::write(self.path(key), payload).map_err(|e| e.to_string())
    }

    fn remove(&mut self, key: &str) -> Result<(), String> {
        let path = self.path(key);
        if !path.exists() {
            return Ok(());
        }
        fs::remove_file(path).map_err(|e| e.to_string())
    }
}

/// In-memory store for tests and for sessions where storage is
/// unavailable. Counts writes so coalescing behavior is observable.
#[derive(Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
    writes: usize,
    /// When set, every write fails (storage-unavailable simulation).
    pub fail_writes: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn writes(&self) -> usize {
        self.writes
    }

    pub fn get(&self, key: &str) -> Option<&String> {
        self.entries.get(key)
    }
}

impl StateStore for MemoryStore {
    fn read(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn write(&mut self, key: &str, payload: &str) -> Result<(), String> {
        if self.fail_writes {
            return Err("storage unavailable".to_string());
        }
        self.writes += 1;
        self.entries.insert(key.to_string(), payload.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), String> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Shared-handle store: lets a host keep a handle to the same store the
/// grid owns (the engine is single-threaded and cooperative).
impl<S: StateStore> StateStore for Rc<RefCell<S>> {
    fn read(&self, key: &str) -> Option<String> {
        self.borrow().read(key)
    }

    fn write(&mut self, key: &str, payload: &str) -> Result<(), String> {
        self.borrow_mut().write(key, payload)
    }

    fn remove(&mut self, key: &str) -> Result<(), String> {
        self.borrow_mut().remove(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_round_trip() {
        let mut store = MemoryStore::new();
        store.write("grid-a", "{}").unwrap();
        assert_eq!(store.read("grid-a").as_deref(), Some("{}"));
        assert_eq!(store.writes(), 1);

        store.remove("grid-a").unwrap();
        assert!(store.read("grid-a").is_none());
        store.remove("grid-a").unwrap(); // absent key is fine
    }

    #[test]
    fn test_file_store_sanitizes_keys() {
        let store = FileStore::new(PathBuf::from("/tmp/rowgrid-test"));
        let path = store.path("invoices/2024 draft");
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert_eq!(name, "invoices-2024-draft.json");
    }
}
