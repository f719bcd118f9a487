use std::fs::read_to_string;
use std::path::PathBuf;

use anyhow::{Context, Result};

/// Storage keys for each persisted record.
pub mod keys {
    pub const STOPWATCH: &str = "stopwatch_v1";
    pub const TIMER: &str = "timer_v1";
    pub const COUNTER: &str = "counter_v1";
    pub const NAME: &str = "name";

    pub const ALL: [&str; 4] = [STOPWATCH, TIMER, COUNTER, NAME];
}

/// A minimal key-value port for persisted widget state.
///
/// The engines treat writes as fire-and-forget: callers log and swallow
/// errors, and a missing or unreadable key falls back to the idle state.
pub trait Store {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;
}

/// A [`Store`] keeping one file per key under a state directory,
/// which is usually `~/.local/state/lapse` by default.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn path(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

impl Store for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        read_to_string(self.path(key)).ok()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Unable to create state directory {}", self.dir.display()))?;

        std::fs::write(self.path(key), value)
            .with_context(|| format!("Unable to write state file {}", self.path(key).display()))
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.path(key);

        if path.exists() {
            std::fs::remove_file(&path)
                .with_context(|| format!("Unable to remove state file {}", path.display()))?;
        }

        Ok(())
    }
}

/// An in-memory [`Store`] used by tests in place of the filesystem.
#[derive(Default)]
pub struct MemStore {
    map: std::cell::RefCell<std::collections::HashMap<String, String>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemStore {
    fn get(&self, key: &str) -> Option<String> {
        self.map.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.map.borrow_mut().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.map.borrow_mut().remove(key);
        Ok(())
    }
}

/// A [`Store`] whose writes always fail, for exercising the paths that
/// swallow persistence errors.
#[cfg(test)]
pub struct BrokenStore;

#[cfg(test)]
impl Store for BrokenStore {
    fn get(&self, _key: &str) -> Option<String> {
        None
    }

    fn set(&self, _key: &str, _value: &str) -> Result<()> {
        Err(anyhow::anyhow!("store is broken"))
    }

    fn remove(&self, _key: &str) -> Result<()> {
        Err(anyhow::anyhow!("store is broken"))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn mem_store_roundtrip() {
        let store = MemStore::new();

        assert_eq!(store.get("k"), None);

        store.set("k", "v").unwrap();
        assert_eq!(store.get("k"), Some("v".to_string()));

        store.remove("k").unwrap();
        assert_eq!(store.get("k"), None);
    }

    #[test]
    fn file_store_roundtrip() {
        let dir = std::env::temp_dir().join(format!("lapse-store-test-{}", std::process::id()));
        let store = FileStore::new(dir.clone());

        assert_eq!(store.get("k"), None);

        store.set("k", "v").unwrap();
        assert_eq!(store.get("k"), Some("v".to_string()));

        store.remove("k").unwrap();
        assert_eq!(store.get("k"), None);

        std::fs::remove_dir_all(dir).unwrap();
    }
}
