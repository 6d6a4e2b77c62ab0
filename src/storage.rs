use anyhow::{Context, Result};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Injected persistence boundary for annotation collections.
///
/// One value per key; values are opaque to the store (the anchor store
/// writes JSON arrays). A `load` miss is `Ok(None)`, never an error.
pub trait KeyValueStore {
    fn load(&self, key: &str) -> Result<Option<String>>;
    fn save(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// In-memory backend for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn save(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Shared handle over a [`MemoryStore`] so two components (e.g. a view and
/// a host bridge in one process) can run against the same backing state.
/// Single-threaded by design.
#[derive(Debug, Clone, Default)]
pub struct SharedMemoryStore(Rc<RefCell<MemoryStore>>);

impl SharedMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for SharedMemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        self.0.borrow().load(key)
    }

    fn save(&mut self, key: &str, value: &str) -> Result<()> {
        self.0.borrow_mut().save(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.0.borrow_mut().remove(key)
    }
}

const DATA_DIR_ENV: &str = "MARGINALIA_DATA_DIR";
const APP_NAME: &str = "marginalia";

/// File-per-key backend under a data directory. The key itself is hashed
/// into the file name, so arbitrary document identities stay filesystem
/// safe.
#[derive(Debug)]
pub struct DiskStore {
    dir: PathBuf,
}

impl DiskStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        if !dir.exists() {
            fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create data directory {dir:?}"))?;
        }
        Ok(Self { dir })
    }

    /// Platform data dir, overridable via `MARGINALIA_DATA_DIR`.
    pub fn open_default() -> Result<Self> {
        let dir = match std::env::var(DATA_DIR_ENV) {
            Ok(custom) => PathBuf::from(custom),
            Err(_) => dirs::data_dir()
                .context("Could not determine platform data directory")?
                .join(APP_NAME),
        };
        Self::open(dir)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        let digest = md5::compute(key.as_bytes());
        self.dir.join(format!("anchors_{digest:x}.json"))
    }
}

impl KeyValueStore for DiskStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        let path = self.entry_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read annotation file {path:?}"))?;
        Ok(Some(content))
    }

    fn save(&mut self, key: &str, value: &str) -> Result<()> {
        let path = self.entry_path(key);
        fs::write(&path, value)
            .with_context(|| format!("Failed to write annotation file {path:?}"))
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let path = self.entry_path(key);
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove annotation file {path:?}"))?;
        }
        Ok(())
    }
}
