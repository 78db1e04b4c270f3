use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

/// A string key/value store the task list is mirrored into.
///
/// `read` distinguishes "no entry" (`Ok(None)`) from an actual I/O failure;
/// both are absorbed one layer up in [`KvStore`].
pub trait Backend {
    fn read(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn write(&mut self, key: &str, payload: &str) -> anyhow::Result<()>;
}

/// One `<key>.json` file per key under the data directory.
#[derive(Debug)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    #[tracing::instrument(skip(dir))]
    pub fn open(dir: &Path) -> anyhow::Result<Self> {
        fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
        info!(dir = %dir.display(), "opened file backend");
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl Backend for FileBackend {
    fn read(&self, key: &str) -> anyhow::Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&path)
            .with_context(|| format!("failed reading {}", path.display()))?;
        Ok(Some(text))
    }

    fn write(&mut self, key: &str, payload: &str) -> anyhow::Result<()> {
        let path = self.path_for(key);
        debug!(file = %path.display(), bytes = payload.len(), "writing key atomically");

        let mut temp = tempfile::NamedTempFile::new_in(&self.dir)?;
        temp.write_all(payload.as_bytes())?;
        temp.flush()?;
        temp.persist(&path)
            .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;
        Ok(())
    }
}

/// Session-only storage. Backs tests, and stands in when no data directory
/// can be opened.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    map: HashMap<String, String>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Backend for MemoryBackend {
    fn read(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.map.get(key).cloned())
    }

    fn write(&mut self, key: &str, payload: &str) -> anyhow::Result<()> {
        self.map.insert(key.to_string(), payload.to_string());
        Ok(())
    }
}

/// JSON adapter over a [`Backend`].
///
/// Failures never reach the caller: a bad read or parse substitutes the
/// caller's default, a bad write leaves the in-memory state authoritative
/// for the rest of the session. Both are logged.
pub struct KvStore {
    backend: Box<dyn Backend>,
}

impl KvStore {
    /// Opens a file-backed store at `data_dir`, falling back to a
    /// memory-only store when the directory cannot be opened.
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> Self {
        match FileBackend::open(data_dir) {
            Ok(backend) => Self::with_backend(Box::new(backend)),
            Err(err) => {
                warn!(
                    dir = %data_dir.display(),
                    error = %format!("{err:#}"),
                    "storage unavailable; state will not survive this session"
                );
                Self::with_backend(Box::new(MemoryBackend::new()))
            }
        }
    }

    pub fn with_backend(backend: Box<dyn Backend>) -> Self {
        Self { backend }
    }

    #[tracing::instrument(skip(self, default))]
    pub fn load_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        let raw = match self.backend.read(key) {
            Ok(Some(text)) => text,
            Ok(None) => {
                debug!(key, "no stored entry; using default");
                return default;
            }
            Err(err) => {
                warn!(key, error = %format!("{err:#}"), "storage read failed; using default");
                return default;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(err) => {
                warn!(key, error = %err, "stored entry failed to parse; using default");
                default
            }
        }
    }

    #[tracing::instrument(skip(self, value))]
    pub fn save<T: Serialize>(&mut self, key: &str, value: &T) {
        let payload = match serde_json::to_string(value) {
            Ok(text) => text,
            Err(err) => {
                warn!(key, error = %err, "failed to serialize value; skipping write");
                return;
            }
        };

        if let Err(err) = self.backend.write(key, &payload) {
            warn!(key, error = %format!("{err:#}"), "storage write failed; keeping in-memory state");
        }
    }
}

impl std::fmt::Debug for KvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvStore").finish_non_exhaustive()
    }
}
