use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

pub const THEME_STORAGE_KEY: &str = "todoAppTheme";

/// Single-string key/value persistence.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;
}

/// JSON object on disk, rewritten atomically on every `set`.
#[derive(Debug)]
pub struct FileKeyValueStore {
    path: PathBuf,
}

impl FileKeyValueStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        fs::create_dir_all(data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;
        let path = data_dir.join("preferences.json");
        info!(path = %path.display(), "opened preference store");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_map(&self) -> anyhow::Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("failed reading {}", self.path.display()))?;
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&raw).with_context(|| format!("failed parsing {}", self.path.display()))
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let mut map = self.load_map()?;
        Ok(map.remove(key))
    }

    #[tracing::instrument(skip(self, value))]
    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        // A corrupt file is replaced rather than blocking the write.
        let mut map = self.load_map().unwrap_or_else(|err| {
            warn!(error = %err, "discarding unreadable preferences");
            BTreeMap::new()
        });
        map.insert(key.to_string(), value.to_string());

        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut temp = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut temp, &map)?;
        writeln!(temp)?;
        temp.flush()?;
        temp.persist(&self.path)
            .map_err(|err| anyhow!("failed to persist {}: {}", self.path.display(), err))?;

        debug!(file = %self.path.display(), "saved preferences");
        Ok(())
    }
}

/// In-process store for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    map: RefCell<BTreeMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.map.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.map.borrow_mut().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Box<S> {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        (**self).set(key, value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn next(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    pub fn storage_value(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    pub fn from_storage(raw: &str) -> Option<Self> {
        match raw.trim() {
            "light" => Some(Self::Light),
            "dark" => Some(Self::Dark),
            _ => None,
        }
    }

    pub fn is_dark(self) -> bool {
        self == Self::Dark
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.storage_value())
    }
}

/// Dark/light preference, read once on construction and written on toggle.
#[derive(Debug)]
pub struct ThemeStore<S> {
    storage: S,
    current: Theme,
}

impl<S: KeyValueStore> ThemeStore<S> {
    pub fn load(storage: S) -> Self {
        let current = match storage.get(THEME_STORAGE_KEY) {
            Ok(Some(raw)) => Theme::from_storage(&raw).unwrap_or_else(|| {
                warn!(value = %raw, "unknown stored theme; using light");
                Theme::Light
            }),
            Ok(None) => Theme::Light,
            Err(err) => {
                warn!(error = %err, "failed reading theme preference; using light");
                Theme::Light
            }
        };
        debug!(theme = %current, "loaded theme preference");
        Self { storage, current }
    }

    pub fn get(&self) -> Theme {
        self.current
    }

    /// Flips the theme and writes it through. A failed write is logged and
    /// the new theme still applies for this session.
    #[tracing::instrument(skip(self))]
    pub fn toggle(&mut self) -> Theme {
        self.current = self.current.next();
        if let Err(err) = self.storage.set(THEME_STORAGE_KEY, self.current.storage_value()) {
            warn!(error = %err, "failed persisting theme preference");
        }
        info!(theme = %self.current, "theme toggled");
        self.current
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }
}
