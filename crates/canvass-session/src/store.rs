//! Pluggable token storage backends

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tracing::{debug, warn};

use crate::{error::Result, tokens::SessionTokens, StoreError};

/// Capability interface for persisted session credentials.
///
/// The refresh flow is the only writer; everything else only reads. A store
/// that has no credentials reports `Ok(None)` rather than an error.
pub trait TokenStore: Send + Sync {
    /// Read the current token pair, if any
    fn read(&self) -> Result<Option<SessionTokens>>;

    /// Replace the stored token pair
    fn write(&self, tokens: &SessionTokens) -> Result<()>;

    /// Remove any stored tokens
    fn clear(&self) -> Result<()>;
}

/// In-memory token store
///
/// Used by tests and by cookie-only sessions that never persist tokens.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    inner: RwLock<Option<SessionTokens>>,
}

impl MemoryTokenStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store preloaded with a token pair
    pub fn with_tokens(tokens: SessionTokens) -> Self {
        Self {
            inner: RwLock::new(Some(tokens)),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn read(&self) -> Result<Option<SessionTokens>> {
        Ok(self
            .inner
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone())
    }

    fn write(&self, tokens: &SessionTokens) -> Result<()> {
        *self
            .inner
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(tokens.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self
            .inner
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = None;
        Ok(())
    }
}

/// JSON file-backed token store
///
/// The persisted analog of the dashboard's legacy local-storage tokens. A
/// missing or unreadable file is treated as "no tokens" so a corrupt
/// credentials file degrades to a fresh login instead of a hard failure.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    /// Create a store backed by the given file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Create a store at the default per-user location
    pub fn default_location() -> Result<Self> {
        let dir = dirs::config_dir().ok_or(StoreError::NoConfigDir)?;
        Ok(Self::new(dir.join("canvass").join("credentials.json")))
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn read(&self) -> Result<Option<SessionTokens>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str(&raw) {
            Ok(tokens) => Ok(Some(tokens)),
            Err(e) => {
                warn!(path = %self.path.display(), "ignoring corrupt credentials file: {e}");
                Ok(None)
            }
        }
    }

    fn write(&self, tokens: &SessionTokens) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(tokens)?)?;
        debug!(path = %self.path.display(), "persisted session tokens");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
