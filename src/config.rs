use std::env;
use std::path::PathBuf;

use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// Environment variable overriding the default storage root.
pub const STORAGE_DIR_ENV: &str = "MEMOTABLE_DIR";

/// Configuration surface for a [`crate::CacheFacility`].
///
/// Defaults mirror a plain cache: no auxiliary modules, no entry limit, and
/// obsolete cleanup enabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheOptions {
    /// Directory holding one database file per cached function.
    pub storage_dir: PathBuf,
    /// Source files whose normalized contents feed every code fingerprint,
    /// so edits to shared helpers invalidate dependents too.
    pub auxiliary_modules: Vec<PathBuf>,
    /// Maximum registry rows kept per function. Only a positive value
    /// enforces a limit; `None` and zero both disable it.
    pub max_entries: Option<u64>,
    /// Delete entries recorded under a different code fingerprint on every
    /// miss.
    pub clean_obsolete: bool,
}

impl CacheOptions {
    pub fn new(storage_dir: impl Into<PathBuf>) -> Self {
        Self {
            storage_dir: storage_dir.into(),
            auxiliary_modules: Vec::new(),
            max_entries: None,
            clean_obsolete: true,
        }
    }

    /// Resolves the default storage root: the [`STORAGE_DIR_ENV`] override
    /// when set, otherwise `~/.memotable`.
    pub fn default_dir() -> Result<PathBuf, StorageError> {
        if let Ok(custom) = env::var(STORAGE_DIR_ENV) {
            return Ok(PathBuf::from(custom));
        }
        let base_dirs = BaseDirs::new().ok_or(StorageError::NoHomeDir)?;
        Ok(base_dirs.home_dir().join(".memotable"))
    }

    pub fn auxiliary_module(mut self, path: impl Into<PathBuf>) -> Self {
        self.auxiliary_modules.push(path.into());
        self
    }

    pub fn max_entries(mut self, limit: u64) -> Self {
        self.max_entries = Some(limit);
        self
    }

    pub fn clean_obsolete(mut self, enabled: bool) -> Self {
        self.clean_obsolete = enabled;
        self
    }
}
