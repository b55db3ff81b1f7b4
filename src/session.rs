use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{StorageError, StorageResult};

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct SessionRecord {
    user_name: Option<String>,
}

/// Persists the display name that separates first run from returning users
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored name, if any. An unreadable file counts as first run.
    pub fn display_name(&self) -> Option<String> {
        match self.read() {
            Ok(record) => record.user_name.filter(|name| !name.trim().is_empty()),
            Err(err) => {
                log::warn!("Could not read session file {}: {}", self.path.display(), err);
                None
            }
        }
    }

    pub fn is_first_run(&self) -> bool {
        self.display_name().is_none()
    }

    /// Stores the trimmed name; blank names are rejected
    pub fn set_display_name(&self, name: &str) -> StorageResult<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StorageError::BlankName);
        }
        self.write(&SessionRecord {
            user_name: Some(name.to_owned()),
        })?;
        log::info!("Stored display name for session");
        Ok(name.to_owned())
    }

    pub fn clear(&self) -> StorageResult<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }

    fn read(&self) -> StorageResult<SessionRecord> {
        if !self.path.exists() {
            return Ok(SessionRecord::default());
        }
        let json = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&json)?)
    }

    fn write(&self, record: &SessionRecord) -> StorageResult<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(record)?)?;
        Ok(())
    }
}
