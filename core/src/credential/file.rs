use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use super::{Credential, CredentialStore};

/// On-disk shape of the session file.
#[derive(Debug, Serialize, Deserialize)]
struct StoredSession {
    token: String,
    saved_at: DateTime<Utc>,
}

/// Credential persisted as a small JSON file so it survives process restarts.
///
/// Writes go through a temp file in the same directory followed by a rename,
/// so a crash never leaves a half-written token behind.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config dir>/weatherite/<key>.json`, or `None` if the platform has no config dir.
    pub fn in_config_dir(storage_key: &str) -> Option<Self> {
        dirs::config_dir().map(|dir| {
            Self::new(dir.join("weatherite").join(format!("{}.json", storage_key)))
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// When the current credential was stored, if there is one.
    pub fn saved_at(&self) -> Option<DateTime<Utc>> {
        self.read().map(|s| s.saved_at)
    }

    fn read(&self) -> Option<StoredSession> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Failed to read session file {:?}: {}", self.path, e);
                return None;
            }
        };
        match serde_json::from_str::<StoredSession>(&raw) {
            Ok(session) => Some(session),
            Err(e) => {
                warn!("Ignoring corrupt session file {:?}: {}", self.path, e);
                None
            }
        }
    }

    fn write(&self, session: &StoredSession) -> Result<(), String> {
        let json = serde_json::to_string_pretty(session)
            .map_err(|e| format!("Failed to serialize session: {}", e))?;
        let parent = self
            .path
            .parent()
            .ok_or_else(|| format!("Session path has no parent directory: {:?}", self.path))?;
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create {:?}: {}", parent, e))?;

        let mut temp = NamedTempFile::new_in(parent)
            .map_err(|e| format!("Failed to create temp file: {}", e))?;
        temp.write_all(json.as_bytes())
            .and_then(|_| temp.flush())
            .map_err(|e| format!("Failed to write session: {}", e))?;
        temp.persist(&self.path)
            .map_err(|e| format!("Failed to persist session: {}", e))?;
        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn set(&self, credential: Credential) {
        let session = StoredSession {
            token: credential.token().to_string(),
            saved_at: Utc::now(),
        };
        match self.write(&session) {
            Ok(()) => info!("Stored session credential at {:?}", self.path),
            Err(e) => warn!("{}", e),
        }
    }

    fn get(&self) -> Option<Credential> {
        self.read().and_then(|s| Credential::new(s.token))
    }

    fn clear(&self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => info!("Cleared session credential at {:?}", self.path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No session file to clear at {:?}", self.path);
            }
            Err(e) => warn!("Failed to remove session file {:?}: {}", self.path, e),
        }
    }
}
