use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredSession {
    #[serde(rename = "authToken", default, skip_serializing_if = "Option::is_none")]
    auth_token: Option<String>,
}

/// Holds the bearer token between calls, optionally persisted to a JSON file
/// as `{"authToken": "..."}`. Clones share the same token.
#[derive(Debug, Clone)]
pub struct Session {
    token: Arc<Mutex<Option<String>>>,
    path: Option<PathBuf>,
}

impl Session {
    /// Session that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self {
            token: Arc::new(Mutex::new(None)),
            path: None,
        }
    }

    /// Load the session stored at `path`. A missing file is an empty session.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let stored = match std::fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => StoredSession::default(),
            Ok(contents) => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse session file {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoredSession::default(),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read session file {}", path.display()));
            }
        };

        Ok(Self {
            token: Arc::new(Mutex::new(stored.auth_token)),
            path: Some(path),
        })
    }

    pub fn token(&self) -> Option<String> {
        self.lock().clone()
    }

    pub fn is_logged_in(&self) -> bool {
        self.lock().is_some()
    }

    pub fn set_token(&self, token: impl Into<String>) -> Result<()> {
        *self.lock() = Some(token.into());
        self.persist()
    }

    pub fn clear(&self) -> Result<()> {
        let had_token = self.lock().take().is_some();
        if had_token {
            debug!("cleared stored credential");
        }
        self.persist()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        // The token is a plain value; a poisoned lock still holds a usable one.
        self.token.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn persist(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let stored = StoredSession {
            auth_token: self.token(),
        };
        let json = serde_json::to_string_pretty(&stored).context("Failed to encode session")?;
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write session file {}", path.display()))
    }
}
