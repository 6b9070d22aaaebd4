use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Refresh the access token this long before its recorded expiry.
const EXPIRY_BUFFER_SECS: i64 = 300;

/// OAuth token pair cached on disk for one application identity.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StoredCredentials {
    pub access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Expiry time as seconds since Unix epoch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    /// Fields produced by the token endpoint that this crate does not
    /// interpret (`token_type`, `scope`, ...). Preserved across save/load.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StoredCredentials {
    /// Check if the access token is expired or about to expire. A record
    /// without expiry metadata counts as expired.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at < chrono::Utc::now().timestamp() + EXPIRY_BUFFER_SECS,
            None => true,
        }
    }
}

/// Load/save/remove the credentials file at one resolved path.
#[derive(Debug, Clone)]
pub(crate) struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn exists(&self) -> bool {
        self.path.exists()
    }

    pub(crate) fn load(&self) -> Result<StoredCredentials> {
        if !self.path.exists() {
            return Err(Error::MissingCredentials(self.path.clone()));
        }

        let contents = fs::read_to_string(&self.path)
            .map_err(|e| Error::Storage(format!("Failed to read credentials file: {}", e)))?;
        let credentials = serde_json::from_str(&contents)?;

        Ok(credentials)
    }

    pub(crate) fn save(&self, credentials: &StoredCredentials) -> Result<PathBuf> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::Storage(format!("Failed to create credentials directory: {}", e))
            })?;
        }

        let contents = serde_json::to_string_pretty(credentials)?;

        // Write a private staging file and rename it into place so a
        // concurrent reader never observes a torn file.
        let staging_path = self.path.with_extension("tmp");
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .mode(0o600)
            .open(&staging_path)
            .map_err(|e| Error::Storage(format!("Failed to create credentials file: {}", e)))?;
        file.write_all(contents.as_bytes())
            .map_err(|e| Error::Storage(format!("Failed to write credentials file: {}", e)))?;
        fs::rename(&staging_path, &self.path).map_err(|e| {
            Error::Storage(format!("Failed to move credentials file into place: {}", e))
        })?;

        debug!(path = ?self.path, "Saved credentials");

        Ok(self.path.clone())
    }

    pub(crate) fn remove(&self) -> Result<()> {
        if !self.path.exists() {
            debug!("No credentials to remove");
            return Ok(());
        }

        fs::remove_file(&self.path)
            .map_err(|e| Error::Storage(format!("Failed to delete credentials file: {}", e)))?;
        debug!(path = ?self.path, "Removed cached credentials");

        Ok(())
    }
}
