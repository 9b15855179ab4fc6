//! TOML-backed credential file.

use crate::error::CredentialError;
use crate::types::Credentials;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

/// Reads and writes the credential record on disk.
///
/// Writes go through a temp file and a rename so a crash never leaves a
/// half-written file behind. Read-modify-write cycles are serialized with
/// an internal lock.
#[derive(Debug)]
pub struct CredentialStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl CredentialStore {
    /// Create a store for the given file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Location of the credential file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the record. A missing file yields an empty record.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn load(&self) -> Result<Credentials, CredentialError> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("Credential file not found, starting with empty credentials");
                return Ok(Credentials::default());
            }
            Err(source) => {
                return Err(CredentialError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        toml::from_str(&contents).map_err(|source| CredentialError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    /// Write the record, replacing any existing file.
    #[instrument(skip(self, credentials), fields(path = %self.path.display()))]
    pub async fn save(&self, credentials: &Credentials) -> Result<(), CredentialError> {
        let _guard = self.write_lock.lock().await;
        self.write(credentials).await
    }

    /// Load the record, apply `f`, and write it back.
    pub async fn update<F>(&self, f: F) -> Result<Credentials, CredentialError>
    where
        F: FnOnce(&mut Credentials),
    {
        let _guard = self.write_lock.lock().await;
        let mut credentials = self.load().await?;
        f(&mut credentials);
        self.write(&credentials).await?;
        Ok(credentials)
    }

    async fn write(&self, credentials: &Credentials) -> Result<(), CredentialError> {
        let contents = toml::to_string_pretty(credentials)?;
        let io_err = |source| CredentialError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(io_err)?;
        }

        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, contents.as_bytes())
            .await
            .map_err(io_err)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&temp_path, std::fs::Permissions::from_mode(0o600))
                .await
                .map_err(io_err)?;
        }

        fs::rename(&temp_path, &self.path).await.map_err(io_err)?;

        debug!("Saved credentials ({} bytes)", contents.len());
        Ok(())
    }
}
