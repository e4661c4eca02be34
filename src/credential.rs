// The long-lived access credential and its on-disk store.
//
// One credential per store location. The file is JSON with `Name`,
// `Token` and `Secret` fields and is replaced wholesale on save.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CredentialError;

/// Default credential file, relative to the working directory
pub const CREDENTIAL_FILE: &str = "credential.json";

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Credential {
    #[serde(rename = "Name", default)]
    pub display_name: String,
    #[serde(rename = "Token")]
    pub token: String,
    #[serde(rename = "Secret")]
    pub secret: String,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("display_name", &self.display_name)
            .field("token", &self.token)
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl Credential {
    pub fn new(
        display_name: impl Into<String>,
        token: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            display_name: display_name.into(),
            token: token.into(),
            secret: secret.into(),
        }
    }

    /// Usable only when both halves of the access pair are present.
    pub fn is_usable(&self) -> bool {
        !self.token.is_empty() && !self.secret.is_empty()
    }
}

pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read and decode the credential file. Never modifies it.
    pub fn load(&self) -> Result<Credential, CredentialError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CredentialError::NotFound(self.path.clone()));
            }
            Err(source) => {
                return Err(CredentialError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        let credential = serde_json::from_str(&contents).map_err(|source| {
            CredentialError::Decode {
                path: self.path.clone(),
                source,
            }
        })?;
        debug!(path = %self.path.display(), "loaded credential");
        Ok(credential)
    }

    /// Replace the credential file. The new contents go to a sibling temp
    /// file first and are renamed over the old one, so a failed write never
    /// leaves a half-written file behind.
    pub fn save(&self, credential: &Credential) -> Result<(), CredentialError> {
        let write_err = |source: std::io::Error| CredentialError::Write {
            path: self.path.clone(),
            source,
        };

        let contents = serde_json::to_vec(credential).map_err(|e| write_err(e.into()))?;
        let tmp = self.temp_path();

        let result = (|| {
            let mut file = std::fs::File::create(&tmp)?;
            file.write_all(&contents)?;
            file.sync_all()?;
            std::fs::rename(&tmp, &self.path)
        })();

        if let Err(e) = result {
            let _ = std::fs::remove_file(&tmp);
            return Err(write_err(e));
        }
        debug!(path = %self.path.display(), "saved credential");
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| CREDENTIAL_FILE.into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
