#[cfg(test)]
#[path = "file_test.rs"]
mod tests;

use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::CredentialStore;
use crate::configuration::Config;
use crate::configuration::ConfigKey;

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct StoredCredentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    openai_api_key: Option<String>,
}

pub struct FileCredentialStore {
    pub file_path: PathBuf,
}

impl Default for FileCredentialStore {
    fn default() -> FileCredentialStore {
        return FileCredentialStore::new(PathBuf::from(Config::get(ConfigKey::CredentialFile)));
    }
}

impl FileCredentialStore {
    pub fn new(file_path: PathBuf) -> FileCredentialStore {
        return FileCredentialStore { file_path };
    }

    async fn read(&self) -> Result<StoredCredentials> {
        if !self.file_path.exists() {
            return Ok(StoredCredentials::default());
        }

        let contents = fs::read_to_string(&self.file_path).await?;
        if contents.trim().is_empty() {
            return Ok(StoredCredentials::default());
        }

        let stored: StoredCredentials = serde_json::from_str(&contents)?;
        return Ok(stored);
    }

    async fn write(&self, stored: &StoredCredentials) -> Result<()> {
        if let Some(parent) = self.file_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).await?;
            }
        }

        let mut file = fs::File::create(&self.file_path).await?;
        file.write_all(serde_json::to_string_pretty(stored)?.as_bytes())
            .await?;
        file.flush().await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.file_path, std::fs::Permissions::from_mode(0o600)).await?;
        }

        return Ok(());
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    #[allow(clippy::implicit_return)]
    async fn get(&self) -> Result<Option<String>> {
        let stored = self.read().await?;
        return Ok(stored.openai_api_key.filter(|key| return !key.trim().is_empty()));
    }

    #[allow(clippy::implicit_return)]
    async fn set(&self, credential: &str) -> Result<()> {
        let mut stored = match self.read().await {
            Ok(stored) => stored,
            Err(err) => {
                tracing::warn!(path = ?self.file_path, error = ?err, "Overwriting unreadable credential file");
                StoredCredentials::default()
            }
        };
        stored.openai_api_key = Some(credential.trim().to_string());
        self.write(&stored).await?;

        tracing::debug!(path = ?self.file_path, "Saved credential");
        return Ok(());
    }

    #[allow(clippy::implicit_return)]
    async fn clear(&self) -> Result<()> {
        if !self.file_path.exists() {
            return Ok(());
        }

        fs::remove_file(&self.file_path).await?;
        tracing::debug!(path = ?self.file_path, "Cleared credential");
        return Ok(());
    }
}
