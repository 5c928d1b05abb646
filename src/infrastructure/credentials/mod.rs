mod file;

use anyhow::Result;
use async_trait::async_trait;

pub use file::FileCredentialStore;

/// Persists the single API key used to authorize provider calls.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get(&self) -> Result<Option<String>>;

    async fn set(&self, credential: &str) -> Result<()>;

    async fn clear(&self) -> Result<()>;
}

pub type CredentialStoreBox = Box<dyn CredentialStore>;
