pub mod openai;

use anyhow::Result;

use crate::domain::models::ProviderBox;
use crate::domain::models::ProviderName;
use crate::infrastructure::credentials::CredentialStore;

pub struct ProviderManager {}

impl ProviderManager {
    pub async fn get(name: ProviderName, store: &dyn CredentialStore) -> Result<ProviderBox> {
        match name {
            ProviderName::OpenAI => {
                return Ok(Box::new(openai::OpenAI::from_config(store).await?));
            }
        }
    }
}
