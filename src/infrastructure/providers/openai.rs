#[cfg(test)]
#[path = "openai_test.rs"]
mod tests;

use std::time::Duration;

use anyhow::bail;
use anyhow::Result;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde::Serialize;

use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::ChatOptions;
use crate::domain::models::ImageDescriptor;
use crate::domain::models::ImageOptions;
use crate::domain::models::Message;
use crate::domain::models::Provider;
use crate::domain::models::ProviderError;
use crate::domain::models::ProviderName;
use crate::domain::models::Role;
use crate::infrastructure::credentials::CredentialStore;

const OFFICIAL_URL: &str = "https://api.openai.com";

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct MessageRequest {
    role: String,
    content: String,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
struct CompletionRequest {
    model: String,
    messages: Vec<MessageRequest>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct CompletionMessageResponse {
    content: Option<String>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct CompletionChoiceResponse {
    message: CompletionMessageResponse,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoiceResponse>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ImageRequest {
    prompt: String,
    size: String,
    n: u32,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ImageDataResponse {
    url: Option<String>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ImageResponse {
    data: Vec<ImageDataResponse>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ErrorDetailResponse {
    message: String,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ErrorResponse {
    error: ErrorDetailResponse,
}

fn error_message(status: u16, body: &str) -> String {
    if let Ok(res) = serde_json::from_str::<ErrorResponse>(body) {
        return res.error.message;
    }

    let body = body.trim();
    if body.is_empty() {
        return format!("HTTP {status}");
    }

    return body.to_string();
}

pub struct OpenAI {
    url: String,
    token: String,
    timeout: String,
}

impl OpenAI {
    /// A credential saved in the store always wins over the supplied token,
    /// so a rotated key takes effect without changing configuration.
    pub async fn new(
        url: &str,
        token: &str,
        timeout: &str,
        store: &dyn CredentialStore,
    ) -> Result<OpenAI> {
        let mut resolved = token.trim().to_string();
        if let Some(saved) = store.get().await? {
            resolved = saved;
        }

        return Ok(OpenAI {
            url: url.trim_end_matches('/').to_string(),
            token: resolved,
            timeout: timeout.to_string(),
        });
    }

    pub async fn from_config(store: &dyn CredentialStore) -> Result<OpenAI> {
        return OpenAI::new(
            &Config::get(ConfigKey::OpenAiURL),
            &Config::get(ConfigKey::OpenAiToken),
            &Config::get(ConfigKey::ProviderHealthCheckTimeout),
            store,
        )
        .await;
    }

    async fn post<Req: Serialize + Sync, Res: DeserializeOwned>(
        &self,
        path: &str,
        req: &Req,
    ) -> Result<Res, ProviderError> {
        if self.token.is_empty() {
            return Err(ProviderError::Authentication(
                "no API key configured".to_string(),
            ));
        }

        let res = reqwest::Client::new()
            .post(format!("{url}{path}", url = self.url))
            .header("Authorization", format!("Bearer {}", self.token))
            .json(req)
            .send()
            .await?;

        let status = res.status().as_u16();
        let body = res.text().await?;

        if status == 401 || status == 403 {
            tracing::error!(status = status, path = path, "OpenAI rejected the credential");
            return Err(ProviderError::Authentication(error_message(status, &body)));
        }
        if !(200..300).contains(&status) {
            tracing::error!(status = status, path = path, "OpenAI request failed");
            return Err(ProviderError::Api {
                status,
                message: error_message(status, &body),
            });
        }

        tracing::debug!(path = path, body = %body, "OpenAI response");
        return serde_json::from_str::<Res>(&body)
            .map_err(|err| return ProviderError::MalformedResponse(err.to_string()));
    }
}

#[async_trait]
impl Provider for OpenAI {
    fn name(&self) -> ProviderName {
        return ProviderName::OpenAI;
    }

    #[allow(clippy::implicit_return)]
    async fn health_check(&self) -> Result<()> {
        if self.url.is_empty() {
            bail!("OpenAI URL is not defined");
        }
        if self.token.is_empty() {
            bail!("OpenAI API key is not defined");
        }

        // The official API has no index route to ping.
        if self.url == OFFICIAL_URL {
            return Ok(());
        }

        let res = reqwest::Client::new()
            .get(&self.url)
            .timeout(Duration::from_millis(self.timeout.parse::<u64>()?))
            .send()
            .await;

        let res = match res {
            Ok(res) => res,
            Err(err) => {
                tracing::error!(error = ?err, "OpenAI is not reachable");
                bail!("OpenAI is not reachable");
            }
        };

        let status = res.status().as_u16();
        if status >= 500 {
            tracing::error!(status = status, "OpenAI health check failed");
            bail!("OpenAI health check failed");
        }

        return Ok(());
    }

    #[allow(clippy::implicit_return)]
    async fn complete_chat(
        &self,
        transcript: &[Message],
        options: &ChatOptions,
    ) -> Result<Message, ProviderError> {
        if transcript.is_empty() {
            return Err(ProviderError::InvalidInput(
                "transcript must contain at least one message".to_string(),
            ));
        }

        let req = CompletionRequest {
            model: options.model.to_string(),
            messages: transcript
                .iter()
                .map(|message| {
                    return MessageRequest {
                        role: message.role.to_string(),
                        content: message.content.to_string(),
                    };
                })
                .collect(),
            temperature: options.temperature,
            max_tokens: options.max_tokens,
        };

        let res: CompletionResponse = self.post("/v1/chat/completions", &req).await?;
        let choice = match res.choices.into_iter().next() {
            Some(choice) => choice,
            None => {
                return Err(ProviderError::MalformedResponse(
                    "response contained no choices".to_string(),
                ));
            }
        };

        let content = choice.message.content.unwrap_or_default();
        return Ok(Message::new(Role::Assistant, &content));
    }

    #[allow(clippy::implicit_return)]
    async fn generate_image(
        &self,
        prompt: &str,
        options: &ImageOptions,
    ) -> Result<Vec<ImageDescriptor>, ProviderError> {
        if prompt.trim().is_empty() {
            return Err(ProviderError::InvalidInput(
                "prompt must not be empty".to_string(),
            ));
        }

        let req = ImageRequest {
            prompt: prompt.to_string(),
            size: options.size.to_string(),
            n: options.count,
        };

        let res: ImageResponse = self.post("/v1/images/generations", &req).await?;
        let images = res
            .data
            .into_iter()
            .filter_map(|image| {
                if image.url.is_none() {
                    tracing::debug!("Skipping image without a url");
                }
                return image.url.map(|url| return ImageDescriptor { url });
            })
            .collect::<Vec<ImageDescriptor>>();

        return Ok(images);
    }
}
