#[cfg(test)]
#[path = "provider_test.rs"]
mod tests;

use anyhow::Result;
use async_trait::async_trait;
use strum::EnumIter;
use strum::EnumVariantNames;
use strum::IntoEnumIterator;
use thiserror::Error;

use super::Message;
use crate::configuration::Config;
use crate::configuration::ConfigKey;

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_TEMPERATURE: f64 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 1000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, EnumVariantNames, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ProviderName {
    OpenAI,
}

/// Normalized failure of a single provider call.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("request to the provider failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("provider returned an error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("malformed response from the provider: {0}")]
    MalformedResponse(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChatOptions {
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl Default for ChatOptions {
    fn default() -> ChatOptions {
        return ChatOptions {
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        };
    }
}

impl ChatOptions {
    pub fn from_config() -> Result<ChatOptions> {
        let mut options = ChatOptions::default();

        let model = Config::get(ConfigKey::Model);
        if !model.is_empty() {
            options.model = model;
        }

        let temperature = Config::get(ConfigKey::Temperature);
        if !temperature.is_empty() {
            options.temperature = temperature.parse::<f64>()?;
        }

        let max_tokens = Config::get(ConfigKey::MaxTokens);
        if !max_tokens.is_empty() {
            options.max_tokens = max_tokens.parse::<u32>()?;
        }

        return Ok(options);
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, EnumIter, EnumVariantNames, strum::Display)]
pub enum ImageSize {
    #[strum(serialize = "256x256")]
    Small,
    #[strum(serialize = "512x512")]
    Medium,
    #[default]
    #[strum(serialize = "1024x1024")]
    Large,
}

impl ImageSize {
    /// Accepts either the full resolution (`512x512`) or its edge length (`512`).
    pub fn parse(text: &str) -> Option<ImageSize> {
        let text = text.trim();
        return ImageSize::iter().find(|size| {
            let name = size.to_string();
            return name == text || name.split('x').next() == Some(text);
        });
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageOptions {
    pub size: ImageSize,
    pub count: u32,
}

impl Default for ImageOptions {
    fn default() -> ImageOptions {
        return ImageOptions {
            size: ImageSize::default(),
            count: 1,
        };
    }
}

impl ImageOptions {
    pub fn from_config() -> Result<ImageOptions> {
        let mut options = ImageOptions::default();

        let size = Config::get(ConfigKey::ImageSize);
        if !size.is_empty() {
            options.size = match ImageSize::parse(&size) {
                Some(size) => size,
                None => anyhow::bail!(format!("{size} is not a supported image size")),
            };
        }

        let count = Config::get(ConfigKey::ImageCount);
        if !count.is_empty() {
            options.count = count.parse::<u32>()?;
            if options.count == 0 {
                anyhow::bail!("Image count must be a positive integer");
            }
        }

        return Ok(options);
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageDescriptor {
    pub url: String,
}

#[async_trait]
pub trait Provider {
    fn name(&self) -> ProviderName;

    /// Used at startup to verify the endpoint and credential are configured
    /// before the first submission.
    async fn health_check(&self) -> Result<()>;

    /// Sends the full transcript as conversational context and returns the
    /// first completion choice as an assistant message. Exactly one request
    /// is made, failures are never retried.
    async fn complete_chat(
        &self,
        transcript: &[Message],
        options: &ChatOptions,
    ) -> Result<Message, ProviderError>;

    /// Requests images for a prompt, returned in the order the provider
    /// listed them.
    async fn generate_image(
        &self,
        prompt: &str,
        options: &ImageOptions,
    ) -> Result<Vec<ImageDescriptor>, ProviderError>;
}

pub type ProviderBox = Box<dyn Provider + Send + Sync>;
