#[cfg(test)]
#[path = "session_test.rs"]
mod tests;

use crate::domain::models::ChatOptions;
use crate::domain::models::ContentKind;
use crate::domain::models::ImageDescriptor;
use crate::domain::models::ImageOptions;
use crate::domain::models::Message;
use crate::domain::models::Mode;
use crate::domain::models::ProviderBox;
use crate::domain::models::ProviderError;
use crate::domain::models::Role;
use crate::domain::models::Status;

pub const EMPTY_IMAGE_NOTICE: &str = "Image generation failed: the provider returned no images.";

/// An accepted submission waiting on the provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Submission {
    pub mode: Mode,
    pub prompt: String,
}

pub enum Outcome {
    Chat(Result<Message, ProviderError>),
    Image(Result<Vec<ImageDescriptor>, ProviderError>),
}

/// Owns a single conversation. Submissions are strictly serialized: while one
/// is pending every new submission is dropped.
pub struct Session {
    transcript: Vec<Message>,
    status: Status,
    last_error: Option<ProviderError>,
    provider: ProviderBox,
    chat_options: ChatOptions,
    image_options: ImageOptions,
}

impl Session {
    pub fn with_options(
        provider: ProviderBox,
        chat_options: ChatOptions,
        image_options: ImageOptions,
    ) -> Session {
        return Session {
            transcript: vec![],
            status: Status::Idle,
            last_error: None,
            provider,
            chat_options,
            image_options,
        };
    }

    pub fn transcript(&self) -> &[Message] {
        return &self.transcript;
    }

    pub fn status(&self) -> Status {
        return self.status;
    }

    pub fn last_error(&self) -> Option<&ProviderError> {
        return self.last_error.as_ref();
    }

    pub fn provider(&self) -> &ProviderBox {
        return &self.provider;
    }

    pub fn chat_options(&self) -> &ChatOptions {
        return &self.chat_options;
    }

    pub fn image_options(&self) -> &ImageOptions {
        return &self.image_options;
    }

    pub fn chat_options_mut(&mut self) -> &mut ChatOptions {
        return &mut self.chat_options;
    }

    pub fn image_options_mut(&mut self) -> &mut ImageOptions {
        return &mut self.image_options;
    }

    /// Swaps the provider client in place, keeping the transcript. Used when
    /// the credential changes.
    pub fn replace_provider(&mut self, provider: ProviderBox) {
        tracing::debug!(provider = %provider.name(), "Replacing provider");
        self.provider = provider;
    }

    /// Runs one full submission cycle. Empty input or a pending submission
    /// makes this a no-op. `on_change` is called once the user message is
    /// appended and the session is pending, and again once the reply or error
    /// has been recorded.
    pub async fn submit(&mut self, text: &str, mode: Mode, mut on_change: impl FnMut(&Session)) {
        let submission = match self.begin(text, mode) {
            Some(submission) => submission,
            None => return,
        };
        on_change(self);

        let outcome = self.dispatch(&submission).await;
        self.finish(outcome);
        on_change(self);
    }

    /// Validates the input, appends the user message and marks the session
    /// pending. The user message is kept even if the provider call fails.
    pub fn begin(&mut self, text: &str, mode: Mode) -> Option<Submission> {
        if text.trim().is_empty() {
            tracing::debug!("Ignoring empty submission");
            return None;
        }
        if self.status == Status::Pending {
            tracing::debug!("Ignoring submission while another is pending");
            return None;
        }

        self.transcript.push(Message::new(Role::User, text));
        self.status = Status::Pending;
        self.last_error = None;

        return Some(Submission {
            mode,
            prompt: text.to_string(),
        });
    }

    pub async fn dispatch(&self, submission: &Submission) -> Outcome {
        match submission.mode {
            Mode::Chat => {
                let res = self
                    .provider
                    .complete_chat(&self.transcript, &self.chat_options)
                    .await;
                return Outcome::Chat(res);
            }
            Mode::Image => {
                let res = self
                    .provider
                    .generate_image(&submission.prompt, &self.image_options)
                    .await;
                return Outcome::Image(res);
            }
        }
    }

    pub fn finish(&mut self, outcome: Outcome) {
        if self.status != Status::Pending {
            tracing::debug!(status = %self.status, "Ignoring outcome without a pending submission");
            return;
        }

        let res = match outcome {
            Outcome::Chat(res) => res.map(|message| return message.with_role(Role::Assistant)),
            Outcome::Image(res) => res.map(|images| {
                if let Some(image) = images.first() {
                    return Message::new_with_kind(Role::Assistant, ContentKind::Image, &image.url);
                }

                tracing::warn!("Provider returned no images");
                return Message::new_with_kind(
                    Role::Assistant,
                    ContentKind::Notice,
                    EMPTY_IMAGE_NOTICE,
                );
            }),
        };

        match res {
            Ok(message) => {
                self.transcript.push(message);
            }
            Err(err) => {
                tracing::error!(error = ?err, "Submission failed");
                self.status = Status::Errored;
                self.last_error = Some(err);
            }
        }

        self.status = Status::Idle;
    }
}
