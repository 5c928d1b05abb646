use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;

use super::Outcome;
use super::Session;
use super::Submission;
use super::EMPTY_IMAGE_NOTICE;
use crate::domain::models::ChatOptions;
use crate::domain::models::ContentKind;
use crate::domain::models::ImageDescriptor;
use crate::domain::models::ImageOptions;
use crate::domain::models::Message;
use crate::domain::models::Mode;
use crate::domain::models::Provider;
use crate::domain::models::ProviderError;
use crate::domain::models::ProviderName;
use crate::domain::models::Role;
use crate::domain::models::Status;

enum Reply {
    Chat(Result<Message, ProviderError>),
    Image(Result<Vec<ImageDescriptor>, ProviderError>),
}

#[derive(Default)]
struct Calls {
    chat_transcripts: Vec<Vec<Message>>,
    image_prompts: Vec<String>,
}

struct StubProvider {
    replies: Mutex<VecDeque<Reply>>,
    calls: Arc<Mutex<Calls>>,
}

impl StubProvider {
    fn new(replies: Vec<Reply>) -> (StubProvider, Arc<Mutex<Calls>>) {
        let calls = Arc::new(Mutex::new(Calls::default()));
        let provider = StubProvider {
            replies: Mutex::new(replies.into_iter().collect()),
            calls: calls.clone(),
        };

        return (provider, calls);
    }

    fn next_reply(&self) -> Reply {
        return self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .expect("stub provider ran out of replies");
    }
}

#[async_trait]
impl Provider for StubProvider {
    fn name(&self) -> ProviderName {
        return ProviderName::OpenAI;
    }

    #[allow(clippy::implicit_return)]
    async fn health_check(&self) -> Result<()> {
        return Ok(());
    }

    #[allow(clippy::implicit_return)]
    async fn complete_chat(
        &self,
        transcript: &[Message],
        _options: &ChatOptions,
    ) -> Result<Message, ProviderError> {
        self.calls
            .lock()
            .unwrap()
            .chat_transcripts
            .push(transcript.to_vec());

        return match self.next_reply() {
            Reply::Chat(res) => res,
            Reply::Image(_) => panic!("expected a chat reply"),
        };
    }

    #[allow(clippy::implicit_return)]
    async fn generate_image(
        &self,
        prompt: &str,
        _options: &ImageOptions,
    ) -> Result<Vec<ImageDescriptor>, ProviderError> {
        self.calls
            .lock()
            .unwrap()
            .image_prompts
            .push(prompt.to_string());

        return match self.next_reply() {
            Reply::Image(res) => res,
            Reply::Chat(_) => panic!("expected an image reply"),
        };
    }
}

fn chat_ok(text: &str) -> Reply {
    return Reply::Chat(Ok(Message::new(Role::Assistant, text)));
}

fn chat_err() -> Reply {
    return Reply::Chat(Err(ProviderError::Authentication(
        "no API key configured".to_string(),
    )));
}

fn image_ok(urls: &[&str]) -> Reply {
    return Reply::Image(Ok(urls
        .iter()
        .map(|url| {
            return ImageDescriptor {
                url: url.to_string(),
            };
        })
        .collect()));
}

fn session_with(replies: Vec<Reply>) -> (Session, Arc<Mutex<Calls>>) {
    let (provider, calls) = StubProvider::new(replies);
    let session = Session::with_options(
        Box::new(provider),
        ChatOptions::default(),
        ImageOptions::default(),
    );
    return (session, calls);
}

mod submit {
    use super::*;

    #[tokio::test]
    async fn it_appends_user_and_assistant_messages() {
        let (mut session, _calls) = session_with(vec![chat_ok("Hi! How can I help?")]);
        session.submit("hello", Mode::Chat, |_| {}).await;

        let transcript = session.transcript();
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript[0].role, Role::User);
        assert_eq!(transcript[0].content, "hello");
        assert_eq!(transcript[1].role, Role::Assistant);
        assert_eq!(transcript[1].content, "Hi! How can I help?");
        assert_eq!(transcript[1].kind(), ContentKind::Text);
        assert_eq!(session.status(), Status::Idle);
        assert!(session.last_error().is_none());
    }

    #[tokio::test]
    async fn it_grows_by_two_per_successful_submission() {
        let (mut session, _calls) =
            session_with(vec![chat_ok("one"), chat_ok("two"), chat_ok("three")]);

        for (idx, text) in ["first", "second", "third"].iter().enumerate() {
            session.submit(text, Mode::Chat, |_| {}).await;
            assert_eq!(session.transcript().len(), 2 * (idx + 1));
        }
    }

    #[tokio::test]
    async fn it_sends_full_transcript_including_new_message() {
        let (mut session, calls) = session_with(vec![chat_ok("one"), chat_ok("two")]);
        session.submit("first", Mode::Chat, |_| {}).await;
        session.submit("second", Mode::Chat, |_| {}).await;

        let calls = calls.lock().unwrap();
        assert_eq!(calls.chat_transcripts.len(), 2);
        assert_eq!(calls.chat_transcripts[0].len(), 1);

        let contents = calls.chat_transcripts[1]
            .iter()
            .map(|message| return message.content.to_string())
            .collect::<Vec<String>>();
        assert_eq!(contents, vec!["first", "one", "second"]);
    }

    #[tokio::test]
    async fn it_forces_assistant_role_on_chat_replies() {
        let (mut session, _calls) = session_with(vec![Reply::Chat(Ok(Message::new(
            Role::System,
            "I am a system message",
        )))]);
        session.submit("hello", Mode::Chat, |_| {}).await;

        assert_eq!(session.transcript()[1].role, Role::Assistant);
    }

    #[tokio::test]
    async fn it_ignores_empty_text() {
        let (mut session, calls) = session_with(vec![]);
        session.submit("", Mode::Chat, |_| {}).await;
        session.submit("   \n\t", Mode::Image, |_| {}).await;

        assert!(session.transcript().is_empty());
        assert_eq!(session.status(), Status::Idle);
        assert!(calls.lock().unwrap().chat_transcripts.is_empty());
        assert!(calls.lock().unwrap().image_prompts.is_empty());
    }

    #[tokio::test]
    async fn it_ignores_submissions_while_pending() {
        let (mut session, calls) = session_with(vec![chat_ok("one")]);
        let submission = session.begin("first", Mode::Chat).unwrap();
        assert_eq!(session.status(), Status::Pending);
        assert_eq!(session.transcript().len(), 1);

        session.submit("second", Mode::Chat, |_| {}).await;
        assert_eq!(session.status(), Status::Pending);
        assert_eq!(session.transcript().len(), 1);
        assert!(calls.lock().unwrap().chat_transcripts.is_empty());

        let outcome = session.dispatch(&submission).await;
        session.finish(outcome);
        assert_eq!(session.status(), Status::Idle);
        assert_eq!(session.transcript().len(), 2);
    }

    #[tokio::test]
    async fn it_keeps_user_message_on_failure() {
        let (mut session, _calls) = session_with(vec![chat_err()]);
        session.submit("hello", Mode::Chat, |_| {}).await;

        assert_eq!(session.transcript().len(), 1);
        assert_eq!(session.transcript()[0].role, Role::User);
        assert_eq!(session.transcript()[0].content, "hello");
        assert_eq!(session.status(), Status::Idle);
        assert!(matches!(
            session.last_error(),
            Some(ProviderError::Authentication(_))
        ));
    }

    #[tokio::test]
    async fn it_adds_one_message_per_failed_submission() {
        let (mut session, _calls) = session_with(vec![chat_ok("one"), chat_err(), chat_ok("two")]);
        session.submit("first", Mode::Chat, |_| {}).await;
        session.submit("second", Mode::Chat, |_| {}).await;
        session.submit("third", Mode::Chat, |_| {}).await;

        let roles = session
            .transcript()
            .iter()
            .map(|message| return message.role)
            .collect::<Vec<Role>>();
        assert_eq!(
            roles,
            vec![
                Role::User,
                Role::Assistant,
                Role::User,
                Role::User,
                Role::Assistant
            ]
        );
    }

    #[tokio::test]
    async fn it_clears_last_error_when_next_submission_starts() {
        let (mut session, _calls) = session_with(vec![chat_err(), chat_ok("recovered")]);
        session.submit("first", Mode::Chat, |_| {}).await;
        assert!(session.last_error().is_some());

        let submission = session.begin("second", Mode::Chat).unwrap();
        assert!(session.last_error().is_none());

        let outcome = session.dispatch(&submission).await;
        session.finish(outcome);
        assert!(session.last_error().is_none());
        assert_eq!(session.transcript().len(), 3);
    }

    #[tokio::test]
    async fn it_appends_first_image_url() {
        let (mut session, calls) = session_with(vec![image_ok(&[
            "https://images.example.com/first.png",
            "https://images.example.com/second.png",
        ])]);
        session.submit("a red circle", Mode::Image, |_| {}).await;

        let transcript = session.transcript();
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript[1].role, Role::Assistant);
        assert_eq!(transcript[1].kind(), ContentKind::Image);
        assert_eq!(
            transcript[1].content,
            "https://images.example.com/first.png"
        );
        assert_eq!(
            calls.lock().unwrap().image_prompts,
            vec!["a red circle".to_string()]
        );
    }

    #[tokio::test]
    async fn it_appends_notice_when_no_images_returned() {
        let (mut session, _calls) = session_with(vec![image_ok(&[])]);
        session.submit("a red circle", Mode::Image, |_| {}).await;

        let transcript = session.transcript();
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript[1].role, Role::Assistant);
        assert_eq!(transcript[1].kind(), ContentKind::Notice);
        assert_eq!(transcript[1].content, EMPTY_IMAGE_NOTICE);
        assert!(!transcript[1].content.is_empty());
        assert!(session.last_error().is_none());
    }

    #[tokio::test]
    async fn it_records_image_failures() {
        let (mut session, _calls) = session_with(vec![Reply::Image(Err(
            ProviderError::MalformedResponse("missing data".to_string()),
        ))]);
        session.submit("a red circle", Mode::Image, |_| {}).await;

        assert_eq!(session.transcript().len(), 1);
        assert_eq!(session.status(), Status::Idle);
        assert!(matches!(
            session.last_error(),
            Some(ProviderError::MalformedResponse(_))
        ));
    }
}

mod phases {
    use super::*;

    #[tokio::test]
    async fn it_reports_pending_then_idle_to_observer() {
        let (mut session, _calls) = session_with(vec![chat_ok("one")]);
        let mut seen = vec![];
        session
            .submit("hello", Mode::Chat, |session| {
                seen.push((session.status(), session.transcript().len()));
            })
            .await;

        assert_eq!(seen, vec![(Status::Pending, 1), (Status::Idle, 2)]);
    }

    #[tokio::test]
    async fn it_does_not_notify_for_ignored_submissions() {
        let (mut session, _calls) = session_with(vec![]);
        let mut calls = 0;
        session
            .submit("  ", Mode::Chat, |_| {
                calls += 1;
            })
            .await;

        assert_eq!(calls, 0);
    }

    #[test]
    fn it_begins_with_optimistic_append() {
        let (mut session, _calls) = session_with(vec![]);
        let submission = session.begin("hello", Mode::Image);

        assert_eq!(
            submission,
            Some(Submission {
                mode: Mode::Image,
                prompt: "hello".to_string(),
            })
        );
        assert_eq!(session.transcript().len(), 1);
        assert_eq!(session.status(), Status::Pending);
    }

    #[test]
    fn it_ignores_outcome_without_pending_submission() {
        let (mut session, _calls) = session_with(vec![]);
        session.finish(Outcome::Chat(Ok(Message::new(Role::Assistant, "stray"))));

        assert!(session.transcript().is_empty());
        assert_eq!(session.status(), Status::Idle);
    }
}

mod replace_provider {
    use super::*;

    #[tokio::test]
    async fn it_keeps_transcript() {
        let (mut session, _calls) = session_with(vec![chat_err()]);
        session.submit("hello", Mode::Chat, |_| {}).await;

        let (provider, calls) = StubProvider::new(vec![chat_ok("Now I can answer")]);
        session.replace_provider(Box::new(provider));
        session.submit("hello again", Mode::Chat, |_| {}).await;

        assert_eq!(session.transcript().len(), 3);
        assert_eq!(session.transcript()[2].content, "Now I can answer");
        assert_eq!(calls.lock().unwrap().chat_transcripts[0].len(), 2);
    }
}
