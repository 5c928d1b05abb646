#[cfg(test)]
#[path = "repl_test.rs"]
mod tests;

use anyhow::Result;
use dialoguer::Confirm;
use dialoguer::Input;
use dialoguer::Password;
use strum::VariantNames;
use tokio::task;
use yansi::Paint;

use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::ChatOptions;
use crate::domain::models::ContentKind;
use crate::domain::models::ImageOptions;
use crate::domain::models::ImageSize;
use crate::domain::models::Message;
use crate::domain::models::Mode;
use crate::domain::models::ProviderName;
use crate::domain::models::Requirement;
use crate::domain::models::Role;
use crate::domain::models::SlashCommand;
use crate::domain::models::Status;
use crate::domain::services::Session;
use crate::infrastructure::credentials::CredentialStoreBox;
use crate::infrastructure::credentials::FileCredentialStore;
use crate::infrastructure::providers::ProviderManager;

const LINE_WIDTH: usize = 100;

pub fn help_text() -> String {
    let text = r#"
COMMANDS:
- /chat - Switch to chat mode. Messages are answered by the chat model with the whole conversation as context.
- /image (/i) - Switch to image mode. Messages are used as prompts to generate an image.
- /size [256,512,1024] - Sets the resolution of generated images.
- /model (/m) [MODEL_NAME] - Sets the chat model. Prints the current model when no name is given.
- /key - Prompts for an API key, saves it and reconnects with it.
- /forget-key - Deletes the saved API key.
- /requirement (/r) - Describe a purpose, audience, goal and concern, and ask for advice on it.
- /quit /exit (/q) - Exit Parley.
- /help (/h) - Provides this help menu.
        "#;

    return text.trim().to_string();
}

fn role_label(role: Role) -> &'static str {
    match role {
        Role::User => return "You",
        Role::Assistant => return "Assistant",
        Role::System => return "System",
    }
}

pub fn format_message(message: &Message, line_max_width: usize) -> String {
    let header = format!(
        "{} ({})",
        role_label(message.role),
        message.timestamp().format("%H:%M:%S")
    );

    let body = match message.kind() {
        ContentKind::Text => message.as_string_lines(line_max_width).join("\n"),
        ContentKind::Image => format!("[image] {}", message.content),
        ContentKind::Notice => format!("[notice] {}", message.content),
    };

    return format!("{header}\n{body}");
}

async fn read_line(prompt: String) -> Option<String> {
    let res = task::spawn_blocking(move || {
        return Input::<String>::new()
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text();
    })
    .await;

    match res {
        Ok(Ok(line)) => return Some(line),
        Ok(Err(err)) => {
            tracing::debug!(error = ?err, "Input closed");
            return None;
        }
        Err(err) => {
            tracing::error!(error = ?err, "Input task failed");
            return None;
        }
    }
}

async fn read_secret(prompt: String) -> Result<String> {
    let key = task::spawn_blocking(move || {
        return Password::new().with_prompt(prompt).interact();
    })
    .await??;

    return Ok(key);
}

async fn confirm(prompt: String) -> Result<bool> {
    let res = task::spawn_blocking(move || {
        return Confirm::new()
            .with_prompt(prompt)
            .default(true)
            .interact();
    })
    .await??;

    return Ok(res);
}

fn render_new_messages(session: &Session, rendered: &mut usize) {
    for message in &session.transcript()[*rendered..] {
        let formatted = format_message(message, LINE_WIDTH);
        match message.kind() {
            ContentKind::Notice => println!("{}\n", Paint::yellow(formatted)),
            _ if message.role == Role::User => println!("{}\n", Paint::cyan(formatted)),
            _ => println!("{formatted}\n"),
        }
    }

    *rendered = session.transcript().len();
}

pub struct Repl {
    session: Session,
    store: CredentialStoreBox,
    mode: Mode,
    rendered: usize,
}

impl Repl {
    pub fn new(session: Session, store: CredentialStoreBox) -> Repl {
        return Repl {
            session,
            store,
            mode: Mode::default(),
            rendered: 0,
        };
    }

    async fn reconnect(&mut self) -> Result<()> {
        let provider = ProviderManager::get(ProviderName::OpenAI, self.store.as_ref()).await?;
        self.session.replace_provider(provider);
        return Ok(());
    }

    async fn has_credential(&self) -> Result<bool> {
        if self.store.get().await?.is_some() {
            return Ok(true);
        }

        return Ok(!Config::get(ConfigKey::OpenAiToken).trim().is_empty());
    }

    /// True when the provider fails its health check and no credential is
    /// available that could fix it.
    async fn needs_credential(&self) -> Result<bool> {
        if let Err(err) = self.session.provider().health_check().await {
            println!("{}", Paint::yellow(format!("{err}")));
            return Ok(!self.has_credential().await?);
        }

        return Ok(false);
    }

    async fn save_key(&mut self, key: &str) -> Result<()> {
        if key.trim().is_empty() {
            println!("{}", Paint::yellow("No API key entered, nothing was saved."));
            return Ok(());
        }

        self.store.set(key).await?;
        self.reconnect().await?;
        println!("{}", Paint::green("API key saved."));

        return Ok(());
    }

    async fn forget_key(&mut self) -> Result<()> {
        self.store.clear().await?;
        self.reconnect().await?;
        println!("Saved API key deleted.\n");

        return Ok(());
    }

    async fn configure_key(&mut self) -> Result<()> {
        let key = read_secret("OpenAI API key".to_string()).await?;
        return self.save_key(&key).await;
    }

    async fn describe_requirement(&mut self) -> Result<()> {
        let mut fields = vec![];
        for prompt in [
            "What do you want to do",
            "Who is it for",
            "What result do you hope for",
            "What are you concerned about",
        ] {
            match read_line(prompt.to_string()).await {
                Some(answer) => fields.push(answer),
                None => return Ok(()),
            }
        }

        let requirement = Requirement {
            purpose: fields[0].to_string(),
            target: fields[1].to_string(),
            goal: fields[2].to_string(),
            concern: fields[3].to_string(),
        };
        if !requirement.is_complete() {
            println!(
                "{}",
                Paint::yellow("All four answers are needed to describe a requirement.")
            );
            return Ok(());
        }

        println!("\n{}\n", requirement.to_prompt());
        if !confirm(format!("Send this prompt in {} mode?", self.mode)).await? {
            return Ok(());
        }

        self.submit_requirement(&requirement).await;
        return Ok(());
    }

    async fn submit_requirement(&mut self, requirement: &Requirement) {
        if !requirement.is_complete() {
            return;
        }

        self.submit(&requirement.to_prompt(), self.mode).await;
    }

    async fn submit(&mut self, text: &str, mode: Mode) {
        let rendered = &mut self.rendered;
        self.session
            .submit(text, mode, |session| {
                render_new_messages(session, rendered);

                if session.status() == Status::Pending {
                    let indicator = match mode {
                        Mode::Chat => "Thinking...",
                        Mode::Image => "Generating image...",
                    };
                    println!("{}", Paint::new(indicator).dimmed());
                    return;
                }

                tracing::debug!(status = %session.status(), "Submission finished");
                if let Some(err) = session.last_error() {
                    eprintln!("{}\n", Paint::red(format!("Error: {err}")));
                }
            })
            .await;
    }

    async fn run_command(&mut self, cmd: &SlashCommand) -> Result<()> {
        if cmd.is_help() {
            println!("{}\n", help_text());
        } else if cmd.is_chat_mode() {
            self.mode = Mode::Chat;
            println!("Switched to chat mode.\n");
        } else if cmd.is_image_mode() {
            self.mode = Mode::Image;
            println!("Switched to image mode.\n");
        } else if cmd.is_image_size() {
            match cmd.args.first() {
                Some(arg) => match ImageSize::parse(arg) {
                    Some(size) => {
                        self.session.image_options_mut().size = size;
                        println!("Images will be generated at {size}.\n");
                    }
                    None => {
                        let msg = format!(
                            "{arg} is not a supported size. Use one of: {}",
                            ImageSize::VARIANTS.join(", ")
                        );
                        println!("{}\n", Paint::yellow(msg));
                    }
                },
                None => {
                    println!(
                        "Images are generated at {}. Available sizes: {}\n",
                        self.session.image_options().size,
                        ImageSize::VARIANTS.join(", ")
                    );
                }
            }
        } else if cmd.is_model_set() {
            match cmd.args.first() {
                Some(model) => {
                    self.session.chat_options_mut().model = model.to_string();
                    println!("{model} has entered the chat.\n");
                }
                None => {
                    println!("The current model is {}.\n", self.session.chat_options().model);
                }
            }
        } else if cmd.is_key_set() {
            self.configure_key().await?;
        } else if cmd.is_key_clear() {
            self.forget_key().await?;
        } else if cmd.is_requirement() {
            self.describe_requirement().await?;
        }

        return Ok(());
    }

    /// Returns true when the loop should stop. Command failures are reported
    /// and leave the session running.
    pub async fn handle_line(&mut self, line: &str) -> bool {
        let cmd = match SlashCommand::parse(line) {
            Some(cmd) => cmd,
            None => {
                self.submit(line, self.mode).await;
                return false;
            }
        };

        if cmd.is_quit() {
            return true;
        }

        if let Err(err) = self.run_command(&cmd).await {
            tracing::error!(error = ?err, command = line, "Command failed");
            eprintln!("{}\n", Paint::red(format!("Error: {err}")));
        }

        return false;
    }

    pub async fn run(&mut self) -> Result<()> {
        println!(
            "Hey there! Chat away, or switch to /image to generate pictures. Type /help for commands.\n"
        );

        if self.needs_credential().await? {
            println!("Please configure an API key to get started.");
            if let Err(err) = self.configure_key().await {
                eprintln!("{}\n", Paint::red(format!("Error: {err}")));
            }
        }

        loop {
            let line = match read_line(self.mode.to_string()).await {
                Some(line) => line,
                None => break,
            };
            if line.trim().is_empty() {
                continue;
            }

            if self.handle_line(&line).await {
                break;
            }
        }

        return Ok(());
    }
}

pub async fn start() -> Result<()> {
    let store: CredentialStoreBox = Box::new(FileCredentialStore::default());
    let provider = ProviderManager::get(ProviderName::OpenAI, store.as_ref()).await?;
    let session = Session::with_options(
        provider,
        ChatOptions::from_config()?,
        ImageOptions::from_config()?,
    );

    let mut repl = Repl::new(session, store);
    return repl.run().await;
}
