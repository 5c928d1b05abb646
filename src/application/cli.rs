use std::io;
use std::path;

use anyhow::bail;
use anyhow::Result;
use clap::builder::PossibleValuesParser;
use clap::value_parser;
use clap::Arg;
use clap::ArgAction;
use clap::Command;
use clap_complete::generate;
use clap_complete::Generator;
use clap_complete::Shell;
use dialoguer::Password;
use strum::VariantNames;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use yansi::Paint;

use crate::application::repl::help_text;
use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::ImageSize;
use crate::infrastructure::credentials::CredentialStore;
use crate::infrastructure::credentials::FileCredentialStore;

fn print_completions<G: Generator>(gen: G, cmd: &mut Command) {
    generate(gen, cmd, cmd.get_name().to_string(), &mut io::stdout());
}

async fn create_config_file() -> Result<()> {
    let config_file_path_str = Config::default(ConfigKey::ConfigFile);
    let config_file_path = path::PathBuf::from(&config_file_path_str);
    if config_file_path.exists() {
        bail!(format!(
            "Config file already exists at {config_file_path_str}"
        ));
    }

    if let Some(parent) = config_file_path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).await?;
        }
    }

    let mut file = fs::File::create(&config_file_path).await?;
    file.write_all(Config::serialize_default(build()).as_bytes())
        .await?;

    println!("Created default config file at {config_file_path_str}");
    return Ok(());
}

async fn save_key_interactive() -> Result<()> {
    let key = Password::new()
        .with_prompt("OpenAI API key")
        .interact()?;
    if key.trim().is_empty() {
        bail!("An empty API key cannot be saved");
    }

    let store = FileCredentialStore::default();
    store.set(&key).await?;
    println!("Saved API key to {}", store.file_path.to_string_lossy());

    return Ok(());
}

async fn print_key_status() -> Result<()> {
    let store = FileCredentialStore::default();
    let path = store.file_path.to_string_lossy().to_string();
    if store.get().await?.is_some() {
        println!("An API key is saved at {path}");
    } else {
        println!("No API key is saved. Run `parley key set` to add one.");
    }

    return Ok(());
}

fn subcommand_completions() -> Command {
    return Command::new("completions")
        .about("Generates shell completions.")
        .arg(
            clap::Arg::new("shell")
                .short('s')
                .long("shell")
                .help("Which shell to generate completions for.")
                .action(ArgAction::Set)
                .value_parser(value_parser!(Shell))
                .required(true),
        );
}

fn subcommand_config() -> Command {
    return Command::new("config")
        .about("Configuration file options.")
        .subcommand(
            Command::new("create").about("Saves the default config file to the configuration file path. This command will fail if the file exists already.")
        )
        .subcommand(
            Command::new("default").about("Outputs the default configuration file to stdout.")
        )
        .subcommand(
            Command::new("path").about("Returns the default path for the configuration file.")
        );
}

fn subcommand_key() -> Command {
    return Command::new("key")
        .about("Manage the saved API key. A saved key always takes precedence over --openai-token.")
        .subcommand(Command::new("set").about("Prompts for an API key and saves it."))
        .subcommand(Command::new("clear").about("Deletes the saved API key."))
        .subcommand(Command::new("status").about("Reports whether an API key is saved, without printing it."));
}

fn subcommand_chat() -> Command {
    return Command::new("chat").about("Start a new chat session. This is the default command.");
}

pub fn build() -> Command {
    let commands_text = help_text()
        .split('\n')
        .map(|line| {
            if line.starts_with('-') {
                return format!("  {line}");
            }
            if line.starts_with("COMMANDS:") {
                return Paint::new(format!("CHAT {line}"))
                    .underline()
                    .bold()
                    .to_string();
            }
            return line.to_string();
        })
        .collect::<Vec<String>>()
        .join("\n");

    let about = format!(
        "{}\n\nVersion: {}",
        env!("CARGO_PKG_DESCRIPTION"),
        env!("CARGO_PKG_VERSION"),
    );

    return Command::new("parley")
        .about(about)
        .author(env!("CARGO_PKG_AUTHORS"))
        .version(env!("CARGO_PKG_VERSION"))
        .after_help(commands_text)
        .arg_required_else_help(false)
        .subcommand(subcommand_chat())
        .subcommand(subcommand_completions())
        .subcommand(subcommand_config())
        .subcommand(subcommand_key())
        .arg(
            Arg::new(ConfigKey::ConfigFile.to_string())
                .short('c')
                .long(ConfigKey::ConfigFile.to_string())
                .env("PARLEY_CONFIG_FILE")
                .num_args(1)
                .help(format!("Path to configuration file [default: {}]", Config::default(ConfigKey::ConfigFile)))
                .global(true)
        )
        .arg(
            Arg::new(ConfigKey::CredentialFile.to_string())
                .long(ConfigKey::CredentialFile.to_string())
                .env("PARLEY_CREDENTIAL_FILE")
                .num_args(1)
                .help(format!("Path to the file holding the saved API key. [default: {}]", Config::default(ConfigKey::CredentialFile)))
                .global(true)
        )
        .arg(
            Arg::new(ConfigKey::Model.to_string())
                .short('m')
                .long(ConfigKey::Model.to_string())
                .env("PARLEY_MODEL")
                .num_args(1)
                .help(format!("The chat model to request completions from. [default: {}]", Config::default(ConfigKey::Model)))
                .global(true),
        )
        .arg(
            Arg::new(ConfigKey::Temperature.to_string())
                .long(ConfigKey::Temperature.to_string())
                .env("PARLEY_TEMPERATURE")
                .num_args(1)
                .help(format!("Sampling temperature for chat completions, usually between 0.0 and 2.0. [default: {}]", Config::default(ConfigKey::Temperature)))
                .global(true),
        )
        .arg(
            Arg::new(ConfigKey::MaxTokens.to_string())
                .long(ConfigKey::MaxTokens.to_string())
                .env("PARLEY_MAX_TOKENS")
                .num_args(1)
                .help(format!("Maximum number of tokens in a chat reply. [default: {}]", Config::default(ConfigKey::MaxTokens)))
                .global(true),
        )
        .arg(
            Arg::new(ConfigKey::ImageSize.to_string())
                .long(ConfigKey::ImageSize.to_string())
                .env("PARLEY_IMAGE_SIZE")
                .num_args(1)
                .help(format!("Resolution of generated images. [default: {}]", Config::default(ConfigKey::ImageSize)))
                .value_parser(PossibleValuesParser::new(ImageSize::VARIANTS))
                .global(true),
        )
        .arg(
            Arg::new(ConfigKey::ImageCount.to_string())
                .long(ConfigKey::ImageCount.to_string())
                .env("PARLEY_IMAGE_COUNT")
                .num_args(1)
                .help(format!("Number of images requested per prompt. Only the first is shown. [default: {}]", Config::default(ConfigKey::ImageCount)))
                .global(true),
        )
        .arg(
            Arg::new(ConfigKey::OpenAiURL.to_string())
                .long(ConfigKey::OpenAiURL.to_string())
                .env("PARLEY_OPENAI_URL")
                .num_args(1)
                .help(format!("OpenAI API URL. Can be swapped to a compatible proxy. [default: {}]", Config::default(ConfigKey::OpenAiURL)))
                .global(true),
        )
        .arg(
            Arg::new(ConfigKey::OpenAiToken.to_string())
                .long(ConfigKey::OpenAiToken.to_string())
                .env("PARLEY_OPENAI_TOKEN")
                .num_args(1)
                .help("OpenAI API token. Ignored once an API key has been saved with `parley key set` or `/key`.")
                .global(true),
        )
        .arg(
            Arg::new(ConfigKey::ProviderHealthCheckTimeout.to_string())
                .long(ConfigKey::ProviderHealthCheckTimeout.to_string())
                .env("PARLEY_PROVIDER_HEALTH_CHECK_TIMEOUT")
                .num_args(1)
                .help(format!("Time to wait in milliseconds before timing out when health checking the provider. [default: {}]", Config::default(ConfigKey::ProviderHealthCheckTimeout)))
                .global(true),
        );
}

pub async fn parse() -> Result<bool> {
    let matches = build().get_matches();

    match matches.subcommand() {
        Some(("chat", subcmd_matches)) => {
            Config::load(build(), vec![&matches, subcmd_matches]).await?;
        }
        Some(("completions", subcmd_matches)) => {
            if let Some(completions) = subcmd_matches.get_one::<Shell>("shell").copied() {
                let mut app = build();
                print_completions(completions, &mut app);
            }
            return Ok(false);
        }
        Some(("config", subcmd_matches)) => match subcmd_matches.subcommand() {
            Some(("create", _)) => {
                create_config_file().await?;
                return Ok(false);
            }
            Some(("default", _)) => {
                println!("{}", Config::serialize_default(build()));
                return Ok(false);
            }
            Some(("path", _)) => {
                println!("{}", Config::default(ConfigKey::ConfigFile));
                return Ok(false);
            }
            _ => {
                subcommand_config().print_long_help()?;
                return Ok(false);
            }
        },
        Some(("key", subcmd_matches)) => {
            Config::load(build(), vec![&matches, subcmd_matches]).await?;
            match subcmd_matches.subcommand() {
                Some(("set", _)) => {
                    save_key_interactive().await?;
                }
                Some(("clear", _)) => {
                    FileCredentialStore::default().clear().await?;
                    println!("Cleared the saved API key");
                }
                Some(("status", _)) => {
                    print_key_status().await?;
                }
                _ => {
                    subcommand_key().print_long_help()?;
                }
            }
            return Ok(false);
        }
        _ => {
            Config::load(build(), vec![&matches]).await?;
        }
    }

    return Ok(true);
}
