use anyhow::Result;
use clap::{Parser, Subcommand};

use parley::{cli, repl};

#[derive(Debug, Parser)]
#[command(name = "parley")]
#[command(about = "Terminal chat client for a moderation-aware assistant backend")]
struct App {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Start an interactive chat session (the default)
    Chat {
        /// Language passed to the backend: en, fr, ht
        #[arg(long)]
        lang: Option<String>,
    },
    /// Send a single message and print the labeled reply
    Send {
        /// The message to send
        #[arg(trailing_var_arg = true, required = true)]
        message: Vec<String>,
        /// Language passed to the backend: en, fr, ht
        #[arg(long)]
        lang: Option<String>,
    },
    /// Show the backend health snapshot
    Health,
    /// Set the backend energy mode
    Mode {
        /// Target mode: normal or peak
        mode: String,
    },
    /// Request an audited backend shutdown
    Shutdown {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Show recent logged exchanges
    Transcript {
        /// Number of entries to show
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    /// Show the effective (merged) configuration
    Show,
    /// Write the default config to ~/.parley/config.toml
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
    /// Set a config value, e.g. `parley config set backend.base_url http://host:8000`
    Set { key: String, value: String },
    /// Reset the global config to defaults
    Reset,
}

fn main() -> Result<()> {
    let app = App::parse();

    match app.command {
        None => repl::run(None),
        Some(Commands::Chat { lang }) => repl::run(lang),
        Some(Commands::Send { message, lang }) => cli::run_send(&message.join(" "), lang),
        Some(Commands::Health) => cli::run_health(),
        Some(Commands::Mode { mode }) => cli::run_mode(&mode),
        Some(Commands::Shutdown { yes }) => cli::run_shutdown(yes),
        Some(Commands::Transcript { limit }) => cli::run_transcript(limit),
        Some(Commands::Config { action }) => match action {
            ConfigAction::Show => cli::run_config_show(),
            ConfigAction::Init { force } => cli::run_config_init(force),
            ConfigAction::Set { key, value } => cli::run_config_set(&key, &value),
            ConfigAction::Reset => cli::run_config_reset(),
        },
    }
}
