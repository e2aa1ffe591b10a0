//! Main entry point for the MarketDesk operator console.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use shared::{config::Config, models::UserId};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

/// MarketDesk CLI
#[derive(Parser)]
#[command(name = "marketdesk")]
#[command(about = "Operator console for MarketDesk marketplace chat", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Subcommands for the MarketDesk CLI
#[derive(Subcommand)]
enum Commands {
    /// Open an interactive chat with a marketplace user
    Chat {
        /// Identifier of the user to chat with
        #[arg(long, short, help = "Identifier of the user to chat with (e.g., seller-42)")]
        peer: UserId,

        /// Path to the configuration file (optional)
        #[arg(
            long,
            short,
            help = "Path to the configuration file (e.g., marketdesk.yaml or marketdesk.json). If not provided, defaults and MARKETDESK_* variables are used."
        )]
        config: Option<PathBuf>,

        /// Operator identifier, overriding the configuration
        #[arg(long, short, help = "Operator identifier, overriding `user_id` from the configuration")]
        user: Option<UserId>,
    },

    /// List the operator's conversations
    Conversations {
        /// Path to the configuration file (optional)
        #[arg(long, short, help = "Path to the configuration file (yaml or json)")]
        config: Option<PathBuf>,

        /// Operator identifier, overriding the configuration
        #[arg(long, short, help = "Operator identifier, overriding `user_id` from the configuration")]
        user: Option<UserId>,

        /// Print the list as JSON
        #[arg(long, help = "Print the list as JSON instead of a table")]
        json: bool,
    },

    /// Generate shell completion scripts for the CLI
    Completion {
        /// The shell type for which to generate the completion script (e.g., bash, zsh, fish, powershell)
        #[arg(
            long,
            short,
            help = "The shell type for which to generate the completion script (e.g., bash, zsh, fish, powershell)"
        )]
        shell: clap_complete::Shell,
    },

    /// Generate a configuration file
    Config {
        /// Format of the configuration file to generate (yaml or json). Defaults to yaml.
        #[arg(
            long,
            short,
            help = "Format of the configuration file to generate (yaml or json). Defaults to yaml."
        )]
        format: Option<String>,
    },
}

/// Install the stderr log subscriber. `RUST_LOG` wins over `default_level`.
fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{default_level},hyper=warn,reqwest=warn")));
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .try_init();
}

fn load(config: Option<PathBuf>, user: Option<UserId>) -> Result<Config> {
    let config = Config::load_config(config, user).context("failed to load configuration")?;
    init_tracing(&config.log_level);
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Commands::Chat { peer, config, user } => {
            let config = load(config, user)?;
            commands::chat::run_chat(config, peer).await?;
        }
        Commands::Conversations { config, user, json } => {
            let config = load(config, user)?;
            commands::conversations::list_conversations(&config, json).await?;
        }
        Commands::Completion { shell } => {
            commands::completion::generate_completion(shell);
        }
        Commands::Config { format } => {
            init_tracing("warn");
            let format = format.unwrap_or_else(|| "yaml".to_string());
            commands::config::generate_config(&format)?;
        }
    }

    Ok(())
}
