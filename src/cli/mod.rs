mod subcommands;


use crate::config::load_config;
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "parley")]
#[command(about = "Conversational command router")]
pub struct Cli {
    /// Config file (defaults to ~/.parley/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Talk to the router as a configured caller
    Chat {
        /// Send one message and exit instead of starting a prompt loop
        #[arg(short, long)]
        message: Option<String>,
        #[command(flatten)]
        caller: CallerArgs,
    },
    /// Show a caller's conversation history
    History {
        #[command(flatten)]
        caller: CallerArgs,
        /// Most recent N messages
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Delete a caller's conversation history
    Clear {
        #[command(flatten)]
        caller: CallerArgs,
    },
    /// Print the intent a message classifies as, without dispatching it
    Classify {
        text: String,
    },
    /// List allowlisted commands a role may run
    Commands {
        #[arg(short, long)]
        role: String,
    },
    /// List catalog tools a role may call
    Tools {
        #[arg(short, long)]
        role: String,
        /// Only tools in this category
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Delete sessions idle for longer than the configured TTL
    Purge {
        /// Override the TTL, in hours
        #[arg(long)]
        older_than_hours: Option<u64>,
    },
}

#[derive(clap::Args)]
struct CallerArgs {
    #[arg(short, long)]
    user: String,
    #[arg(short, long)]
    tenant: String,
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Chat { message, caller } => {
            subcommands::chat(&config, &caller.user, &caller.tenant, message).await?;
        }
        Commands::History { caller, limit } => {
            subcommands::history(&config, &caller.user, &caller.tenant, limit).await?;
        }
        Commands::Clear { caller } => {
            subcommands::clear(&config, &caller.user, &caller.tenant).await?;
        }
        Commands::Classify { text } => {
            subcommands::classify(&config, &text)?;
        }
        Commands::Commands { role } => {
            subcommands::commands(&config, &role);
        }
        Commands::Tools { role, category } => {
            subcommands::tools(&config, &role, category.as_deref())?;
        }
        Commands::Purge { older_than_hours } => {
            subcommands::purge(&config, older_than_hours).await?;
        }
    }

    Ok(())
}
