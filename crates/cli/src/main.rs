//! Banter CLI: the main entry point.
//!
//! Commands:
//! - `serve`    - Start the HTTP API server
//! - `init`     - Write a starter `banter.toml`
//! - `doctor`   - Check configuration and database
//! - `sessions` - List sessions with their latest message
//! - `history`  - Print a session's messages
//! - `delete`   - Delete a session and its messages

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "banter",
    about = "Banter: chat sessions on top of a hosted NLP chatbot",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to ./banter.toml when present)
    #[arg(short, long, global = true, env = "BANTER_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Write a starter config file in the current directory
    Init,

    /// Check configuration and database
    Doctor,

    /// List sessions with their latest message
    Sessions,

    /// Print the messages of a session
    History {
        /// Session id
        session_id: String,
    },

    /// Delete a session and all of its messages
    Delete {
        /// Session id
        session_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }

    let config = cli.config.as_deref();
    match cli.command {
        Commands::Serve { port } => commands::serve::run(config, port).await?,
        Commands::Init => commands::init::run().await?,
        Commands::Doctor => commands::doctor::run(config).await?,
        Commands::Sessions => commands::sessions::list(config).await?,
        Commands::History { session_id } => commands::sessions::history(config, &session_id).await?,
        Commands::Delete { session_id } => commands::sessions::delete(config, &session_id).await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from(["banter", "history", "abc", "--verbose", "--config", "x.toml"]);
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
        assert!(matches!(cli.command, Commands::History { session_id } if session_id == "abc"));
    }

    #[test]
    fn serve_port_override() {
        let cli = Cli::parse_from(["banter", "serve", "--port", "8080"]);
        assert!(matches!(cli.command, Commands::Serve { port: Some(8080) }));
    }
}
