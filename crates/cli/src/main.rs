//! Order service CLI - database migrations and order inspection.
//!
//! # Usage
//!
//! ```bash
//! # Apply pending migrations
//! order-cli migrate
//!
//! # Print one order (with items) straight from the database
//! order-cli show b563feb7b2b84b6test
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `show` - Fetch a single order from the durable store, bypassing the cache

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "order-cli")]
#[command(author, version, about = "Order service CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Print an order from the database as JSON
    Show {
        /// Order uid to look up
        order_uid: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Show { order_uid } => commands::show::run(&order_uid).await?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_show() {
        let cli = Cli::try_parse_from(["order-cli", "show", "A1"]);
        assert!(matches!(
            cli.map(|c| c.command),
            Ok(Commands::Show { order_uid }) if order_uid == "A1"
        ));
    }

    #[test]
    fn test_show_requires_uid() {
        assert!(Cli::try_parse_from(["order-cli", "show"]).is_err());
    }
}
