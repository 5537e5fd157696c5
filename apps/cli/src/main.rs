//! shiryoku - search nmap scan results
//!
//! Usage:
//!   shiryoku fields scan-results
//!   shiryoku compile nmap request.json
//!   shiryoku --config shiryoku.toml search dashboard - < request.json

use anyhow::Context;
use clap::{Parser, Subcommand};
use shiryoku_cli::{commands, logging, Config, Entity, SchemaCatalog};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "shiryoku", version, about = "Search nmap scan results")]
struct Cli {
    /// Configuration file (defaults to ./shiryoku.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the searchable fields of an entity
    Fields {
        #[arg(value_enum)]
        entity: Entity,
    },
    /// Print the backend query for a search request without running it
    Compile {
        #[arg(value_enum)]
        entity: Entity,
        /// Request file, or `-` for stdin
        request: String,
    },
    /// Run a search request and print `{"total", "results"}`
    Search {
        #[arg(value_enum)]
        entity: Entity,
        /// Request file, or `-` for stdin
        request: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let catalog = SchemaCatalog::new();

    let output = match cli.command {
        Command::Fields { entity } => {
            logging::init_simple_logging();
            commands::describe_fields(&catalog, entity)
        }
        Command::Compile { entity, request } => {
            logging::init_simple_logging();
            let params = commands::read_request(&request)?;
            commands::compile_request(&catalog, entity, &params)?
        }
        Command::Search { entity, request } => {
            let config = Config::load_from(cli.config.as_deref())
                .context("Failed to load configuration")?;
            config
                .validate()
                .map_err(|e| anyhow::anyhow!("Invalid configuration: {e}"))?;
            logging::init_logging(&config.logging).context("Failed to initialize logging")?;

            tracing::info!(
                version = env!("CARGO_PKG_VERSION"),
                entity = %entity,
                "Running search"
            );

            let params = commands::read_request(&request)?;
            commands::run_search(&config, &catalog, entity, &params).await?
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
