//! # oasdb CLI
//!
//! The `oasdb` binary ingests OpenAPI specifications into a normalized
//! SQLite database: one contract row per ingested document, plus endpoint,
//! parameter, request body, response and de-duplicated schema rows that can
//! be queried with plain SQL.
//!
//! ## Usage
//!
//! ```bash
//! oasdb --config ./config/oasdb.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `oasdb init` | Create the SQLite database and contract tables |
//! | `oasdb ingest <file>` | Ingest an OpenAPI YAML/JSON file as a new contract |
//! | `oasdb tree <file>` | Preview a spec's path tree without writing anything |
//! | `oasdb contracts` | List ingested contracts with row counts |
//! | `oasdb show <id>` | Print one contract's metadata, endpoints and schemas |
//!
//! ## Examples
//!
//! ```bash
//! # Initialize the database
//! oasdb init --config ./config/oasdb.toml
//!
//! # Ingest a spec, letting the file extension pick the format
//! oasdb ingest ./petstore.yaml --config ./config/oasdb.toml
//!
//! # Ingest with an explicit title and a database override
//! oasdb ingest ./petstore.json --title "Petstore v2" --db ./api.db
//!
//! # Preview the path tree
//! oasdb tree ./petstore.yaml --db ./api.db
//!
//! # Inspect what landed
//! oasdb contracts --db ./api.db
//! oasdb show 1 --db ./api.db
//! ```

mod config;
mod contracts;
mod db;
mod ingest;
mod loader;
mod migrate;
mod resolver;
mod schema_store;
mod tree;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use loader::SpecFormat;

/// Command-line interface for ingesting OpenAPI specs into SQLite.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file, or a `--db` flag naming the database directly. See
/// `config/oasdb.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "oasdb",
    about = "oasdb — ingest OpenAPI specs into a normalized, queryable SQLite database",
    version,
    long_about = "oasdb loads OpenAPI documents (YAML or JSON), de-duplicates their schema \
    fragments by content, resolves component references, and projects paths, parameters, \
    request bodies and responses into relational SQLite tables, one contract per document."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/oasdb.toml`. Database location and ingestion
    /// settings are read from this file.
    #[arg(long, global = true, default_value = "./config/oasdb.toml")]
    config: PathBuf,

    /// Path to the SQLite database.
    ///
    /// Overrides `db.path` from the configuration file; with this flag the
    /// configuration file becomes optional.
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and all contract tables
    /// (api_contracts, api_data_schemas, api_endpoints, api_parameters,
    /// api_request_bodies, api_responses). This command is idempotent;
    /// running it multiple times is safe, and `ingest` also ensures the
    /// schema on its own.
    Init,

    /// Ingest an OpenAPI spec file as a new contract.
    ///
    /// Parses the file, stores the document and its path tree on a contract
    /// row, de-duplicates every schema fragment by content, resolves
    /// `#/components/schemas/*` references, and inserts endpoint, parameter,
    /// request body and response rows. The whole document is committed in
    /// one transaction; malformed entries are skipped with warnings on
    /// stderr.
    Ingest {
        /// Path to the OpenAPI YAML or JSON file.
        file: PathBuf,

        /// Title recorded for the contract, overriding the document's
        /// `info.title`.
        #[arg(long)]
        title: Option<String>,

        /// Spec format: `auto`, `yaml`, or `json`.
        ///
        /// Without this flag the file extension decides, falling back to
        /// `ingest.default_format` from the configuration.
        #[arg(long)]
        format: Option<String>,
    },

    /// Print a spec's path tree without touching the database.
    ///
    /// Renders the same URL-segment tree that `ingest` stores on the
    /// contract row, with `[VERB]` leaves for each operation.
    Tree {
        /// Path to the OpenAPI YAML or JSON file.
        file: PathBuf,

        /// Spec format: `auto`, `yaml`, or `json` (see `ingest --format`).
        #[arg(long)]
        format: Option<String>,
    },

    /// List ingested contracts.
    ///
    /// Shows every contract with its component, title, endpoint and schema
    /// counts, and ingestion time.
    Contracts,

    /// Show one contract in full.
    ///
    /// Prints the contract's metadata, stored path tree, endpoints and
    /// schema definitions.
    Show {
        /// Contract id, as printed by `ingest` and `contracts`.
        id: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // --db makes the config file optional; when both are present the flag
    // wins for the database location.
    let cfg = match cli.db {
        Some(ref path) => {
            let mut cfg = config::load_config(&cli.config)
                .unwrap_or_else(|_| config::Config::with_db_path(path.clone()));
            cfg.db.path = path.clone();
            cfg
        }
        None => config::load_config(&cli.config)?,
    };

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Ingest {
            file,
            title,
            format,
        } => {
            let format = format.as_deref().map(SpecFormat::parse).transpose()?;
            ingest::run_ingest(&cfg, &file, title.as_deref(), format).await?;
        }
        Commands::Tree { file, format } => {
            let format = format.as_deref().map(SpecFormat::parse).transpose()?;
            tree::run_tree(&cfg, &file, format)?;
        }
        Commands::Contracts => {
            contracts::run_list(&cfg).await?;
        }
        Commands::Show { id } => {
            contracts::run_show(&cfg, id).await?;
        }
    }

    Ok(())
}
