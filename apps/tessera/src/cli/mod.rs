//! # Tessera CLI Module
//!
//! This module implements the CLI interface for Tessera.
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `status` - Show store status
//! - `define` - Declare collection schemas from a JSON file
//! - `insert` - Insert a document into a collection
//! - `get` - Fetch documents through the read-rule gate
//! - `retract` - Tombstone a document
//! - `init` - Initialize a new database

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tessera_core::TesseraError;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Tessera - Document Store Server
///
/// A deterministic document store on an append-only triple log, with
/// schema-declared read rules gating every fetch.
#[derive(Parser, Debug)]
#[command(name = "tessera")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the triple log database
    #[arg(short = 'D', long, global = true, default_value = "tessera.redb")]
    pub database: PathBuf,

    /// Storage backend: "memory" (volatile) or "redb" (ACID database)
    #[arg(short = 'B', long, global = true, default_value = "redb")]
    pub backend: String,

    /// Path to a JSON schema file declaring collections and read rules
    #[arg(short = 'S', long, global = true)]
    pub schema: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(short, long)]
        port: Option<u16>,

        /// Path to a TOML configuration file (CLI flags win)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Show store status
    Status,

    /// Declare collection schemas from a JSON file
    Define {
        /// Path to the schema file (JSON map of collection name to schema)
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Insert a document into a collection
    Insert {
        /// Collection name
        collection: String,

        /// External document id (must not contain '#')
        id: String,

        /// The document as inline JSON
        document: Option<String>,

        /// Read the document from a JSON file instead
        #[arg(short, long, conflicts_with = "document")]
        file: Option<PathBuf>,
    },

    /// Fetch documents through the read-rule gate
    Get {
        /// Collection name
        collection: String,

        /// External document id; omit to fetch every visible member
        id: Option<String>,

        /// Query-scoped variable binding, `name=value` (repeatable)
        #[arg(long = "var", value_name = "NAME=VALUE")]
        vars: Vec<String>,
    },

    /// Tombstone every live attribute of a document
    Retract {
        /// Collection name
        collection: String,

        /// External document id
        id: String,
    },

    /// Initialize a new empty database
    Init {
        /// Force initialization even if database exists
        #[arg(short, long)]
        force: bool,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), TesseraError> {
    let backend = cli.backend.as_str();
    let schema = cli.schema.as_deref();
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Server { host, port, config }) => {
            cmd_server(
                &cli.database,
                backend,
                schema,
                host.as_deref(),
                port,
                config.as_deref(),
            )
            .await
        }
        Some(Commands::Status) => cmd_status(&cli.database, backend, schema, json_mode),
        Some(Commands::Define { file }) => cmd_define(&cli.database, backend, &file, json_mode),
        Some(Commands::Insert {
            collection,
            id,
            document,
            file,
        }) => cmd_insert(
            &cli.database,
            backend,
            schema,
            &collection,
            &id,
            document.as_deref(),
            file.as_deref(),
            json_mode,
        ),
        Some(Commands::Get {
            collection,
            id,
            vars,
        }) => cmd_get(
            &cli.database,
            backend,
            schema,
            &collection,
            id.as_deref(),
            &vars,
            json_mode,
        ),
        Some(Commands::Retract { collection, id }) => {
            cmd_retract(&cli.database, backend, schema, &collection, &id, json_mode)
        }
        Some(Commands::Init { force }) => cmd_init(&cli.database, backend, force),
        None => {
            // No subcommand - show status by default
            cmd_status(&cli.database, backend, schema, json_mode)
        }
    }
}
