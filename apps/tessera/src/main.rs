//! # Tessera - Document Store Server
//!
//! The main binary for the Tessera triple-log document store.
//!
//! This application provides:
//! - HTTP REST API server (axum-based)
//! - CLI interface for store operations
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────┐
//! │              apps/tessera (THE BINARY)             │
//! │                                                    │
//! │   ┌─────────────┐           ┌─────────────┐        │
//! │   │   CLI       │           │   HTTP API  │        │
//! │   │  (clap)     │           │   (axum)    │        │
//! │   └──────┬──────┘           └──────┬──────┘        │
//! │          │                        │                │
//! │          └───────────┬────────────┘                │
//! │                      ▼                             │
//! │             ┌────────────────┐                     │
//! │             │  tessera-core  │                     │
//! │             │  (THE LOGIC)   │                     │
//! │             └────────────────┘                     │
//! └────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start the HTTP server
//! tessera server --host 0.0.0.0 --port 8080
//!
//! # CLI operations
//! tessera status
//! tessera insert users alice '{"name": "Alice"}'
//! tessera get users alice --var user_id=alice
//! ```

use clap::Parser;
use tessera::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // Initialize tracing — TESSERA_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("TESSERA_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "tessera=info,tower_http=debug".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    // Parse CLI arguments
    let cli = cli::Cli::parse();

    // Display startup banner
    if !cli.quiet {
        print_banner();
    }

    // Execute command
    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the Tessera startup banner.
fn print_banner() {
    println!(
        r#"
  ████████╗███████╗███████╗███████╗███████╗██████╗  █████╗
  ╚══██╔══╝██╔════╝██╔════╝██╔════╝██╔════╝██╔══██╗██╔══██╗
     ██║   █████╗  ███████╗███████╗█████╗  ██████╔╝███████║
     ██║   ██╔══╝  ╚════██║╚════██║██╔══╝  ██╔══██╗██╔══██║
     ██║   ███████╗███████║███████║███████╗██║  ██║██║  ██║
     ╚═╝   ╚══════╝╚══════╝╚══════╝╚══════╝╚═╝  ╚═╝╚═╝  ╚═╝

  Document Store Server v{}

  Deterministic • Append-only • Rule-gated
"#,
        env!("CARGO_PKG_VERSION")
    );
}
