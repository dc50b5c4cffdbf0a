//! # Quire - Page Resolver CLI
//!
//! The command-line binary for the Quire page-resolution layer.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                apps/quire (THE BINARY)              │
//! │                                                     │
//! │   ┌──────────────┐          ┌──────────────────┐    │
//! │   │     CLI      │          │  redb page store │    │
//! │   │    (clap)    │          │  (import, init)  │    │
//! │   └──────┬───────┘          └────────┬─────────┘    │
//! │          └─────────────┬─────────────┘              │
//! │                        ▼                            │
//! │                ┌───────────────┐                    │
//! │                │  quire-core   │                    │
//! │                │  (THE LOGIC)  │                    │
//! │                └───────────────┘                    │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! quire init
//! quire import -f pages.json
//! quire get "Main Page"
//! quire transclude "lc:HELLO"
//! quire status
//! quire compact
//! ```

use clap::Parser;
use quire::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    // Initialize tracing; QUIRE_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("QUIRE_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "quire=info,quire_core=warn".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    // Parse CLI arguments
    let cli = cli::Cli::parse();

    // Banner would corrupt machine-readable output
    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    // Execute command
    if let Err(e) = cli::execute(cli) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the Quire startup banner.
fn print_banner() {
    eprintln!(
        r#"
   ___  _   _ ___ ____  _____
  / _ \| | | |_ _|  _ \| ____|
 | | | | | | || || |_) |  _|
 | |_| | |_| || ||  _ <| |___
  \__\_\\___/|___|_| \_\_____|

  Page Resolver v{}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
