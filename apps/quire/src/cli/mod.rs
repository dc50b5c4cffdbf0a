//! # Quire CLI Module
//!
//! This module implements the CLI interface for Quire.
//!
//! ## Available Commands
//!
//! - `init` - Initialize a new page store
//! - `import` - Import pages from a JSON file
//! - `get` - Resolve a page and print its content
//! - `transclude` - Resolve a template reference (magic words included)
//! - `status` - Show store status
//! - `compact` - Compact the store file

mod commands;

use clap::{Parser, Subcommand};
use quire_core::{QuireError, ResolverConfig};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Quire - page resolution for wiki rendering
///
/// Resolves page references against a local page store the way the renderer
/// does: canonical titles, one redirect hop, magic words.
#[derive(Parser, Debug)]
#[command(name = "quire")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the page database
    #[arg(short = 'D', long, global = true, default_value = "quire.redb")]
    pub database: PathBuf,

    /// Path to a resolver configuration file (TOML)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

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
    /// Initialize a new empty page store
    Init {
        /// Force initialization even if the database exists
        #[arg(short, long)]
        force: bool,
    },

    /// Import pages from a JSON file
    Import {
        /// Path to the input file: [{"namespace", "title", "text", "redirect"}]
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Resolve a page and print its content
    Get {
        /// Page title (may carry a namespace prefix)
        title: String,

        /// Namespace of the title
        #[arg(short, long, default_value = "")]
        namespace: String,

        /// Return a redirect page's own text instead of following it
        #[arg(long)]
        no_redirect: bool,
    },

    /// Resolve a template reference such as `Infobox` or `lc:TEXT`
    Transclude {
        /// Template name, or `word:parameter` for magic words
        name: String,

        /// Namespace bare names resolve in
        #[arg(short, long, default_value = "Template")]
        namespace: String,
    },

    /// Show store status
    Status,

    /// Compact the store file
    Compact,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> Result<(), QuireError> {
    let json_mode = cli.json_mode;
    let config = match &cli.config {
        Some(path) => ResolverConfig::load(path)?,
        None => ResolverConfig::default(),
    };

    match cli.command {
        Some(Commands::Init { force }) => cmd_init(&cli.database, force),
        Some(Commands::Import { file }) => cmd_import(&cli.database, &config, json_mode, &file),
        Some(Commands::Get {
            title,
            namespace,
            no_redirect,
        }) => cmd_get(
            &cli.database,
            &config,
            json_mode,
            &namespace,
            &title,
            config.follow_redirects && !no_redirect,
        ),
        Some(Commands::Transclude { name, namespace }) => {
            cmd_transclude(&cli.database, &config, json_mode, &namespace, &name)
        }
        Some(Commands::Status) => cmd_status(&cli.database, json_mode),
        Some(Commands::Compact) => cmd_compact(&cli.database, json_mode),
        None => {
            // No subcommand - show status by default
            cmd_status(&cli.database, json_mode)
        }
    }
}
