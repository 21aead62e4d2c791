//! ArenaGuard CLI, the operator entry point.
//!
//! Commands:
//! - `check-url` : Run a URL through the egress guard
//! - `inspect`   : Show what the sandbox would do with a tool call
//! - `estimate`  : Price a token count against the session budget
//! - `config`    : Show, validate, create or locate the configuration

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "arenaguard",
    about = "ArenaGuard: sandboxed browser sessions for untrusted AI agents",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file to use instead of ~/.arenaguard/config.toml
    #[arg(short, long, global = true, env = "ARENAGUARD_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether a URL may be reached
    CheckUrl {
        url: String,

        /// Apply navigation rules (loopback on any port) instead of api_call rules
        #[arg(short, long)]
        navigation: bool,
    },

    /// Run a tool call through allowlist, argument validation and content scan
    Inspect {
        /// Tool name, e.g. `click`
        tool: String,

        /// Arguments as a JSON object
        #[arg(default_value = "{}")]
        args: String,
    },

    /// Estimate the cost of a token count
    Estimate {
        /// Model identifier, e.g. `claude-opus-4-20250514`
        #[arg(short, long)]
        model: String,

        /// Input tokens
        #[arg(short, long, default_value_t = 0)]
        input: u64,

        /// Output tokens
        #[arg(short, long, default_value_t = 0)]
        output: u64,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
    /// Validate the configuration file
    Validate,
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the default configuration file path
    Path,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::CheckUrl { url, navigation } => commands::check_url::run(config_path, &url, navigation)?,
        Commands::Inspect { tool, args } => commands::inspect::run(config_path, &tool, &args)?,
        Commands::Estimate { model, input, output } => {
            commands::estimate::run(config_path, &model, input, output)?
        }
        Commands::Config { action } => match action.unwrap_or(ConfigAction::Show) {
            ConfigAction::Show => commands::config_cmd::show(config_path)?,
            ConfigAction::Validate => commands::config_cmd::validate(config_path)?,
            ConfigAction::Init { force } => commands::config_cmd::init(config_path, force)?,
            ConfigAction::Path => commands::config_cmd::path()?,
        },
    }

    Ok(())
}
