//! Command-line interface

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::logging::LoggingLevel;

/// Dr. Squid - fault injection for outbound calls, and the mock responder that renders them
#[derive(Parser, Debug)]
#[command(name = "dr-squid")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short, long, env = "DRSQUID_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "DRSQUID_PORT")]
    pub port: Option<u16>,

    /// Host to bind to
    #[arg(long, env = "DRSQUID_HOST")]
    pub host: Option<String>,

    /// Directory holding fault profiles
    #[arg(long, env = "DRSQUID_PROFILES_DIR", global = true)]
    pub profiles: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(
        long,
        default_value = "info",
        env = "DRSQUID_LOG_LEVEL",
        global = true
    )]
    pub log_level: String,

    /// Log format (text, json)
    #[arg(long, env = "DRSQUID_LOG_FORMAT", global = true)]
    pub log_format: Option<String>,

    /// Initial fault pipeline threshold (none, error, warn, info, debug); profiles may override it
    #[arg(long, env = "DRSQUID_FAULT_LOGGING", global = true)]
    pub fault_logging: Option<LoggingLevel>,

    /// Emit every fault pipeline message regardless of threshold
    #[arg(long, global = true)]
    pub force_logging: bool,

    /// Subcommand (optional - defaults to server mode)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the mock responder (default)
    Serve,

    /// Parse a fault profile and report what it configures
    Validate {
        /// Path to fault profile YAML file
        #[arg(required = true)]
        file: PathBuf,
    },

    /// Encode or decode decision tokens
    #[command(subcommand)]
    Token(TokenCommand),
}

/// Token subcommands
#[derive(Subcommand, Debug)]
pub enum TokenCommand {
    /// Build a token
    Encode {
        /// Client name
        #[arg(long)]
        client: String,

        /// Downstream service pattern
        #[arg(long)]
        pattern: String,

        /// Profile name
        #[arg(long)]
        profile: String,

        /// Outcome (success, failure, timeout)
        #[arg(long)]
        status: String,
    },

    /// Show the fields of a token
    Decode {
        /// Base64 token
        #[arg(required = true)]
        token: String,
    },
}
