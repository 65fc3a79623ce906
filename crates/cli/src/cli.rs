//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Splay - webhook bucket ingestion and fan-out forwarding
#[derive(Parser, Debug)]
#[command(
    name = "splay",
    author,
    version,
    about = "Webhook bucket ingestion, forwarding and realtime refresh",
    long_about = "Receives webhook calls on per-bucket endpoints, records them, relays each \n\
                  payload concurrently to every forward target of the bucket and signals \n\
                  subscribed dashboards once activity settles."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "SPLAY_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "SPLAY_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the ingestion service
    Serve(ServeArgs),

    /// Validate configuration file without serving
    Validate(ValidateArgs),

    /// Display configured buckets and forward targets
    Info(InfoArgs),

    /// Run a development receiver that logs every forwarded request
    Recv(RecvArgs),
}

/// Arguments for the `serve` command
#[derive(Parser, Debug, Clone)]
pub struct ServeArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, default_value = "splay.toml", env = "SPLAY_CONFIG")]
    pub config: PathBuf,

    /// Override listen host from configuration
    #[arg(long, env = "SPLAY_HOST")]
    pub host: Option<String>,

    /// Override listen port from configuration
    #[arg(long, env = "SPLAY_PORT")]
    pub port: Option<u16>,

    /// Prometheus exporter port (overrides configuration)
    #[arg(long, env = "SPLAY_METRICS_PORT")]
    pub metrics_port: Option<u16>,

    /// Bearer token required on ingestion requests
    #[arg(long, env = "SPLAY_INGEST_TOKEN", hide_env_values = true)]
    pub ingest_token: Option<String>,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "splay.toml", env = "SPLAY_CONFIG")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "splay.toml", env = "SPLAY_CONFIG")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// List forward targets under each bucket
    #[arg(long)]
    pub forwards: bool,
}

/// Arguments for the `recv` command
#[derive(Parser, Debug)]
pub struct RecvArgs {
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    #[arg(long, default_value = "9090")]
    pub port: u16,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
