//! CLI arguments and subcommands for uwsgi-stats-exporter.
//!
//! This module defines the command-line interface structure using the clap library,
//! including all flags, options, and subcommands.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Log level options for CLI parsing
#[derive(Debug, Clone, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Configuration format options for output
#[derive(Debug, Clone, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "uwsgi-stats-exporter",
    about = "Prometheus exporter for uWSGI stats servers",
    long_about = "Prometheus exporter for uWSGI stats servers.\n\n\
                  Reads the JSON stats document from a file, a unix socket, or a glob of \
                  either, and exposes per-instance, per-socket, per-worker, per-app and \
                  per-core metrics for Prometheus to scrape.",
    version,
    propagate_version = true
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Address to listen on for HTTP requests (ip:port)
    #[arg(long)]
    pub listen_address: Option<String>,

    /// Stats source: file://, fileglob://, unix://, unixglob:// or http:// address
    #[arg(long, alias = "uwsgi-stats-address")]
    pub stats_address: Option<String>,

    /// Per-source fetch timeout in milliseconds
    #[arg(long)]
    pub fetch_timeout_ms: Option<u64>,

    /// Maximum number of sources fetched concurrently
    #[arg(long)]
    pub max_concurrent_fetches: Option<usize>,

    /// Log level [default: info, or log_level from the config file]
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Config file (YAML/JSON/TOML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Disable all config file loading
    #[arg(long)]
    pub no_config: bool,

    /// Print effective merged config and exit
    #[arg(long)]
    pub show_config: bool,

    /// Output format for --show-config
    #[arg(long, value_enum, default_value = "yaml")]
    pub config_format: ConfigFormat,

    /// Validate config and exit (return code 1 on error)
    #[arg(long)]
    pub check_config: bool,

    /// Disable /health endpoint
    #[arg(long)]
    pub disable_health: bool,

    /// Disable internal uwsgi_exporter_* metrics
    #[arg(long)]
    pub disable_telemetry: bool,
}

/// Subcommands for additional functionality
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate configuration files
    Config {
        /// Output file path ("-" for stdout)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "yaml")]
        format: ConfigFormat,

        /// Include comments and examples
        #[arg(long)]
        commented: bool,
    },

    /// Run collections against the configured source and print the results
    Test {
        /// Number of collection runs
        #[arg(short = 'n', long, default_value_t = 1)]
        iterations: usize,

        /// Print every metric sample
        #[arg(long)]
        verbose: bool,
    },
}
