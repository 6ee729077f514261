//! Command-line interface definition.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use wpics_core::TracingOutputFormat;

/// wp-ics-gen - WordPress events as an iCalendar feed
#[derive(Debug, Parser)]
#[command(name = "wp-ics-gen")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "WPICS_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v', global = true)]
    pub debug: bool,

    /// Log format: pretty, compact or json
    #[arg(
        long,
        env = "LOG_FORMAT",
        default_value = "compact",
        value_parser = parse_log_format,
        global = true
    )]
    pub log_format: TracingOutputFormat,

    #[command(flatten)]
    pub feed: FeedArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// Returns the command to run; `serve` when none is given.
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve)
    }
}

fn parse_log_format(value: &str) -> Result<TracingOutputFormat, String> {
    value.parse().map_err(|e: wpics_core::TracingError| e.to_string())
}

/// Settings of the feed, shared by all commands.
#[derive(Debug, Clone, Args)]
pub struct FeedArgs {
    /// URL of the WordPress events collection
    #[arg(long, env = "EVENTS_URL", global = true)]
    pub events_url: Option<String>,

    /// Public base URL of the feed, used for the landing page links
    #[arg(long, env = "BASE_URL", default_value = "", global = true)]
    pub base_url: String,

    /// Interval between checks (e.g. 30s, 5m, 1h)
    #[arg(
        long,
        env = "CHECK_INTERVAL",
        default_value = "5m",
        value_parser = humantime::parse_duration,
        global = true
    )]
    pub check_interval: Duration,

    /// Directory holding the snapshot file
    #[arg(long, env = "WORKING_DIR", default_value = ".", global = true)]
    pub working_dir: PathBuf,

    /// Address the feed server listens on
    #[arg(long, env = "SERVER_ADDRESS", default_value = "0.0.0.0:80", global = true)]
    pub address: SocketAddr,

    /// IANA timezone the event times are written in
    #[arg(long, env = "TIMEZONE", default_value = "Europe/Berlin", global = true)]
    pub timezone: String,
}

/// Available commands.
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Run the feed server in the foreground (default)
    Serve,

    /// Fetch and render the feed once
    Render {
        /// Write the calendar to this file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum ConfigAction {
    /// Dump the effective calendar and page settings
    Dump,

    /// Validate the configuration
    Validate,

    /// Show configuration file path
    Path,
}
