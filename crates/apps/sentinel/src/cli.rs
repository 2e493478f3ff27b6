use clap::{Args, Parser, Subcommand};
use mailscan::{DisplayFilter, ScanMode};
use std::path::PathBuf;

/// Sentinel - Phishing scanner for a mailbox
#[derive(Parser)]
#[command(name = "sentinel")]
#[command(about = "Scan a mailbox for phishing through the scan backend")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Scanner config file (defaults to scanner.json in the config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load a mailbox and scan it for phishing
    Scan(ScanArgs),

    /// Check that the scan backend is reachable
    Health,

    /// Print where the scanner config file is read from
    ConfigPath,

    /// Write a scanner config file populated with the defaults
    ConfigInit {
        /// Replace an existing config file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args)]
pub struct ScanArgs {
    /// Session (user) whose mailbox to load
    #[arg(long)]
    pub session: String,

    /// Which messages to scan: all, unread or selected
    #[arg(long, default_value = "all")]
    pub mode: ScanMode,

    /// Message id to select before scanning (repeatable)
    #[arg(long = "select", value_name = "ID")]
    pub select: Vec<String>,

    /// Which records to print afterwards: all, phishing, safe or selected
    #[arg(long, default_value = "phishing")]
    pub show: DisplayFilter,

    /// Access token to use instead of the configured token broker
    #[arg(long, env = "SENTINEL_ACCESS_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Provider user id sent with --token (defaults to the session id)
    #[arg(long)]
    pub user_id: Option<String>,

    /// Print the scan report as JSON
    #[arg(long)]
    pub json: bool,
}
