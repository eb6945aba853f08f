//! Clap derive structures for the `lifeline` CLI.
//!
//! Defines the command tree, global flags, and shared value types.

use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// lifeline -- press-and-hold emergency alerts
#[derive(Debug, Parser)]
#[command(
    name = "lifeline",
    version,
    about = "Raise and manage emergency SOS alerts from the command line",
    long_about = "Raise an SOS alert through a press-and-hold countdown that can be\n\
        released before it fires, then inspect or resolve alerts on the backend.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Backend profile to use
    #[arg(long, short = 'p', env = "LIFELINE_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Backend URL including the API prefix (overrides profile)
    #[arg(long, short = 's', env = "LIFELINE_SERVER", global = true)]
    pub server: Option<String>,

    /// Bearer token
    #[arg(long, env = "LIFELINE_TOKEN", global = true, hide_env = true)]
    pub token: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "LIFELINE_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "LIFELINE_INSECURE", global = true)]
    pub insecure: bool,

    /// HTTP request timeout in seconds [default: profile or 15]
    #[arg(long, env = "LIFELINE_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Hold to raise an SOS alert (Ctrl-C releases the hold)
    Sos(SosArgs),

    /// Inspect and resolve raised alerts
    #[command(alias = "a")]
    Alerts(AlertsArgs),

    /// Check that the backend is reachable
    Health,

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── SOS ──────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SosArgs {
    /// Hold duration before the alert fires (e.g. "3s", "1500ms")
    #[arg(long, value_parser = humantime::parse_duration)]
    pub hold: Option<Duration>,

    /// Mark the alert as raised by automatic danger detection
    #[arg(long)]
    pub auto: bool,

    /// Release the hold after this long instead of waiting for Ctrl-C
    #[arg(long, value_parser = humantime::parse_duration)]
    pub release_after: Option<Duration>,

    /// Latitude to report (decimal degrees)
    #[arg(long, requires = "lon", allow_hyphen_values = true)]
    pub lat: Option<f64>,

    /// Longitude to report (decimal degrees)
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    pub lon: Option<f64>,

    /// Send the alert without a location, ignoring any configured one
    #[arg(long, conflicts_with_all = ["lat", "lon"])]
    pub no_location: bool,
}

// ── Alerts ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct AlertsArgs {
    #[command(subcommand)]
    pub command: AlertsCommand,
}

#[derive(Debug, Subcommand)]
pub enum AlertsCommand {
    /// List alerts raised by this account
    #[command(alias = "ls")]
    List,

    /// Show one alert
    Get {
        /// Alert ID (e.g. SOS_1a2b3c4d_1714564800)
        id: String,
    },

    /// Mark an alert as resolved
    Deactivate {
        /// Alert ID
        id: String,
    },
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Interactive setup wizard
    Init,

    /// Show current configuration (tokens redacted)
    Show,

    /// Print the config file path
    Path,

    /// Store a profile's bearer token in the system keyring
    SetToken {
        /// Profile name (defaults to the active profile)
        #[arg(long)]
        profile: Option<String>,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
