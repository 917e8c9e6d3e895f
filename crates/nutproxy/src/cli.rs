//! Clap derive structures for the `nutproxy` CLI.
//!
//! Global flags override the configuration file and `NUTPROXY_*`
//! environment variables.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// nutproxy -- NUT server backed by apcupsd
#[derive(Debug, Parser)]
#[command(
    name = "nutproxy",
    version,
    about = "Serve apcupsd UPS telemetry to Network UPS Tools clients",
    long_about = "Speaks the NUT (upsd) text protocol and answers every variable\n\
        request by running apcupsd's `apcaccess -h <target> -u`.\n\n\
        Runs the server when no command is given.",
    propagate_version = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Option<Command>,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Default, Args)]
pub struct GlobalOpts {
    /// Configuration file (defaults to the platform config directory)
    #[arg(long, short = 'c', env = "NUTPROXY_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Address to listen on
    #[arg(long, short = 'a', global = true)]
    pub address: Option<String>,

    /// Port to listen on
    #[arg(long, short = 'p', global = true)]
    pub port: Option<u16>,

    /// Host running apcupsd
    #[arg(long, short = 't', global = true)]
    pub target_address: Option<String>,

    /// UPS name clients use to address this UPS
    #[arg(long, short = 'n', global = true)]
    pub ups_name: Option<String>,

    /// UPS description reported by LIST UPS
    #[arg(long, short = 'd', global = true)]
    pub ups_description: Option<String>,

    /// Path to the apcaccess executable
    #[arg(long, short = 'e', global = true)]
    pub apcaccess_executable: Option<PathBuf>,

    /// Per-request read/write timeout (e.g. 30s, 1m)
    #[arg(long, global = true)]
    pub timeout: Option<String>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Listen for NUT clients (default)
    Serve,

    /// Run apcaccess once and print the LIST VAR reply
    #[command(alias = "q")]
    Query,

    /// Print the effective configuration as TOML
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Also write it to the configuration file
    #[arg(long)]
    pub write: bool,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
