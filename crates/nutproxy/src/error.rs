//! CLI error types with miette diagnostics.
//!
//! Maps `ConfigError` and `CoreError` into user-facing errors with help
//! text and process exit codes.

use miette::Diagnostic;
use thiserror::Error;

use nutproxy_config::ConfigError;
use nutproxy_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const CONFIG: i32 = 3;
    pub const BIND: i32 = 4;
    pub const EXECUTION: i32 = 5;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Configuration ────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(
        code(nutproxy::validation),
        help("Fix it in the config file, the NUTPROXY_* environment or the matching flag.")
    )]
    Validation { field: String, reason: String },

    #[error(transparent)]
    #[diagnostic(
        code(nutproxy::config),
        help("Run: nutproxy config  to see the configuration nutproxy would use.")
    )]
    Config(Box<figment::Error>),

    #[error("Failed to serialize configuration")]
    #[diagnostic(code(nutproxy::serialization))]
    Serialization(#[from] toml::ser::Error),

    // ── Listener ─────────────────────────────────────────────────────
    #[error("Could not listen on {address}")]
    #[diagnostic(
        code(nutproxy::bind),
        help(
            "Another NUT server may already own this port.\n\
             Choose another one with --port, or stop the other server."
        )
    )]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Stopped after {attempts} consecutive accept failures")]
    #[diagnostic(code(nutproxy::accept))]
    Accept {
        attempts: u32,
        #[source]
        source: std::io::Error,
    },

    // ── Telemetry ────────────────────────────────────────────────────
    #[error("Could not run {program}: {reason}")]
    #[diagnostic(
        code(nutproxy::apcaccess),
        help(
            "Check that apcaccess is installed (--apcaccess-executable) and that\n\
             apcupsd is reachable on --target-address."
        )
    )]
    Execution { program: String, reason: String },

    #[error("apcaccess printed an unexpected line {line_number}: {line:?}")]
    #[diagnostic(code(nutproxy::apcaccess_output))]
    Parse { line_number: usize, line: String },

    #[error("{key} value {value:?} is not a number")]
    #[diagnostic(code(nutproxy::format))]
    Format { key: String, value: String },

    // ── IO ───────────────────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Validation { .. } | Self::Config(_) => exit_code::CONFIG,
            Self::Bind { .. } => exit_code::BIND,
            Self::Execution { .. } | Self::Parse { .. } => exit_code::EXECUTION,
            _ => exit_code::GENERAL,
        }
    }
}

// ── ConfigError → CliError ──────────────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::Figment(err) => Self::Config(err),
            ConfigError::Serialization(err) => Self::Serialization(err),
            ConfigError::Io(err) => Self::Io(err),
        }
    }
}

// ── CoreError → CliError ────────────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Execution { program, reason } => Self::Execution { program, reason },
            CoreError::Parse { line_number, line } => Self::Parse { line_number, line },
            CoreError::Format { key, value } => Self::Format { key, value },
            CoreError::Accept { attempts, source } => Self::Accept { attempts, source },
            CoreError::Io(err) => Self::Io(err),
        }
    }
}
