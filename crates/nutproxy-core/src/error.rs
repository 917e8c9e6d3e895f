// ── Core error types ──
//
// Faults raised while serving a NUT session. Protocol-level refusals
// (unknown UPS, unsupported variable, ...) are NOT errors here: they are
// ordinary `ERR <CODE>` responses, see `protocol::ErrorCode`.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Telemetry errors ─────────────────────────────────────────────
    #[error("Failed to run {program}: {reason}")]
    Execution { program: String, reason: String },

    #[error("Invalid line {line_number} in apcaccess output: {line:?}")]
    Parse { line_number: usize, line: String },

    // ── Resolver errors ──────────────────────────────────────────────
    #[error("Couldn't format {key} value {value:?} as number")]
    Format { key: String, value: String },

    // ── Listener errors ──────────────────────────────────────────────
    #[error("Failed {attempts} times in a row accepting new connections: {source}")]
    Accept {
        attempts: u32,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Returns `true` if the error came from the external status tool
    /// (launch failure, bad exit, or malformed output).
    pub fn is_telemetry(&self) -> bool {
        matches!(self, Self::Execution { .. } | Self::Parse { .. })
    }
}
