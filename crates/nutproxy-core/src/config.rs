// ── Runtime proxy configuration ──
//
// These types describe *what* the proxy serves and *where* it gets its
// telemetry from. They never touch disk: `nutproxy-config` (or a test)
// constructs a `ProxyConfig` and hands it in.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::registry::Registry;

/// Default NUT port (`upsd`).
pub const DEFAULT_PORT: u16 = 3493;

/// The single UPS this proxy exposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsIdentity {
    /// Name clients address in `LOGIN`, `LIST VAR`, `GET VAR`, ...
    pub name: String,
    /// Free-form description reported by `LIST UPS`.
    pub description: String,
}

impl Default for UpsIdentity {
    fn default() -> Self {
        Self {
            name: "ups".into(),
            description: "apcupsd NUT proxy".into(),
        }
    }
}

/// Configuration for serving one UPS.
///
/// Immutable once serving begins; sessions share it behind an `Arc`.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Address to listen on (e.g. `127.0.0.1`, `0.0.0.0`).
    pub address: String,
    /// Port to listen on.
    pub port: u16,
    /// Host running apcupsd, passed to `apcaccess -h`.
    pub target_address: String,
    pub ups: UpsIdentity,
    /// Path or name of the `apcaccess` executable.
    pub apcaccess_executable: PathBuf,
    /// Read/write deadline for a single request on a connection.
    pub timeout: Duration,
    /// NUT variable name → resolver.
    pub variables: Registry,
}

impl ProxyConfig {
    /// Socket address string to bind the listener to.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }

    /// Arguments passed to `apcaccess` on every refresh.
    pub fn apcaccess_args(&self) -> [String; 3] {
        ["-h".into(), self.target_address.clone(), "-u".into()]
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".into(),
            port: DEFAULT_PORT,
            target_address: "127.0.0.1".into(),
            ups: UpsIdentity::default(),
            apcaccess_executable: PathBuf::from("apcaccess"),
            timeout: Duration::from_secs(30),
            variables: Registry::catalog(),
        }
    }
}

impl fmt::Display for ProxyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ProxyConfig(address={}, port={}, target_address={}, ups_name={:?}, \
             ups_description={:?}, apcaccess_executable={}, timeout={:?}, variables={})",
            self.address,
            self.port,
            self.target_address,
            self.ups.name,
            self.ups.description,
            self.apcaccess_executable.display(),
            self.timeout,
            self.variables.len(),
        )
    }
}
