//! Configuration for the nutproxy binary.
//!
//! Layers built-in defaults, a TOML file and `NUTPROXY_*` environment
//! variables with `figment`, validates the result and translates it into
//! `nutproxy_core::ProxyConfig`. The CLI applies its flag overrides on top
//! of the loaded [`Config`] before translating.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use nutproxy_core::{DEFAULT_PORT, ProxyConfig, Registry, Resolver, UpsIdentity};

/// Prefix of environment variables read by [`load_config`].
pub const ENV_PREFIX: &str = "NUTPROXY_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

impl ConfigError {
    fn validation(field: &str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// ── TOML config struct ──────────────────────────────────────────────

/// On-disk configuration. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Listen address.
    pub address: String,

    pub port: u16,

    /// Host running apcupsd.
    pub target_address: String,

    /// UPS name clients must use.
    pub ups_name: String,

    pub ups_description: String,

    pub apcaccess_executable: PathBuf,

    /// Per-request read/write deadline, e.g. `30s`, `1m`, `500ms`.
    pub timeout: String,

    /// Variables added to, or replacing entries of, the built-in catalog.
    pub variables: BTreeMap<String, Resolver>,
}

impl Default for Config {
    fn default() -> Self {
        let ups = UpsIdentity::default();
        Self {
            address: "127.0.0.1".into(),
            port: DEFAULT_PORT,
            target_address: "127.0.0.1".into(),
            ups_name: ups.name,
            ups_description: ups.description,
            apcaccess_executable: PathBuf::from("apcaccess"),
            timeout: "30s".into(),
            variables: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Parse the human readable `timeout`.
    pub fn timeout(&self) -> Result<Duration, ConfigError> {
        let timeout = humantime::parse_duration(self.timeout.trim())
            .map_err(|e| ConfigError::validation("timeout", format!("'{}': {e}", self.timeout)))?;
        if timeout.is_zero() {
            return Err(ConfigError::validation("timeout", "must be greater than zero"));
        }
        Ok(timeout)
    }

    /// Check the values that `ProxyConfig` cannot represent as invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ups_name.is_empty() {
            return Err(ConfigError::validation("ups_name", "must not be empty"));
        }
        if self.ups_name.chars().any(char::is_whitespace) {
            return Err(ConfigError::validation(
                "ups_name",
                format!("'{}' must not contain whitespace", self.ups_name),
            ));
        }
        if self.address.trim().is_empty() {
            return Err(ConfigError::validation("address", "must not be empty"));
        }
        if self.apcaccess_executable.as_os_str().is_empty() {
            return Err(ConfigError::validation(
                "apcaccess_executable",
                "must not be empty",
            ));
        }
        self.timeout()?;
        Ok(())
    }

    /// Validate and build the runtime configuration. The catalog is
    /// overlaid with the `[variables]` entries.
    pub fn to_proxy_config(&self) -> Result<ProxyConfig, ConfigError> {
        self.validate()?;

        let mut variables = Registry::catalog();
        variables.extend(self.variables.clone());

        Ok(ProxyConfig {
            address: self.address.clone(),
            port: self.port,
            target_address: self.target_address.clone(),
            ups: UpsIdentity {
                name: self.ups_name.clone(),
                description: self.ups_description.clone(),
            },
            apcaccess_executable: self.apcaccess_executable.clone(),
            timeout: self.timeout()?,
            variables,
        })
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("org", "nutproxy", "nutproxy").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("nutproxy");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// The provider stack: defaults, then the TOML file, then environment.
pub fn figment(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).ignore(&["config"]))
}

/// Load the configuration.
///
/// An explicit `path` must exist; the default location is optional.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = match path {
        Some(path) if !path.is_file() => {
            return Err(ConfigError::validation(
                "config",
                format!("file not found: {}", path.display()),
            ));
        }
        Some(path) => path.to_path_buf(),
        None => config_path(),
    };

    tracing::debug!(path = %path.display(), "loading configuration");
    let config: Config = figment(&path).extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Render the configuration as pretty TOML.
pub fn to_toml(cfg: &Config) -> Result<String, ConfigError> {
    Ok(toml::to_string_pretty(cfg)?)
}

/// Serialize config to TOML and write it to `path`, creating parent
/// directories as needed.
pub fn save_config(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, to_toml(cfg)?)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use figment::Jail;
    use pretty_assertions::assert_eq;

    use super::*;

    fn load(path: &str) -> figment::error::Result<Config> {
        load_config(Some(Path::new(path))).map_err(|e| e.to_string().into())
    }

    #[test]
    fn defaults_translate_to_core_defaults() {
        let proxy = Config::default().to_proxy_config().unwrap();
        let core = ProxyConfig::default();

        assert_eq!(proxy.bind_address(), core.bind_address());
        assert_eq!(proxy.target_address, core.target_address);
        assert_eq!(proxy.ups, core.ups);
        assert_eq!(proxy.apcaccess_executable, core.apcaccess_executable);
        assert_eq!(proxy.timeout, core.timeout);
        assert_eq!(proxy.variables, core.variables);
    }

    #[test]
    fn file_then_environment_layering() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "nutproxy.toml",
                r#"
                    address = "0.0.0.0"
                    port = 4000
                    ups_name = "rack"
                    timeout = "1m"
                "#,
            )?;
            jail.set_env("NUTPROXY_UPS_NAME", "from-env");
            jail.set_env("NUTPROXY_TARGET_ADDRESS", "10.0.0.9");

            let config = load("nutproxy.toml")?;
            assert_eq!(config.address, "0.0.0.0");
            assert_eq!(config.port, 4000);
            assert_eq!(config.ups_name, "from-env");
            assert_eq!(config.target_address, "10.0.0.9");
            assert_eq!(config.ups_description, "apcupsd NUT proxy");

            let proxy = config.to_proxy_config().unwrap();
            assert_eq!(proxy.timeout, Duration::from_secs(60));
            assert_eq!(proxy.apcaccess_args(), ["-h", "10.0.0.9", "-u"]);
            Ok(())
        });
    }

    #[test]
    fn missing_default_file_yields_defaults() {
        Jail::expect_with(|jail| {
            let dir = jail.directory().display().to_string();
            jail.set_env("XDG_CONFIG_HOME", dir);
            let config = load_config(None).map_err(|e| e.to_string())?;
            assert_eq!(config, Config::default());
            Ok(())
        });
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        Jail::expect_with(|_jail| {
            let err = load_config(Some(Path::new("absent.toml"))).unwrap_err();
            assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "config"));
            Ok(())
        });
    }

    #[test]
    fn malformed_file_is_a_figment_error() {
        Jail::expect_with(|jail| {
            jail.create_file("bad.toml", "port = \"not a port\"")?;
            let err = load_config(Some(Path::new("bad.toml"))).unwrap_err();
            assert!(matches!(err, ConfigError::Figment(_)));
            Ok(())
        });
    }

    #[test]
    fn variables_overlay_the_catalog() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "nutproxy.toml",
                r#"
                    [variables."ups.beeper.status"]
                    kind = "fixed"
                    value = "disabled"

                    [variables."ups.serial"]
                    kind = "apc"
                    key = "SERIALNO"
                    fallback = { kind = "fixed", value = "unknown" }

                    [variables."ups.location"]
                    kind = "formatted"
                    template = "rack {}"
                    args = [{ kind = "ups_name" }]
                "#,
            )?;

            let proxy = load("nutproxy.toml")?.to_proxy_config().unwrap();
            let registry = &proxy.variables;

            assert_eq!(registry.len(), Registry::catalog().len() + 1);
            assert_eq!(
                registry.get("ups.beeper.status"),
                Some(&Resolver::fixed("disabled"))
            );
            assert_eq!(
                registry.get("ups.serial"),
                Some(&Resolver::apc("SERIALNO", Resolver::fixed("unknown")))
            );
            assert_eq!(
                registry.get("ups.location"),
                Some(&Resolver::formatted("rack {}", vec![Resolver::UpsName]))
            );
            Ok(())
        });
    }

    #[test]
    fn validation_rejects_bad_values() {
        let cases = [
            (
                Config {
                    ups_name: String::new(),
                    ..Config::default()
                },
                "ups_name",
            ),
            (
                Config {
                    ups_name: "two words".into(),
                    ..Config::default()
                },
                "ups_name",
            ),
            (
                Config {
                    timeout: "0s".into(),
                    ..Config::default()
                },
                "timeout",
            ),
            (
                Config {
                    timeout: "soon".into(),
                    ..Config::default()
                },
                "timeout",
            ),
            (
                Config {
                    address: " ".into(),
                    ..Config::default()
                },
                "address",
            ),
        ];

        for (config, expected) in cases {
            match config.to_proxy_config() {
                Err(ConfigError::Validation { field, .. }) => assert_eq!(field, expected),
                other => panic!("expected {expected} validation error, got {other:?}"),
            }
        }
    }

    #[test]
    fn human_durations_are_accepted() {
        for (raw, expected) in [
            ("500ms", Duration::from_millis(500)),
            ("2m", Duration::from_secs(120)),
            (" 45s ", Duration::from_secs(45)),
        ] {
            let config = Config {
                timeout: raw.into(),
                ..Config::default()
            };
            assert_eq!(config.timeout().unwrap(), expected, "timeout {raw:?}");
        }
    }

    #[test]
    fn saved_config_loads_back() {
        Jail::expect_with(|jail| {
            let mut config = Config {
                port: 13493,
                ups_description: "Office \"UPS\"".into(),
                ..Config::default()
            };
            config
                .variables
                .insert("ups.beeper.status".into(), Resolver::fixed("muted"));

            let path = jail.directory().join("nested").join("config.toml");
            save_config(&config, &path).map_err(|e| e.to_string())?;

            let text = std::fs::read_to_string(&path).map_err(|e| e.to_string())?;
            assert!(text.contains("port = 13493"));

            let loaded = load_config(Some(&path)).map_err(|e| e.to_string())?;
            assert_eq!(loaded, config);
            Ok(())
        });
    }
}
