//! CLI configuration -- thin wrapper around `nutproxy_config`.
//!
//! Adds `GlobalOpts` flag overrides on top of the file + environment layers.

use nutproxy_core::ProxyConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use nutproxy_config::{Config, config_path, load_config, save_config, to_toml};

/// Apply command-line overrides. Flags take priority over every other layer.
pub fn apply_overrides(cfg: &mut Config, global: &GlobalOpts) {
    if let Some(ref address) = global.address {
        cfg.address.clone_from(address);
    }
    if let Some(port) = global.port {
        cfg.port = port;
    }
    if let Some(ref target) = global.target_address {
        cfg.target_address.clone_from(target);
    }
    if let Some(ref name) = global.ups_name {
        cfg.ups_name.clone_from(name);
    }
    if let Some(ref description) = global.ups_description {
        cfg.ups_description.clone_from(description);
    }
    if let Some(ref executable) = global.apcaccess_executable {
        cfg.apcaccess_executable.clone_from(executable);
    }
    if let Some(ref timeout) = global.timeout {
        cfg.timeout.clone_from(timeout);
    }
}

/// Load file + environment, then apply flags.
pub fn effective_config(global: &GlobalOpts) -> Result<Config, CliError> {
    let mut cfg = load_config(global.config.as_deref())?;
    apply_overrides(&mut cfg, global);
    Ok(cfg)
}

/// Build the validated runtime configuration.
pub fn proxy_config(global: &GlobalOpts) -> Result<ProxyConfig, CliError> {
    Ok(effective_config(global)?.to_proxy_config()?)
}
