//! `nutproxy config`: print (and optionally persist) the effective configuration.

use crate::cli::{ConfigArgs, GlobalOpts};
use crate::config;
use crate::error::CliError;

pub fn handle(args: &ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = config::effective_config(global)?;
    cfg.validate()?;

    let rendered = config::to_toml(&cfg)?;
    print!("{rendered}");

    if args.write {
        let path = global.config.clone().unwrap_or_else(config::config_path);
        config::save_config(&cfg, &path)?;
        eprintln!("Configuration written to {}", path.display());
    }

    Ok(())
}
