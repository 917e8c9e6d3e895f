//! Subcommand handlers.

pub mod config_cmd;
pub mod query;
pub mod serve;
