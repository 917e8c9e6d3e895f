//! NUT (Network UPS Tools) protocol front end for apcupsd.
//!
//! This crate owns everything needed to answer NUT clients from the
//! output of apcupsd's `apcaccess` tool:
//!
//! - **[`Server`]** — TCP accept loop. Spawns one task per client, each with
//!   its own [`Session`], and stops after repeated accept failures or when
//!   its cancellation token fires.
//!
//! - **[`protocol`]** — Request parsing ([`Request`]) and the command
//!   interpreter ([`dispatch`]) producing a [`Response`] or an
//!   `ERR <CODE>` reply ([`ErrorCode`]).
//!
//! - **[`TelemetryCache`]** — Runs `apcaccess -h <target> -u` through a
//!   [`StatusRunner`] and keeps the parsed [`Snapshot`]. Refreshed on every
//!   variable request; never shared between sessions.
//!
//! - **[`Registry`] / [`Resolver`]** — Maps NUT variable names to value
//!   computations: fixed strings, raw apcaccess keys with fallbacks,
//!   templates, unit conversion and the UPS status and self-test
//!   translations.

pub mod config;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod resolver;
pub mod server;
pub mod session;
pub mod telemetry;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{DEFAULT_PORT, ProxyConfig, UpsIdentity};
pub use error::CoreError;
pub use protocol::{ErrorCode, Request, Response, dispatch};
pub use registry::Registry;
pub use resolver::Resolver;
pub use server::{Listener, MAX_ACCEPT_FAILURES, Server};
pub use session::{Session, SessionState};
pub use telemetry::{ProcessRunner, Snapshot, StatusRunner, TelemetryCache};
