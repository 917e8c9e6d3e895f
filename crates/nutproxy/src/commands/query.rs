//! `nutproxy query`: one refresh, printed as a `LIST VAR` reply.
//!
//! Goes through the same session code as a network client, so what this
//! prints is exactly what `upsc` would see.

use std::sync::Arc;

use nutproxy_core::{ProcessRunner, ProxyConfig, Session};

use crate::error::CliError;

pub async fn handle(proxy: ProxyConfig) -> Result<(), CliError> {
    let request = format!("LIST VAR {}", proxy.ups.name);
    let mut session = Session::new(Arc::new(proxy), Arc::new(ProcessRunner));

    let response = session.handle_line(&request).await?;
    print!("{}", response.text);
    Ok(())
}
