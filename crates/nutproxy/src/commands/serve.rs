//! `nutproxy serve`: bind the listener and serve until interrupted.

use nutproxy_core::{ProcessRunner, ProxyConfig, Server};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::error::CliError;

pub async fn handle(proxy: ProxyConfig) -> Result<(), CliError> {
    tracing::info!(config = %proxy, "starting NUT proxy");

    let address = proxy.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| CliError::Bind { address, source })?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, shutting down");
            on_signal.cancel();
        }
    });

    Server::new(proxy, ProcessRunner).run(listener, cancel).await?;
    Ok(())
}
