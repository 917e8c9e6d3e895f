// ── TCP server ──
//
// Accept loop plus one task per connection. Each connection reads
// newline-terminated requests, runs them through its own `Session` and
// writes the response back. Three accept failures in a row stop the server.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

use crate::config::ProxyConfig;
use crate::error::CoreError;
use crate::protocol::Response;
use crate::session::Session;
use crate::telemetry::StatusRunner;

/// Consecutive `accept` failures tolerated before the server gives up.
pub const MAX_ACCEPT_FAILURES: u32 = 3;

// ── Listener seam ───────────────────────────────────────────────────

/// Source of client connections. [`TcpListener`] in production.
pub trait Listener: Send {
    type Stream: AsyncRead + AsyncWrite + Send + Unpin + 'static;

    fn accept(&mut self) -> impl Future<Output = io::Result<(Self::Stream, SocketAddr)>> + Send;

    fn local_addr(&self) -> io::Result<SocketAddr>;
}

impl Listener for TcpListener {
    type Stream = TcpStream;

    fn accept(&mut self) -> impl Future<Output = io::Result<(TcpStream, SocketAddr)>> + Send {
        TcpListener::accept(self)
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        TcpListener::local_addr(self)
    }
}

/// Serves one UPS over the NUT protocol.
pub struct Server<R> {
    config: Arc<ProxyConfig>,
    runner: Arc<R>,
}

impl<R: StatusRunner> Server<R> {
    pub fn new(config: ProxyConfig, runner: R) -> Self {
        Self {
            config: Arc::new(config),
            runner: Arc::new(runner),
        }
    }

    /// Serve connections from an already bound listener until `cancel`
    /// fires or accepting fails [`MAX_ACCEPT_FAILURES`] times in a row.
    pub async fn run<L: Listener>(
        &self,
        mut listener: L,
        cancel: CancellationToken,
    ) -> Result<(), CoreError> {
        let local = listener.local_addr()?;
        tracing::info!(
            address = %local,
            ups = %self.config.ups.name,
            target = %self.config.target_address,
            "NUT proxy listening"
        );

        let mut failures: u32 = 0;

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        failures = 0;
                        tracing::info!(peer = %peer, "client connected");

                        let (reader, writer) = tokio::io::split(stream);
                        let session = Session::new(Arc::clone(&self.config), Arc::clone(&self.runner));
                        let timeout = self.config.timeout;
                        let conn_cancel = cancel.child_token();

                        tokio::spawn(async move {
                            serve_connection(session, reader, writer, timeout, conn_cancel, peer).await;
                        });
                    }
                    Err(source) => {
                        failures += 1;
                        tracing::warn!(error = %source, failures, "accept failed");
                        if failures >= MAX_ACCEPT_FAILURES {
                            return Err(CoreError::Accept {
                                attempts: failures,
                                source,
                            });
                        }
                    }
                },
            }
        }

        tracing::info!(address = %local, "NUT proxy stopped");
        Ok(())
    }
}

// ── Connection lifecycle ────────────────────────────────────────────

/// Drive one connection until the client leaves, a request times out, or
/// the session closes itself.
///
/// Requests whose dispatch fails get no reply at all; the client keeps
/// the connection and may send further requests.
async fn serve_connection<R, Rd, Wr>(
    mut session: Session<R>,
    reader: Rd,
    writer: Wr,
    timeout: Duration,
    cancel: CancellationToken,
    peer: SocketAddr,
) where
    R: StatusRunner,
    Rd: AsyncRead + Unpin,
    Wr: AsyncWrite + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut writer = BufWriter::new(writer);
    let mut buf = Vec::new();

    while session.is_open() {
        buf.clear();
        let read = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            read = tokio::time::timeout(timeout, reader.read_until(b'\n', &mut buf)) => read,
        };

        match read {
            Ok(Ok(0)) => break,
            Ok(Ok(_)) if buf.last() != Some(&b'\n') => {
                tracing::debug!(peer = %peer, "connection closed mid-request");
                break;
            }
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                tracing::debug!(peer = %peer, error = %e, "read failed");
                break;
            }
            Err(_) => {
                tracing::debug!(peer = %peer, "read timed out");
                break;
            }
        }

        let line = String::from_utf8_lossy(&buf);
        let response = match session.handle_line(&line).await {
            Ok(response) => response,
            Err(e) if e.is_telemetry() => {
                tracing::warn!(peer = %peer, request = %line.trim_end(), error = %e, "telemetry refresh failed");
                continue;
            }
            Err(e) => {
                tracing::warn!(peer = %peer, request = %line.trim_end(), error = %e, "request failed");
                continue;
            }
        };

        let Some(payload) = wire_payload(&response) else {
            continue;
        };
        let written = tokio::time::timeout(timeout, async {
            writer.write_all(payload.as_bytes()).await?;
            writer.flush().await
        })
        .await;

        match written {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::debug!(peer = %peer, error = %e, "write failed");
                break;
            }
            Err(_) => {
                tracing::debug!(peer = %peer, "write timed out");
                break;
            }
        }
    }

    let _ = writer.shutdown().await;
    tracing::info!(peer = %peer, "client disconnected");
}

/// Response text as sent on the wire: trimmed and newline-terminated.
/// Blank responses are not sent.
fn wire_payload(response: &Response) -> Option<String> {
    let text = response.text.trim();
    if text.is_empty() {
        None
    } else {
        Some(format!("{text}\n"))
    }
}
