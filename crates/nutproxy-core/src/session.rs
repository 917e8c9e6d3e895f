// ── Client session ──
//
// One session per accepted connection. Owns a private telemetry cache, so
// concurrent clients never observe each other's refreshes.

use std::sync::Arc;

use crate::config::ProxyConfig;
use crate::error::CoreError;
use crate::protocol::{self, Request, Response};
use crate::telemetry::{StatusRunner, TelemetryCache};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Open,
    Closed,
}

/// Per-connection protocol state.
pub struct Session<R> {
    config: Arc<ProxyConfig>,
    cache: TelemetryCache<R>,
    state: SessionState,
}

impl<R: StatusRunner> Session<R> {
    pub fn new(config: Arc<ProxyConfig>, runner: Arc<R>) -> Self {
        Self {
            config,
            cache: TelemetryCache::new(runner),
            state: SessionState::Open,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == SessionState::Open
    }

    /// Interpret one request line. A response flagged `close` moves the
    /// session to [`SessionState::Closed`].
    pub async fn handle_line(&mut self, line: &str) -> Result<Response, CoreError> {
        let request = Request::parse(line);
        tracing::debug!(request = ?request, "handling request");

        let response = protocol::dispatch(&request, &self.config, &mut self.cache).await?;

        if response.close {
            self.state = SessionState::Closed;
        }
        Ok(response)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::UpsIdentity;
    use crate::resolver::Resolver;
    use crate::telemetry::tests::StubRunner;

    fn session(runner: StubRunner) -> (Session<StubRunner>, Arc<StubRunner>) {
        let runner = Arc::new(runner);
        let config = ProxyConfig {
            ups: UpsIdentity {
                name: "test".into(),
                description: "testcase".into(),
            },
            variables: [("ups.status", Resolver::UpsStatus)].into_iter().collect(),
            ..ProxyConfig::default()
        };
        (Session::new(Arc::new(config), Arc::clone(&runner)), runner)
    }

    #[tokio::test]
    async fn starts_open_and_closes_on_logout() {
        let (mut session, _) = session(StubRunner::with_output(""));
        assert_eq!(session.state(), SessionState::Open);

        let response = session.handle_line("LOGIN test").await.unwrap();
        assert_eq!(response.text, "OK");
        assert!(session.is_open());

        let response = session.handle_line("LOGOUT\r").await.unwrap();
        assert_eq!(response.text, "OK Goodbye");
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[tokio::test]
    async fn cache_follows_tool_output_between_requests() {
        let (mut session, runner) = session(StubRunner::with_output("STATUS : ONLINE\n"));

        let first = session.handle_line("GET VAR test ups.status").await.unwrap();
        runner.set_output("STATUS : ONBATT\n");
        let second = session.handle_line("GET VAR test ups.status").await.unwrap();

        assert_eq!(first.text, "VAR test ups.status \"OL ONLINE\"\n");
        assert_eq!(second.text, "VAR test ups.status \"OB DISCHRG ONBATT\"\n");
        assert_eq!(runner.calls(), 2);
    }

    #[tokio::test]
    async fn failed_request_keeps_session_open() {
        let (mut session, runner) = session(StubRunner::failing("no route to host"));

        assert!(session.handle_line("LIST VAR test").await.is_err());
        assert!(session.is_open());

        runner.set_output("STATUS : ONLINE\n");
        let response = session.handle_line("LIST VAR test").await.unwrap();
        assert_eq!(
            response.text,
            "BEGIN LIST VAR test\nVAR test ups.status \"OL ONLINE\"\nEND LIST VAR test\n"
        );
    }

    #[tokio::test]
    async fn raw_wire_lines_are_handled_as_read() {
        let (mut session, _) = session(StubRunner::with_output("STATUS : ONLINE\n"));

        let response = session
            .handle_line("  GET VAR test ups.status\r\n")
            .await
            .unwrap();
        assert_eq!(response.text, "VAR test ups.status \"OL ONLINE\"\n");

        let response = session.handle_line("LOGOUT\n").await.unwrap();
        assert_eq!(response.text, "OK Goodbye");
        assert!(!session.is_open());
    }
}
