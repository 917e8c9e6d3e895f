// ── Telemetry cache ──
//
// Runs `apcaccess -h <target> -u`, parses its `KEY : VALUE` output into a
// flat snapshot and serves lookups to the resolvers. A refresh replaces
// the snapshot wholesale, and only when every output line parsed.

use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::process::Command;

use crate::config::ProxyConfig;
use crate::error::CoreError;

// ── Runner seam ─────────────────────────────────────────────────────

/// Runs an external program and captures its standard output.
///
/// Production code uses [`ProcessRunner`]; tests substitute canned output.
pub trait StatusRunner: Send + Sync + 'static {
    fn run(
        &self,
        program: &Path,
        args: &[String],
    ) -> impl Future<Output = Result<Vec<u8>, CoreError>> + Send;
}

/// Spawns the program with `tokio::process`, waits for it to exit and
/// returns its stdout. A non-zero exit status is an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl StatusRunner for ProcessRunner {
    fn run(
        &self,
        program: &Path,
        args: &[String],
    ) -> impl Future<Output = Result<Vec<u8>, CoreError>> + Send {
        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        let program = program.display().to_string();

        async move {
            let output = command
                .output()
                .await
                .map_err(|e| CoreError::Execution {
                    program: program.clone(),
                    reason: e.to_string(),
                })?;

            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                return Err(CoreError::Execution {
                    program,
                    reason: format!("{} ({})", output.status, stderr.trim()),
                });
            }

            Ok(output.stdout)
        }
    }
}

// ── Snapshot ────────────────────────────────────────────────────────

/// Flat key/value telemetry captured by one refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    values: HashMap<String, String>,
    captured_at: DateTime<Utc>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            values: HashMap::new(),
            captured_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}

impl Snapshot {
    /// Build a snapshot directly from key/value pairs, stamped now.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            captured_at: Utc::now(),
        }
    }

    /// Parse `apcaccess -u` output.
    ///
    /// Blank lines are skipped. Every other line must contain `:`; the
    /// trimmed text before the first `:` is the key, the trimmed rest the
    /// value. Later duplicates overwrite earlier ones.
    pub fn parse(output: &str) -> Result<HashMap<String, String>, CoreError> {
        let mut values = HashMap::new();

        for (idx, line) in output.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }

            let Some((key, value)) = line.split_once(':') else {
                return Err(CoreError::Parse {
                    line_number: idx + 1,
                    line: line.to_owned(),
                });
            };

            values.insert(key.trim().to_owned(), value.trim().to_owned());
        }

        Ok(values)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// When this snapshot was captured (the Unix epoch if never refreshed).
    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }
}

// ── Cache ───────────────────────────────────────────────────────────

/// Per-session telemetry cache.
///
/// Every [`refresh`](Self::refresh) re-runs the status tool; the capture
/// timestamp is recorded but never used to skip a refresh.
#[derive(Debug)]
pub struct TelemetryCache<R> {
    runner: Arc<R>,
    snapshot: Snapshot,
}

impl<R: StatusRunner> TelemetryCache<R> {
    pub fn new(runner: Arc<R>) -> Self {
        Self {
            runner,
            snapshot: Snapshot::default(),
        }
    }

    /// Invoke the status tool and replace the snapshot with its output.
    ///
    /// On failure the previous snapshot is kept untouched.
    pub async fn refresh(&mut self, config: &ProxyConfig) -> Result<(), CoreError> {
        let args = config.apcaccess_args();
        let raw = self
            .runner
            .run(&config.apcaccess_executable, &args)
            .await?;

        let values = Snapshot::parse(&String::from_utf8_lossy(&raw))?;

        tracing::debug!(
            program = %config.apcaccess_executable.display(),
            entries = values.len(),
            "telemetry refreshed"
        );

        self.snapshot = Snapshot {
            values,
            captured_at: Utc::now(),
        };
        Ok(())
    }

    pub fn lookup(&self, key: &str) -> Option<&str> {
        self.snapshot.get(key)
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }
}
