//! Lifecycle of the proxy subprocess.

use super::options::ServerOptions;
use super::platform;
use crate::client::{ControlClient, PONG};
use crate::error::{Error, Result};
use crate::model::{CapturedRequest, Expectation, RequestCriteria};
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::fmt;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use tokio::process::{Child, Command};
use tokio::time::{sleep_until, timeout, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Where a [`ProcessManager`] is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    NotStarted,
    Starting,
    Ready,
    Stopped,
    /// Terminal: the proxy never became ready and has been terminated.
    FailedToStart,
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ServerState::NotStarted => "not started",
            ServerState::Starting => "starting",
            ServerState::Ready => "ready",
            ServerState::Stopped => "stopped",
            ServerState::FailedToStart => "failed to start",
        };
        f.write_str(label)
    }
}

/// Owns one proxy subprocess and a control client bound to it.
///
/// Nothing else may signal or reap the child. Dropping a manager whose proxy
/// is still running sends it SIGINT.
pub struct ProcessManager {
    options: ServerOptions,
    client: ControlClient,
    child: Option<Child>,
    pid: Option<u32>,
    state: ServerState,
}

impl ProcessManager {
    pub fn new(options: ServerOptions) -> Result<Self> {
        let http = match options.request_timeout {
            Some(t) => reqwest::Client::builder().timeout(t).build()?,
            None => reqwest::Client::new(),
        };
        let client = ControlClient::with_client(&options.control_url(), http);

        Ok(Self {
            options,
            client,
            child: None,
            pid: None,
            state: ServerState::NotStarted,
        })
    }

    /// Create a manager and start its proxy.
    pub async fn launch(options: ServerOptions) -> Result<Self> {
        let mut manager = Self::new(options)?;
        manager.start().await?;
        Ok(manager)
    }

    pub fn state(&self) -> ServerState {
        self.state
    }

    pub fn options(&self) -> &ServerOptions {
        &self.options
    }

    pub fn client(&self) -> &ControlClient {
        &self.client
    }

    /// Pid of the spawned proxy, kept after it exits.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Spawn the proxy and wait until it answers `PONG`.
    ///
    /// On timeout the child is interrupted, then killed after the shutdown
    /// grace period, before [`Error::StartTimeout`] is returned.
    pub async fn start(&mut self) -> Result<u32> {
        if self.state != ServerState::NotStarted {
            return Err(Error::InvalidState {
                action: "start",
                state: self.state,
            });
        }

        let binary = self.resolve_binary()?;
        let args = self.options.command_args();
        let stderr = std::mem::take(&mut self.options.stderr);

        info!(binary = %binary.display(), ?args, "Starting proxy");
        let child = stderr
            .into_stdio()
            .and_then(|stderr| {
                Command::new(&binary)
                    .args(&args)
                    .stdin(Stdio::null())
                    .stdout(Stdio::null())
                    .stderr(stderr)
                    .spawn()
            })
            .map_err(|e| {
                self.state = ServerState::FailedToStart;
                Error::Spawn(e)
            })?;

        let pid = child.id().unwrap_or_default();
        self.pid = Some(pid);
        self.child = Some(child);
        self.state = ServerState::Starting;

        match self.wait_until_ready().await {
            Ok(()) => {
                self.state = ServerState::Ready;
                info!(pid, control = %self.client.base_url(), "Proxy ready");
                Ok(pid)
            }
            Err(last_error) => {
                self.state = ServerState::FailedToStart;
                warn!(pid, ?last_error, "Proxy did not become ready, terminating it");
                self.terminate().await;
                Err(Error::StartTimeout {
                    attempts: self.options.readiness.attempts,
                    last_error,
                })
            }
        }
    }

    /// Send SIGINT to the proxy without waiting for it to exit.
    ///
    /// Use [`wait`](Self::wait) when the caller needs the process gone.
    pub fn stop(&mut self) -> Result<()> {
        match self.state {
            ServerState::Starting | ServerState::Ready => {
                if let Some(child) = &self.child {
                    interrupt(child)?;
                }
                self.state = ServerState::Stopped;
                info!(pid = ?self.pid, "Proxy stopped");
                Ok(())
            }
            ServerState::Stopped => Ok(()),
            state => Err(Error::InvalidState {
                action: "stop",
                state,
            }),
        }
    }

    /// Wait for the proxy to exit. `None` if no process is held.
    pub async fn wait(&mut self) -> Result<Option<ExitStatus>> {
        match self.child.as_mut() {
            Some(child) => Ok(Some(child.wait().await?)),
            None => Ok(None),
        }
    }

    /// Whether the held process has not exited yet.
    pub fn is_running(&mut self) -> bool {
        self.child
            .as_mut()
            .map(|child| matches!(child.try_wait(), Ok(None)))
            .unwrap_or(false)
    }

    pub async fn ping(&self) -> Result<String> {
        self.client.ping().await
    }

    pub async fn register_expectations(
        &self,
        expectations: &[Expectation],
    ) -> Result<Vec<Expectation>> {
        self.client.register_expectations(expectations).await
    }

    pub async fn list_expectations(&self) -> Result<Vec<Expectation>> {
        self.client.list_expectations().await
    }

    pub async fn list_requests(&self, uuid: Uuid) -> Result<Vec<CapturedRequest>> {
        self.client.list_requests(uuid).await
    }

    pub async fn find_requests(&self, criteria: &RequestCriteria) -> Result<Vec<CapturedRequest>> {
        self.client.find_requests(criteria).await
    }

    pub async fn reset_all(&self) -> Result<()> {
        self.client.reset_all().await
    }

    fn resolve_binary(&self) -> Result<PathBuf> {
        match &self.options.binary {
            Some(binary) => Ok(binary.clone()),
            None => platform::binary_path(&self.options.binaries_dir),
        }
    }

    /// Ping until `PONG`. On failure returns the last error seen, if any.
    ///
    /// Each attempt, ping included, takes at most one interval, so the whole
    /// poll is bounded by `attempts * interval`.
    async fn wait_until_ready(&self) -> std::result::Result<(), Option<String>> {
        let policy = self.options.readiness;
        let mut last_error = None;

        for attempt in 1..=policy.attempts {
            let next_attempt = Instant::now() + policy.interval;

            match timeout(policy.interval, self.client.ping()).await {
                Ok(Ok(reply)) if reply == PONG => return Ok(()),
                Ok(Ok(reply)) => {
                    debug!(attempt, %reply, "Unexpected ping reply");
                    last_error = Some(format!("unexpected ping reply {reply:?}"));
                }
                // Nothing listening yet.
                Ok(Err(e)) if e.is_connection() => {
                    debug!(attempt, "Control server not accepting connections yet");
                    last_error = Some(e.to_string());
                }
                Ok(Err(e)) => return Err(Some(e.to_string())),
                // Accepted the connection but has not answered yet.
                Err(_) => {
                    debug!(attempt, "Ping timed out");
                    last_error = Some(format!("ping timed out after {:?}", policy.interval));
                }
            }

            if attempt < policy.attempts {
                sleep_until(next_attempt).await;
            }
        }

        Err(last_error)
    }

    /// Interrupt, give the process the grace period, then kill it.
    async fn terminate(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };

        if let Err(e) = interrupt(&child) {
            debug!("Failed to interrupt proxy: {}", e);
        }
        match timeout(self.options.shutdown_grace, child.wait()).await {
            Ok(Ok(status)) => debug!(?status, "Proxy exited"),
            _ => {
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill proxy: {}", e);
                }
            }
        }
    }
}

impl Drop for ProcessManager {
    fn drop(&mut self) {
        if matches!(self.state, ServerState::Starting | ServerState::Ready) {
            if let Some(child) = &self.child {
                let _ = interrupt(child);
            }
        }
    }
}

fn interrupt(child: &Child) -> Result<()> {
    // `id` is None once the child has been reaped.
    let Some(pid) = child.id() else {
        return Ok(());
    };
    let pid = i32::try_from(pid)
        .map_err(|_| Error::invalid(format!("pid {pid} out of range")))?;
    kill(Pid::from_raw(pid), Signal::SIGINT)?;
    Ok(())
}
