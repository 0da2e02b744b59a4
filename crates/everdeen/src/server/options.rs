//! Configuration of a [`ProcessManager`](super::ProcessManager).

use std::fs::File;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

/// Pings attempted before giving up on a starting proxy.
pub const DEFAULT_READY_ATTEMPTS: u32 = 10;

/// Pause between two pings.
pub const DEFAULT_READY_INTERVAL: Duration = Duration::from_millis(100);

/// Time a failed proxy gets to exit after SIGINT before it is killed.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

/// Where the proxy's stderr goes. stdout is never connected.
#[derive(Debug, Default)]
pub enum StderrSink {
    /// An anonymous temporary file, removed when the process exits.
    #[default]
    TempFile,
    /// Share the caller's stderr.
    Inherit,
    /// Discard.
    Null,
    /// Append to a caller-supplied file.
    File(File),
}

impl StderrSink {
    pub(crate) fn into_stdio(self) -> std::io::Result<Stdio> {
        Ok(match self {
            StderrSink::TempFile => Stdio::from(tempfile::tempfile()?),
            StderrSink::Inherit => Stdio::inherit(),
            StderrSink::Null => Stdio::null(),
            StderrSink::File(file) => Stdio::from(file),
        })
    }
}

/// How the readiness poll behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessPolicy {
    pub attempts: u32,
    pub interval: Duration,
}

impl Default for ReadinessPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_READY_ATTEMPTS,
            interval: DEFAULT_READY_INTERVAL,
        }
    }
}

/// Everything needed to launch a proxy.
///
/// ```no_run
/// use everdeen::ServerOptions;
///
/// let options = ServerOptions::new(4321, 4322)
///     .with_ca("/tmp/ca_cert.crt", "/tmp/ca_key");
/// assert_eq!(options.proxy_addr(), "127.0.0.1:4321");
/// ```
#[derive(Debug)]
pub struct ServerOptions {
    pub host: String,
    pub proxy_port: u16,
    pub control_port: u16,
    pub ca_cert_path: Option<PathBuf>,
    pub ca_key_path: Option<PathBuf>,
    /// Explicit proxy binary; skips the platform lookup when set.
    pub binary: Option<PathBuf>,
    /// Directory holding the per-platform binaries.
    pub binaries_dir: PathBuf,
    pub stderr: StderrSink,
    pub readiness: ReadinessPolicy,
    pub shutdown_grace: Duration,
    /// Timeout applied to each control call; reqwest's default when `None`.
    pub request_timeout: Option<Duration>,
}

impl ServerOptions {
    pub fn new(proxy_port: u16, control_port: u16) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            proxy_port,
            control_port,
            ca_cert_path: None,
            ca_key_path: None,
            binary: None,
            binaries_dir: super::platform::default_binaries_dir(),
            stderr: StderrSink::default(),
            readiness: ReadinessPolicy::default(),
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
            request_timeout: None,
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// CA material used by the proxy to intercept TLS.
    pub fn with_ca(mut self, cert: impl Into<PathBuf>, key: impl Into<PathBuf>) -> Self {
        self.ca_cert_path = Some(cert.into());
        self.ca_key_path = Some(key.into());
        self
    }

    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = Some(binary.into());
        self
    }

    pub fn with_binaries_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.binaries_dir = dir.into();
        self
    }

    pub fn with_stderr(mut self, stderr: StderrSink) -> Self {
        self.stderr = stderr;
        self
    }

    pub fn with_readiness(mut self, attempts: u32, interval: Duration) -> Self {
        self.readiness = ReadinessPolicy { attempts, interval };
        self
    }

    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn proxy_addr(&self) -> String {
        format!("{}:{}", self.host, self.proxy_port)
    }

    pub fn control_addr(&self) -> String {
        format!("{}:{}", self.host, self.control_port)
    }

    pub fn control_url(&self) -> String {
        format!("http://{}", self.control_addr())
    }

    /// Arguments passed to the proxy binary.
    pub fn command_args(&self) -> Vec<String> {
        let mut args = vec![
            format!("-proxy-addr={}", self.proxy_addr()),
            format!("-control-addr={}", self.control_addr()),
        ];
        if let Some(cert) = &self.ca_cert_path {
            args.push(format!("-ca-cert-path={}", cert.display()));
        }
        if let Some(key) = &self.ca_key_path {
            args.push(format!("-ca-key-path={}", key.display()));
        }
        args
    }
}
