//! Error type shared by the model, the control client and the process manager.

use reqwest::StatusCode;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building expectations or talking to the proxy.
#[derive(Error, Debug)]
pub enum Error {
    /// The control endpoint refused the connection.
    ///
    /// Expected while the proxy is still booting; the readiness poll treats it
    /// as "not ready yet".
    #[error("cannot connect to control server at {url}: {source}")]
    Connection {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The control server answered with something that is not the expected JSON.
    #[error("unexpected response from {url}: {message}")]
    Protocol { url: String, message: String },

    /// The control server answered with a non-success status.
    #[error("control server returned {status} for {url}: {body}")]
    Http {
        url: String,
        status: StatusCode,
        body: String,
    },

    /// Any other transport failure (timeout, reset, invalid URL).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The proxy never answered `PONG`; the subprocess has been terminated.
    #[error("proxy did not become ready after {attempts} attempts{}", last_error_suffix(.last_error))]
    StartTimeout {
        attempts: u32,
        last_error: Option<String>,
    },

    /// No bundled proxy binary exists for this host.
    #[error("everdeen does not support this architecture ({os} {arch})")]
    UnsupportedPlatform { os: String, arch: String },

    /// A descriptor or builder argument was rejected.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The process manager was asked to do something its state forbids.
    #[error("cannot {action} while the proxy is {state}")]
    InvalidState {
        action: &'static str,
        state: crate::server::ServerState,
    },

    /// Spawning or waiting on the subprocess failed.
    #[error("proxy process error: {0}")]
    Spawn(#[from] std::io::Error),

    /// Delivering a signal to the subprocess failed.
    #[error("failed to signal proxy process: {0}")]
    Signal(#[from] nix::Error),

    /// A captured body was not valid base64.
    #[error("captured body is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),
}

fn last_error_suffix(last_error: &Option<String>) -> String {
    match last_error {
        Some(e) => format!(" (last error: {e})"),
        None => String::new(),
    }
}

impl Error {
    /// Whether this is a refused connection, i.e. nothing listens on the control port yet.
    pub fn is_connection(&self) -> bool {
        matches!(self, Error::Connection { .. })
    }

    pub(crate) fn protocol(url: &str, message: impl Into<String>) -> Self {
        Error::Protocol {
            url: url.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Error::InvalidArgument(message.into())
    }
}
