//! Launching and supervising the proxy subprocess.
//!
//! The proxy is an opaque binary started with `-proxy-addr`/`-control-addr`
//! (and optional CA paths). [`ProcessManager`] spawns it, polls `/ping` until
//! it answers `PONG`, forwards control calls, and interrupts it on `stop`.

mod manager;
mod options;
mod platform;

pub use manager::{ProcessManager, ServerState};
pub use options::{
    ReadinessPolicy, ServerOptions, StderrSink, DEFAULT_READY_ATTEMPTS, DEFAULT_READY_INTERVAL,
    DEFAULT_SHUTDOWN_GRACE,
};
pub use platform::{binary_path, default_binaries_dir, platform_suffix, BINARIES_DIR_ENV, SERVER_VERSION};
