//! Locating the bundled proxy binary for the host.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Version of the proxy binary this crate speaks to.
pub const SERVER_VERSION: &str = "1.0.0";

/// Environment variable naming the directory that holds the proxy binaries.
pub const BINARIES_DIR_ENV: &str = "EVERDEEN_BINARIES_DIR";

/// Suffix of the proxy binary built for `os`/`arch`.
pub fn platform_suffix(os: &str, arch: &str) -> Result<&'static str> {
    match (os, arch) {
        ("macos", _) => Ok("darwin-amd64"),
        ("linux", "x86_64" | "aarch64" | "powerpc64" | "s390x" | "riscv64") => Ok("linux-amd64"),
        ("linux", _) => Ok("linux-386"),
        _ => Err(Error::UnsupportedPlatform {
            os: os.to_string(),
            arch: arch.to_string(),
        }),
    }
}

/// Path of the proxy binary for this host inside `dir`.
pub fn binary_path(dir: &Path) -> Result<PathBuf> {
    let suffix = platform_suffix(std::env::consts::OS, std::env::consts::ARCH)?;
    Ok(dir.join(format!("everdeen_{SERVER_VERSION}_{suffix}")))
}

/// Directory searched when no explicit binary is configured:
/// `$EVERDEEN_BINARIES_DIR`, else `./binaries`.
pub fn default_binaries_dir() -> PathBuf {
    std::env::var_os(BINARIES_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("binaries"))
}
