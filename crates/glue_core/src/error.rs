use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to read asset `{asset}`")]
    Read {
        asset: String,
        #[source]
        source: io::Error,
    },
    #[error("asset `{asset}` declared {declared} bytes but yielded {actual}")]
    Truncated {
        asset: String,
        declared: usize,
        actual: usize,
    },
    #[error("failed to create directory `{}`", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write `{}`", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum ChromeError {
    #[error("host runtime is unavailable: {0}")]
    HostUnavailable(String),
    #[error("failed to resolve `{name}` on the host object model: {reason}")]
    Resolve { name: String, reason: String },
    #[error("host call `{name}` failed: {reason}")]
    Call { name: String, reason: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("lifecycle record is being destroyed")]
    Destroying,
    #[error("lifecycle record has already been destroyed")]
    Destroyed,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file `{}`", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config file `{}`", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("unknown completion marker `{0}` (expected `file` or `directory`)")]
    UnknownMarker(String),
}
