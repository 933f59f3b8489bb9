//! Agent error types.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Fatal errors during agent startup.
///
/// Once the dispatch loop runs, nothing is fatal anymore: bad frames and
/// failed player calls are logged and dropped.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("no config file found (looked in the XDG config dir and /etc)")]
    ConfigNotFound,

    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    #[error("no players configured in the magazine")]
    EmptyMagazine,

    #[error("bus socket error: {0}")]
    Bus(#[from] io::Error),

    #[error("session bus error: {0}")]
    DBus(#[from] zbus::Error),

    #[error("session bus error: {0}")]
    Fdo(#[from] zbus::fdo::Error),

    #[error("failed to install signal handler: {0}")]
    Signal(#[from] ctrlc::Error),
}
