// src/error.rs
//
// Error taxonomy shared by discovery, inspection, port access and the bridge.
// Discovery and inspection mostly swallow these (logged, degraded result);
// port open/read failures and argument errors reach the caller.

use std::path::PathBuf;
use thiserror::Error;

/// Convenience alias for results using the bridge error type.
pub type BridgeResult<T> = std::result::Result<T, BridgeError>;

#[derive(Error, Debug)]
pub enum BridgeError {
    /// Driver table or device root could not be opened or read
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Bad path, permission denied, busy device or unsupported baud rate
    #[error("Failed to open {path}: {reason}")]
    PortOpen { path: String, reason: String },

    /// I/O error during a single bounded read
    #[error("Read failed: {0}")]
    Read(#[source] std::io::Error),

    #[error("{0} is required")]
    MissingArgument(&'static str),

    #[error("Invalid argument {name}: {reason}")]
    InvalidArgument { name: &'static str, reason: String },

    #[error("Method '{0}' is not implemented")]
    NotImplemented(String),
}

impl BridgeError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BridgeError::Io {
            path: path.into(),
            source,
        }
    }

    /// Machine-readable kind, carried next to the `ERROR` code in bridge results.
    pub fn kind(&self) -> &'static str {
        match self {
            BridgeError::Io { .. } => "io_failure",
            BridgeError::PortOpen { .. } => "port_open_failure",
            BridgeError::Read(_) => "read_failure",
            BridgeError::MissingArgument(_) => "missing_argument",
            BridgeError::InvalidArgument { .. } => "invalid_argument",
            BridgeError::NotImplemented(_) => "not_implemented",
        }
    }
}
