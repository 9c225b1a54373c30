use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Process-level failures. Per-connection problems (unparsable requests,
/// truncated bodies) never surface here; they are logged and the capture
/// keeps whatever was read.
#[derive(Debug, Error)]
pub enum Error {
    #[error("could not bind port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: io::Error,
    },

    #[error("invalid HTTP status code: {0}")]
    InvalidStatus(u16),

    #[error("invalid HTTP method: {0}")]
    InvalidMethod(String),

    #[error("invalid header {0:?}, expected \"Key: Value\"")]
    InvalidHeader(String),

    #[error("request body is not valid JSON: {0}")]
    InvalidBody(#[from] serde_json::Error),

    #[error("could not build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("could not write capture to {path}: {source}")]
    ExportIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not read capture from {path}: {source}")]
    LoadIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{path} is not a valid capture file: {source}")]
    ExportFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to wait for interrupt: {0}")]
    Signal(#[from] io::Error),
}
