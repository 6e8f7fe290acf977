use std::io;

use thiserror::Error;

/// Errors raised by the backend, the OBS client and config handling.
#[derive(Error, Debug)]
pub enum HighlightError {
    #[error("Failed to reach OBS at {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: obws::error::Error,
    },

    #[error("OBS rejected the password")]
    AuthenticationFailed,

    #[error("OBS requires a password")]
    PasswordRequired,

    #[error("OBS connection closed: {0}")]
    ConnectionClosed(String),

    #[error("Unexpected state in OBS: {0}")]
    Protocol(String),

    #[error("OBS request {request_type} failed ({code}): {comment}")]
    Request {
        request_type: String,
        code: String,
        comment: String,
    },

    #[error("OBS request {0} timed out")]
    Timeout(String),

    #[error("OBS error: {0}")]
    Obs(#[from] obws::error::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown game command: {0}")]
    UnknownCommand(String),

    #[error("Not connected to OBS")]
    NotConnected,

    #[error("Highlight capture is already running")]
    AlreadyRunning,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, HighlightError>;
