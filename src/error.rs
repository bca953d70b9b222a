//! Crate-level error types.

use thiserror::Error;

use crate::config::ConfigError;

/// Failures of the server shell.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to accept connection: {0}")]
    Accept(#[source] std::io::Error),

    #[error("server is already listening")]
    AlreadyListening,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A transport fault. Fatal to the connection it occurred on.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP/2 protocol error: {0}")]
    Http2(#[from] h2::Error),

    #[error("HTTP/1.1 protocol error: {0}")]
    Http1(#[from] hyper::Error),
}
