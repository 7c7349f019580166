// Error types for the coordinator and the endpoint.

use std::io;

use thiserror::Error;

/// Failure to bring a coordinator up. Once running, the coordinator never
/// fails as a whole; per-endpoint problems become disconnects.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to configure listener: {0}")]
    Listener(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum EndpointError {
    #[error("could not resolve {addr}")]
    Resolve { addr: String },
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },
    #[error("not connected")]
    NotConnected,
    #[error("send failed: {0}")]
    Send(#[source] io::Error),
    #[error("connection setup failed: {0}")]
    Setup(#[source] io::Error),
}
