//! Error types
//!
//! Crate-level error plus the errors produced by the hub core.

use std::time::Duration;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug)]
pub enum Error {
    /// Socket or transport I/O failure
    Io(std::io::Error),
    /// Hub core rejected the operation
    Hub(HubError),
    /// HTTP server failure
    Server(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Hub(e) => write!(f, "Hub error: {}", e),
            Error::Server(msg) => write!(f, "Server error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Hub(e) => Some(e),
            Error::Server(_) => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<HubError> for Error {
    fn from(e: HubError) -> Self {
        Error::Hub(e)
    }
}

/// Errors returned by [`Hub`](crate::hub::Hub) entry points
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HubError {
    /// Transport cannot flush partial output, so it cannot carry a stream
    FlushUnsupported,
    /// Coordinator task is no longer running
    CoordinatorClosed,
    /// Coordinator did not accept a publish within the configured bound
    PublishTimeout(Duration),
}

impl std::fmt::Display for HubError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HubError::FlushUnsupported => write!(f, "Transport does not support flushing"),
            HubError::CoordinatorClosed => write!(f, "Coordinator is not running"),
            HubError::PublishTimeout(after) => {
                write!(f, "Coordinator did not accept publish within {:?}", after)
            }
        }
    }
}

impl std::error::Error for HubError {}
