//! Error types for pagecache

use std::fmt;
use std::io;
use std::time::Duration;

/// Result type alias for pagecache operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for cache operations
#[derive(Debug)]
pub enum Error {
    /// Backing store unreachable or connection lost
    StoreUnavailable(io::Error),

    /// Store operation exceeded its deadline
    StoreTimeout(Duration),

    /// Store replied with an error or malformed data
    Protocol(String),

    /// Fetch failed: network error, non-2xx status, or timeout
    Fetch {
        /// HTTP status, when one was received
        status: Option<u16>,
        /// Failure detail
        message: String,
    },

    /// Embedded store engine rejected the operation
    Store(pagestore::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::StoreUnavailable(e) => write!(f, "store unavailable: {}", e),
            Error::StoreTimeout(deadline) => {
                write!(f, "store operation timed out after {:?}", deadline)
            }
            Error::Protocol(msg) => write!(f, "store protocol error: {}", msg),
            Error::Fetch {
                status: Some(status),
                message,
            } => write!(f, "fetch failed with status {}: {}", status, message),
            Error::Fetch {
                status: None,
                message,
            } => write!(f, "fetch failed: {}", message),
            Error::Store(e) => write!(f, "store error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::StoreUnavailable(e) => Some(e),
            Error::Store(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::StoreUnavailable(err)
    }
}

impl From<pagestore::Error> for Error {
    fn from(err: pagestore::Error) -> Self {
        Error::Store(err)
    }
}
