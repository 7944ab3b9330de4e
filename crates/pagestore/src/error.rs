//! Error types for pagestore

use std::fmt;

/// Result type alias for pagestore operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for store operations
#[derive(Debug)]
pub enum Error {
    /// Value too large (max 1 MB)
    ValueTooLarge(usize),

    /// Key holds a value that is not a decimal integer
    NotAnInteger(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ValueTooLarge(size) => {
                write!(f, "Value too large: {} bytes (max 1 MB)", size)
            }
            Error::NotAnInteger(key) => {
                write!(f, "Value at '{}' is not an integer", key)
            }
        }
    }
}

impl std::error::Error for Error {}
