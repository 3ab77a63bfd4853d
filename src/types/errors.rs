use std::fmt;

use serde::{Deserialize, Serialize};

// === ErrorKind ===

/// User-facing error taxonomy surfaced inline by the presentation layer.
///
/// This is the value held in the controller's `last_error`; it never carries
/// backend details, which are logged instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The submitted URL could not be parsed after normalization.
    InvalidUrl,
    /// An insert or delete was rejected or could not reach the store.
    StoreWrite,
    /// A read could not reach the store.
    StoreUnavailable,
    /// No principal is signed in.
    Unauthenticated,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::InvalidUrl => write!(f, "Invalid URL"),
            ErrorKind::StoreWrite => write!(f, "Could not save changes"),
            ErrorKind::StoreUnavailable => write!(f, "Bookmarks are unavailable right now"),
            ErrorKind::Unauthenticated => write!(f, "Not signed in"),
        }
    }
}

impl std::error::Error for ErrorKind {}

// === StoreError ===

/// Errors related to bookmark store operations.
#[derive(Debug)]
pub enum StoreError {
    /// The backend could not be reached.
    Unavailable(String),
    /// The backend answered with a non-success status.
    Rejected { status: u16, message: String },
    /// The backend response could not be decoded.
    Decode(String),
    /// Local database operation failed.
    Database(String),
}

impl StoreError {
    /// Maps a failed read onto the user-facing taxonomy.
    pub fn kind_for_read(&self) -> ErrorKind {
        ErrorKind::StoreUnavailable
    }

    /// Maps a failed insert or delete onto the user-facing taxonomy.
    pub fn kind_for_write(&self) -> ErrorKind {
        ErrorKind::StoreWrite
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Unavailable(msg) => write!(f, "Store unavailable: {}", msg),
            StoreError::Rejected { status, message } => {
                write!(f, "Store rejected request ({}): {}", status, message)
            }
            StoreError::Decode(msg) => write!(f, "Store response decode error: {}", msg),
            StoreError::Database(msg) => write!(f, "Store database error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

// === AuthError ===

/// Errors related to the authentication boundary.
#[derive(Debug)]
pub enum AuthError {
    /// The auth service could not be reached.
    Network(String),
    /// The auth service refused the request.
    Rejected(String),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::Network(msg) => write!(f, "Auth network error: {}", msg),
            AuthError::Rejected(msg) => write!(f, "Auth request rejected: {}", msg),
        }
    }
}

impl std::error::Error for AuthError {}

// === ConfigError ===

/// Errors related to configuration loading and validation.
#[derive(Debug)]
pub enum ConfigError {
    /// An I/O error occurred while reading or writing the config file.
    Io(String),
    /// Failed to serialize or deserialize configuration.
    Serialization(String),
    /// The provided config key is invalid.
    InvalidKey(String),
    /// The provided config value is invalid.
    InvalidValue(String),
    /// A required value is empty.
    MissingValue(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "Config I/O error: {}", msg),
            ConfigError::Serialization(msg) => {
                write!(f, "Config serialization error: {}", msg)
            }
            ConfigError::InvalidKey(key) => write!(f, "Invalid config key: {}", key),
            ConfigError::InvalidValue(msg) => write!(f, "Invalid config value: {}", msg),
            ConfigError::MissingValue(key) => write!(f, "Missing config value: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}
