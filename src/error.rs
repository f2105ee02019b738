//! Error types and handling for the Sidequest engine

use thiserror::Error;

/// Main error type for the Sidequest engine
#[derive(Error, Debug)]
pub enum SidequestError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Provider registration rejected (duplicate type tag, bad weight)
    #[error("Registration error: {message}")]
    Registration { message: String },

    /// Cache operation errors
    #[error("Cache error: {message}")]
    Cache { message: String },

    /// Content store could not be read
    #[error("Content store error: {message}")]
    ContentStore { message: String },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

/// Result alias for fallible engine operations
pub type Result<T> = std::result::Result<T, SidequestError>;

impl SidequestError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new registration error
    pub fn registration<S: Into<String>>(message: S) -> Self {
        Self::Registration {
            message: message.into(),
        }
    }

    /// Create a new cache error
    pub fn cache<S: Into<String>>(message: S) -> Self {
        Self::Cache {
            message: message.into(),
        }
    }

    /// Create a new content store error
    pub fn content_store<S: Into<String>>(message: S) -> Self {
        Self::ContentStore {
            message: message.into(),
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            SidequestError::Config { .. } => {
                "Configuration error. Please check your config file and API keys.".to_string()
            }
            SidequestError::Registration { message } => {
                format!("Provider setup failed: {message}")
            }
            SidequestError::Cache { .. } => {
                "Cache operation failed. You may need to clear your cache.".to_string()
            }
            SidequestError::ContentStore { .. } => {
                "Activity ideas are unavailable right now. Please try again later.".to_string()
            }
            SidequestError::Io { .. } => {
                "File operation failed. Please check file permissions.".to_string()
            }
        }
    }
}
