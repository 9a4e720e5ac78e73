//! Error types and handling for `TripSky`

use thiserror::Error;

/// Main error type for the `TripSky` library
#[derive(Error, Debug)]
pub enum TripSkyError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Upstream service reported a failure
    #[error("API error: {message}")]
    Api { message: String },

    /// Input validation errors
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// Upstream payload could not be interpreted
    #[error("Parse error: {message}")]
    Parse { message: String },

    /// Transport-level HTTP failures
    #[error("Network error: {source}")]
    Network {
        #[from]
        source: reqwest::Error,
    },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl TripSkyError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new API error
    pub fn api<S: Into<String>>(message: S) -> Self {
        Self::Api {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new parse error
    pub fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            TripSkyError::Config { .. } => {
                "Configuration error. Please check your config file and API keys.".to_string()
            }
            TripSkyError::Api { message } => format!("Map or weather service refused the request: {message}"),
            TripSkyError::Network { .. } => {
                "Unable to connect to external services. Please check your internet connection."
                    .to_string()
            }
            TripSkyError::Validation { message } => {
                format!("Invalid input: {message}")
            }
            TripSkyError::Parse { .. } => {
                "Received an unexpected answer from an external service.".to_string()
            }
            TripSkyError::Io { .. } => {
                "File operation failed. Please check file permissions.".to_string()
            }
        }
    }
}
