//! Error types and handling for Helion
//!
//! This module defines the error types used throughout the application,
//! providing consistent error handling and reporting.

use thiserror::Error;

/// Result type alias for Helion operations
pub type Result<T> = std::result::Result<T, HelionError>;

/// Main error type for Helion
#[derive(Debug, Error)]
pub enum HelionError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Socket open/write/read failures while talking to the inverter
    #[error("Connection error: {message}")]
    Connection { message: String },

    /// The inverter answered, but with nothing we could decode
    #[error("Protocol error: {message}")]
    Protocol { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// File I/O errors
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Timeout errors
    #[error("Timeout error: {message}")]
    Timeout { message: String },

    /// Validation errors
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    /// Generic errors with context
    #[error("Error: {message}")]
    Generic { message: String },
}

impl HelionError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        HelionError::Config {
            message: message.into(),
        }
    }

    /// Create a new connection error
    pub fn connection<S: Into<String>>(message: S) -> Self {
        HelionError::Connection {
            message: message.into(),
        }
    }

    /// Create a new protocol error
    pub fn protocol<S: Into<String>>(message: S) -> Self {
        HelionError::Protocol {
            message: message.into(),
        }
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        HelionError::Io {
            message: message.into(),
        }
    }

    /// Create a new timeout error
    pub fn timeout<S: Into<String>>(message: S) -> Self {
        HelionError::Timeout {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(field: S, message: S) -> Self {
        HelionError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new generic error
    pub fn generic<S: Into<String>>(message: S) -> Self {
        HelionError::Generic {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for HelionError {
    fn from(err: std::io::Error) -> Self {
        HelionError::io(err.to_string())
    }
}

impl From<serde_yaml::Error> for HelionError {
    fn from(err: serde_yaml::Error) -> Self {
        HelionError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for HelionError {
    fn from(err: serde_json::Error) -> Self {
        HelionError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<chrono::ParseError> for HelionError {
    fn from(err: chrono::ParseError) -> Self {
        HelionError::validation("datetime", err.to_string().as_str())
    }
}
