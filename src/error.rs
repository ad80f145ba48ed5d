//! Error handling for the distributed proof-of-work search
//!
//! One error type covers the pure search primitives (nonce codec, range
//! partitioner) as well as the coordinator and worker connection handling.

use thiserror::Error;

/// Result type alias for proof-of-work operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the proof-of-work cluster
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML configuration parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Connection-level failures while talking to a peer
    #[error("Transport failure: {message}")]
    Transport { message: String },

    /// A peer sent bytes that do not form a valid message
    #[error("Protocol error: {message}")]
    Protocol { message: String },

    /// A nonce byte is not part of the configured character set
    #[error("Invalid nonce character {character:?} at position {position}")]
    InvalidCharacter { character: char, position: usize },

    /// The search space does not fit into a 64-bit rank
    #[error("Search space {charset_size}^{nonce_length} overflows a 64-bit rank")]
    SpaceOverflow { charset_size: usize, nonce_length: usize },

    /// Invalid state errors
    #[error("Invalid state: {message}")]
    InvalidState { message: String },
}

impl Error {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a protocol error
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Create an invalid character error
    pub fn invalid_character(byte: u8, position: usize) -> Self {
        Self::InvalidCharacter {
            character: char::from(byte),
            position,
        }
    }

    /// Create a search space overflow error
    pub fn space_overflow(charset_size: usize, nonce_length: usize) -> Self {
        Self::SpaceOverflow {
            charset_size,
            nonce_length,
        }
    }

    /// Create an invalid state error
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Check if the error ends the connection it happened on.
    ///
    /// Nothing is ever retried; a transport error simply terminates the
    /// affected session or worker.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::Io(_) | Error::Transport { .. } | Error::Protocol { .. }
        )
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Error::Io(_) => "io",
            Error::Json(_) => "json",
            Error::Yaml(_) => "yaml",
            Error::Config { .. } => "config",
            Error::Transport { .. } => "transport",
            Error::Protocol { .. } => "protocol",
            Error::InvalidCharacter { .. } => "invalid_character",
            Error::SpaceOverflow { .. } => "space_overflow",
            Error::InvalidState { .. } => "invalid_state",
        }
    }
}
