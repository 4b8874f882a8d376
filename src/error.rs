//! Flarelink client error types.
//!
//! Handshake failures are modelled as a dedicated tagged enum
//! ([`HandshakeFailure`]) so that callers and signal handlers can branch on
//! the failure kind instead of matching on message text. Everything else the
//! client can run into (transport glue, config, serialization) funnels into
//! [`FlarelinkError`].

use thiserror::Error;

pub use crate::handshake::HandshakeFailure;

/// Flarelink client errors.
#[derive(Error, Debug)]
pub enum FlarelinkError {
    /// A handshake attempt ended in a failure outcome.
    ///
    /// The inner [`HandshakeFailure`] is the same value carried by the
    /// `TIMED_OUT` signal emitted for the attempt.
    #[error("handshake failed: {0}")]
    Handshake(#[from] HandshakeFailure),

    /// Operation requires an established session.
    #[error("session not established")]
    SessionNotEstablished,

    /// Framed session error (open, send or close on the byte stream).
    #[error("session error: {0}")]
    Session(String),

    /// Network communication error.
    #[error("network error: {0}")]
    Network(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Flarelink operations
pub type Result<T> = std::result::Result<T, FlarelinkError>;

impl From<reqwest::Error> for FlarelinkError {
    fn from(err: reqwest::Error) -> Self {
        FlarelinkError::Network(err.to_string())
    }
}

impl From<toml::de::Error> for FlarelinkError {
    fn from(err: toml::de::Error) -> Self {
        FlarelinkError::Config(err.to_string())
    }
}
