// Transport Error Types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("TCP port {0} is out of range (0-65535)")]
    PortOutOfRange(i64),

    #[error("Peer did not present an encryption-capable profile")]
    CryptoClientRequired,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Format error: {0}")]
    Format(String),

    #[error("Type version mismatch: expected '{expected}', received '{actual}'")]
    VersionMismatch { expected: String, actual: String },

    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Sink chain error: {0}")]
    Chain(String),
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        TransportError::Format(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
