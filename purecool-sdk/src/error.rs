use thiserror::Error;

use crate::logging::LoggingError;

/// Errors raised by the pub/sub transport
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Failed to open broker connection: {0}")]
    Connect(String),

    #[error("Failed to publish: {0}")]
    Publish(String),

    #[error("Failed to subscribe: {0}")]
    Subscribe(String),

    #[error("Failed to disconnect: {0}")]
    Disconnect(String),
}

#[derive(Error, Debug)]
pub enum SdkError {
    /// The manifest credential could not be decrypted; fatal to connecting
    #[error("Credential error: {0}")]
    Credential(#[from] purecool_api::ApiError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Logging error: {0}")]
    Logging(#[from] LoggingError),
}

/// Type alias for results that can return an SdkError
pub type Result<T> = std::result::Result<T, SdkError>;
