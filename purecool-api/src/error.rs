use thiserror::Error;

/// Errors raised while decoding or encoding PureCool Link wire data
#[derive(Debug, Error)]
pub enum ApiError {
    /// The manifest credential blob could not be turned into a password
    ///
    /// Covers base64 decoding, AES decryption, padding removal and parsing of
    /// the decrypted JSON envelope. Fatal to connecting and never retried.
    #[error("Credential decode error: {0}")]
    CredentialDecode(String),

    /// An incoming status message could not be decoded
    ///
    /// Raised for invalid JSON and for status snapshots missing a required
    /// field. The session swallows these per message.
    #[error("Malformed status message: {0}")]
    MalformedStatus(String),

    /// The cloud manifest could not be parsed
    #[error("Manifest error: {0}")]
    Manifest(String),

    /// A command could not be serialized
    #[error("Encode error: {0}")]
    Encode(String),
}

/// Type alias for results that can return an ApiError
pub type Result<T> = std::result::Result<T, ApiError>;
