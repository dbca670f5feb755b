//! Error types for address resolution.

use std::fmt;

/// Error type for resolution operations.
///
/// A timeout is an ordinary outcome here: the fan may simply be off or on
/// another network, and the caller decides whether to try again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryError {
    /// No matching announcement arrived before every attempt ran out
    Timeout,
    /// The service browser could not be started
    Browser(String),
}

impl fmt::Display for DiscoveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscoveryError::Timeout => write!(f, "No matching device announcement before timeout"),
            DiscoveryError::Browser(msg) => write!(f, "Service browser error: {}", msg),
        }
    }
}

impl std::error::Error for DiscoveryError {}

/// Convenience Result type alias for resolution operations.
pub type Result<T> = std::result::Result<T, DiscoveryError>;
