//! Error types for content cache construction.

/// Error type for content cache operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The cache configuration cannot be used.
    #[error("Invalid cache configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for content cache operations.
pub type Result<T> = std::result::Result<T, Error>;
