use thiserror::Error;

/// Errors that can occur during blob storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No object is stored under the requested key.
    #[error("blob not found: {0}")]
    NotFound(String),

    /// The store cannot serve requests right now.
    #[error("blob store unavailable: {0}")]
    Unavailable(String),

    #[error("storage IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The key is not a well-formed content hash.
    #[error("invalid content hash: {0}")]
    InvalidHash(String),

    #[error("invalid namespace: {0}")]
    InvalidNamespace(String),

    /// The blob exceeds the configured size limit.
    #[error("blob exceeds size limit ({actual} > {limit} bytes)")]
    SizeLimitExceeded { actual: u64, limit: u64 },
}

impl StorageError {
    /// Whether the error only means "this key addresses nothing".
    ///
    /// A malformed key can never address a stored object, so it counts as
    /// missing as well.
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::InvalidHash(_))
    }
}
