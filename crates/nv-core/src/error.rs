use thiserror::Error;

pub type NvResult<T> = Result<T, NvError>;

#[derive(Debug, Error)]
pub enum NvError {
    /// Integrity check failed: wrong credential, tampering, or corruption.
    /// Carries no detail.
    #[error("authentication failed: could not decrypt")]
    Authentication,

    #[error("crypto error: {0}")]
    Crypto(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("vault is locked")]
    Locked,

    #[error("no vault has been set up")]
    NeedsSetup,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl NvError {
    /// Store-layer failures are transient; the caller may retry them.
    pub fn is_retryable(&self) -> bool {
        matches!(self, NvError::Storage(_) | NvError::Io(_))
    }
}

impl From<serde_json::Error> for NvError {
    fn from(e: serde_json::Error) -> Self {
        NvError::Serialization(e.to_string())
    }
}
