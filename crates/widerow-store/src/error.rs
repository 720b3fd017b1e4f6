use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The store refuses the operation and retrying it cannot help.
    #[error("do not retry: {0}")]
    DoNotRetry(String),

    /// Store-internal or transient failure.
    #[error("store error: {0}")]
    Retryable(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("connection closed")]
    Closed,

    #[error("{0}")]
    Other(String),
}
