use std::fmt;
use std::path::PathBuf;

use thiserror::Error;
use widerow_model::{ModelError, SchemaError};
use widerow_store::StoreError;

/// Failure classes of row and batch operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    UnknownError = 500,
    NoRetryStoreError = 1001,
    RetryableStoreError = 1002,
    IoError = 1003,
}

impl ErrorCode {
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Store and I/O failures leave the shared connection suspect.
    pub fn invalidates_connection(self) -> bool {
        !matches!(self, ErrorCode::UnknownError)
    }

    pub fn classify(err: &StoreError) -> Self {
        match err {
            StoreError::DoNotRetry(_) => ErrorCode::NoRetryStoreError,
            StoreError::Retryable(_) => ErrorCode::RetryableStoreError,
            StoreError::Io(_) | StoreError::Closed => ErrorCode::IoError,
            StoreError::Other(_) => ErrorCode::UnknownError,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCode::UnknownError => "UNKNOWN_ERROR",
            ErrorCode::NoRetryStoreError => "NO_RETRY_STORE_ERROR",
            ErrorCode::RetryableStoreError => "RETRYABLE_STORE_ERROR",
            ErrorCode::IoError => "IO_ERROR",
        };
        write!(f, "{name}({})", self.code())
    }
}

/// What a row operation failed on.
#[derive(Debug, Error)]
pub enum CrudCause {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Model(#[from] ModelError),
}

/// A classified row or batch failure.
///
/// Displays as a JSON object: `{"cause":..,"code":..,"message":..}`.
#[derive(Debug)]
pub struct CrudError {
    code: ErrorCode,
    message: String,
    cause: Option<CrudCause>,
}

impl CrudError {
    pub fn new(code: ErrorCode, message: impl Into<String>, cause: Option<CrudCause>) -> Self {
        Self {
            code,
            message: message.into(),
            cause,
        }
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn cause(&self) -> Option<&CrudCause> {
        self.cause.as_ref()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "code": self.code.code(),
            "message": self.message,
            "cause": self.cause.as_ref().map(|c| c.to_string()),
        })
    }
}

impl fmt::Display for CrudError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl std::error::Error for CrudError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause.as_ref().map(|c| c as &(dyn std::error::Error + 'static))
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration resource {name} not found in {searched:?}")]
    ResourceNotFound { name: String, searched: Vec<PathBuf> },

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Unrecoverable session failures. These abort the operation and are never retried.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("could not acquire table {table} after {attempts} attempts: {source}")]
    Exhausted {
        table: String,
        attempts: u32,
        #[source]
        source: StoreError,
    },
}

#[derive(Debug, Error)]
pub enum DaoError {
    #[error("{0}")]
    Crud(#[from] CrudError),

    #[error("session error: {0}")]
    Session(#[from] SessionError),

    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),
}

impl DaoError {
    /// The per-row failure, if this is one.
    pub fn as_crud(&self) -> Option<&CrudError> {
        match self {
            DaoError::Crud(err) => Some(err),
            _ => None,
        }
    }
}
