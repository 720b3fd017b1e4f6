use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

/// A keytab/principal pair used to obtain store credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    keytab_file: PathBuf,
    principal: String,
}

impl Credentials {
    pub fn new(keytab_file: impl Into<PathBuf>, principal: impl Into<String>) -> Self {
        Self {
            keytab_file: keytab_file.into(),
            principal: principal.into(),
        }
    }

    pub fn keytab_file(&self) -> &Path {
        &self.keytab_file
    }

    pub fn principal(&self) -> &str {
        &self.principal
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("login failed for {principal}: {reason}")]
    Rejected { principal: String, reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Logs the process in with a credential pair.
///
/// Called on first initialization, after every configuration reload and on
/// each refresh tick. Implementations must tolerate repeated logins with the
/// same credentials.
pub trait Authenticator: Send + Sync {
    fn login(&self, credentials: &Credentials) -> Result<(), AuthError>;
}

/// Accepts every login. For stores without authentication.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAuthenticator;

impl Authenticator for NoopAuthenticator {
    fn login(&self, credentials: &Credentials) -> Result<(), AuthError> {
        debug!(principal = credentials.principal(), "noop login");
        Ok(())
    }
}
