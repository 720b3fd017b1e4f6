mod auth;
mod config;
mod dao;
mod error;
mod session;

pub use auth::{AuthError, Authenticator, Credentials, NoopAuthenticator};
pub use config::{
    CONF_DIR_ENV, ConfigResource, DEFAULT_MAX_ATTEMPTS, DEFAULT_REFRESH_INTERVAL, DEFAULT_RESOURCE,
    DEFAULT_RETRY_BACKOFF, SecurityConfig, SessionSettings, StoreConfig,
};
pub use dao::CrudDao;
pub use error::{ConfigError, CrudCause, CrudError, DaoError, ErrorCode, SessionError};
pub use session::{SessionManager, SessionState, TableGuard};
