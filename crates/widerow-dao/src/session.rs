//! The shared store connection.
//!
//! One connection per [`SessionManager`], created lazily on the first table
//! request and replaced whenever handing out a table or a row operation
//! fails. Configuration is loaded once on initialization and reloaded (with
//! a fresh login) after every failure. A background thread re-authenticates
//! on a fixed period while the session is in use.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam::channel::{self, Sender};
use once_cell::sync::OnceCell;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info, warn};
use widerow_store::{Connection, Connector, StoreError, Table};

use crate::auth::{Authenticator, Credentials};
use crate::config::{SessionSettings, StoreConfig};
use crate::error::SessionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Configuration has not been loaded yet.
    Uninitialized,
    /// A live connection is held.
    Open,
    /// Initialized, but no live connection. The next table request reconnects.
    Closed,
}

type Sleeper = Arc<dyn Fn(Duration) + Send + Sync>;

pub struct SessionManager {
    settings: SessionSettings,
    connector: Arc<dyn Connector>,
    authenticator: Arc<dyn Authenticator>,
    sleeper: Sleeper,
    initialized: OnceCell<()>,
    config: RwLock<StoreConfig>,
    credentials: Arc<RwLock<Option<Credentials>>>,
    connection: Mutex<Option<Arc<dyn Connection>>>,
    refresh: Mutex<Option<RefreshHandle>>,
}

impl SessionManager {
    pub fn new(
        settings: SessionSettings,
        connector: Arc<dyn Connector>,
        authenticator: Arc<dyn Authenticator>,
    ) -> Self {
        Self {
            settings,
            connector,
            authenticator,
            sleeper: Arc::new(thread::sleep),
            initialized: OnceCell::new(),
            config: RwLock::new(StoreConfig::default()),
            credentials: Arc::new(RwLock::new(None)),
            connection: Mutex::new(None),
            refresh: Mutex::new(None),
        }
    }

    /// Replace the blocking wait between acquisition attempts.
    pub fn with_sleeper(mut self, sleeper: impl Fn(Duration) + Send + Sync + 'static) -> Self {
        self.sleeper = Arc::new(sleeper);
        self
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn state(&self) -> SessionState {
        if self.initialized.get().is_none() {
            return SessionState::Uninitialized;
        }
        match self.connection.lock().as_ref() {
            Some(conn) if !conn.is_closed() => SessionState::Open,
            _ => SessionState::Closed,
        }
    }

    /// The configuration currently in effect.
    pub fn config(&self) -> StoreConfig {
        self.config.read().clone()
    }

    /// Load configuration, log in and start the refresh task. Runs once;
    /// concurrent callers block until the first run finishes. A failed first
    /// run is retried by the next call. After [`shutdown`](Self::shutdown)
    /// the refresh task is started again.
    pub fn initialize(&self) -> Result<(), SessionError> {
        self.initialized.get_or_try_init(|| -> Result<(), SessionError> {
            let config = self.settings.resource.load()?;
            self.install(config);
            info!(resource = self.settings.resource.name(), "session initialized");
            Ok(())
        })?;
        self.ensure_refresh();
        Ok(())
    }

    /// Whether the credential refresh task is running.
    pub fn refresh_active(&self) -> bool {
        self.refresh.lock().is_some()
    }

    /// Hand out a table, retrying up to `max_attempts` times. Between attempts
    /// the caller's thread waits `retry_backoff`, then configuration is
    /// reloaded and the process logs in again.
    pub fn table(&self, name: &str) -> Result<TableGuard, SessionError> {
        self.initialize()?;

        let attempts = self.settings.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.acquire(name) {
                Ok(table) => return Ok(TableGuard { table }),
                Err(e) if attempt < attempts => {
                    error!(
                        table = name,
                        attempt,
                        error = %e,
                        backoff_ms = self.settings.retry_backoff.as_millis() as u64,
                        "table acquisition failed, retrying"
                    );
                    (self.sleeper)(self.settings.retry_backoff);
                    self.reload();
                    attempt += 1;
                }
                Err(e) => {
                    error!(table = name, attempt, error = %e, "table acquisition failed, giving up");
                    return Err(SessionError::Exhausted {
                        table: name.to_string(),
                        attempts,
                        source: e,
                    });
                }
            }
        }
    }

    /// Called when a row operation failed in a way that implicates the
    /// connection. Disposes the connection, then reloads configuration and
    /// logs in again without waiting. The next table request reconnects.
    pub fn on_store_failure(&self) {
        warn!("store connection failure reported, reloading configuration");
        if let Some(conn) = self.connection.lock().take() {
            dispose(conn.as_ref());
        }
        self.reload();
    }

    /// Stop the refresh task and close the connection.
    pub fn shutdown(&self) {
        if let Some(mut handle) = self.refresh.lock().take() {
            handle.stop();
        }
        if let Some(conn) = self.connection.lock().take() {
            dispose(conn.as_ref());
        }
    }

    fn acquire(&self, name: &str) -> Result<Box<dyn Table>, StoreError> {
        let mut slot = self.connection.lock();
        let live = slot.as_ref().filter(|conn| !conn.is_closed()).cloned();
        let connection = match live {
            Some(conn) => conn,
            None => {
                let conn = self.connector.connect(&self.config.read().cluster)?;
                info!("opened store connection");
                *slot = Some(Arc::clone(&conn));
                conn
            }
        };

        match connection.table(name) {
            Ok(table) => Ok(table),
            Err(e) => {
                warn!(table = name, error = %e, "connection could not open table, disposing it");
                if let Some(conn) = slot.take() {
                    dispose(conn.as_ref());
                }
                Err(e)
            }
        }
    }

    fn reload(&self) {
        match self.settings.resource.load() {
            Ok(config) => self.install(config),
            Err(e) => error!(error = %e, "failed to reload store configuration"),
        }
    }

    fn install(&self, config: StoreConfig) {
        let credentials = config.credentials();
        *self.config.write() = config;
        *self.credentials.write() = credentials.clone();
        match credentials {
            Some(credentials) => login(self.authenticator.as_ref(), &credentials),
            None => debug!("no credentials configured, skipping login"),
        }
    }

    fn ensure_refresh(&self) {
        let mut refresh = self.refresh.lock();
        if refresh.is_some() {
            return;
        }
        *refresh = self.start_refresh();
    }

    fn start_refresh(&self) -> Option<RefreshHandle> {
        let interval = self.settings.refresh_interval;
        let authenticator = Arc::clone(&self.authenticator);
        let credentials = Arc::clone(&self.credentials);
        let (stop, stopped) = channel::bounded::<()>(0);

        let spawned = thread::Builder::new()
            .name("widerow-refresh".into())
            .spawn(move || {
                let ticker = channel::tick(interval);
                loop {
                    crossbeam::select! {
                        recv(ticker) -> _ => {
                            let current = credentials.read().clone();
                            match current {
                                Some(c) => login(authenticator.as_ref(), &c),
                                None => debug!("no credentials to refresh"),
                            }
                        }
                        recv(stopped) -> _ => break,
                    }
                }
            });

        match spawned {
            Ok(handle) => {
                debug!(interval_ms = interval.as_millis() as u64, "credential refresh started");
                Some(RefreshHandle {
                    stop: Some(stop),
                    handle: Some(handle),
                })
            }
            Err(e) => {
                error!(error = %e, "failed to start credential refresh");
                None
            }
        }
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn login(authenticator: &dyn Authenticator, credentials: &Credentials) {
    match authenticator.login(credentials) {
        Ok(()) => info!(principal = credentials.principal(), "login succeeded"),
        Err(e) => error!(principal = credentials.principal(), error = %e, "login failed"),
    }
}

fn dispose(connection: &dyn Connection) {
    if connection.is_closed() {
        return;
    }
    match connection.close() {
        Ok(()) => info!("closed store connection"),
        Err(e) => error!(error = %e, "failed to close store connection"),
    }
}

struct RefreshHandle {
    stop: Option<Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl RefreshHandle {
    fn stop(&mut self) {
        // Disconnecting the channel wakes the task.
        self.stop.take();
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// A table handle that is closed when dropped.
pub struct TableGuard {
    table: Box<dyn Table>,
}

impl Deref for TableGuard {
    type Target = dyn Table;

    fn deref(&self) -> &Self::Target {
        self.table.as_ref()
    }
}

impl DerefMut for TableGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.table.as_mut()
    }
}

impl Drop for TableGuard {
    fn drop(&mut self) {
        if let Err(e) = self.table.close() {
            error!(table = self.table.name(), error = %e, "failed to close table handle");
        }
    }
}
