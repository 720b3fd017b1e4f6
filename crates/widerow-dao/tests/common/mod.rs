#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tempfile::TempDir;
use widerow_dao::{
    AuthError, Authenticator, ConfigResource, Credentials, CrudDao, SessionManager,
    SessionSettings,
};
use widerow_model::{Model, ModelError, SchemaBuilder, SchemaRegistry, Slot, digest};
use widerow_store::{
    ClusterProperties, Connection, Connector, Filter, MemoryConnector, MemoryStore, Row,
    RowDeletion, RowMutation, RowQuery, RowScanner, Scan, StoreError, Table,
};

pub const CF: &[u8] = b"d";

pub const CONFIG: &str = "\
cluster:
  quorum: zk1,zk2,zk3
  client.port: 2181
security:
  keytab_file: /etc/widerow/test.keytab
  principal: test@EXAMPLE.COM
";

// ── Model ───────────────────────────────────────────────────

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Message {
    pub from_uid: Option<i64>,
    pub to_uid: Option<i64>,
    pub body: Option<String>,
    pub timestamp: Option<i64>,
    pub extra: Option<HashMap<String, String>>,
}

impl Model for Message {
    fn describe(schema: SchemaBuilder<Self>) -> SchemaBuilder<Self> {
        schema
            .table("message")
            .family(CF)
            .field(1, Slot::long(|m: &Self| &m.from_uid, |m: &mut Self| &mut m.from_uid))
            .field(2, Slot::long(|m: &Self| &m.to_uid, |m: &mut Self| &mut m.to_uid))
            .field(3, Slot::string(|m: &Self| &m.body, |m: &mut Self| &mut m.body))
            .field(4, Slot::long(|m: &Self| &m.timestamp, |m: &mut Self| &mut m.timestamp))
            .map_field(5, Slot::map(|m: &Self| &m.extra, |m: &mut Self| &mut m.extra))
            .column(1, b"fromUid")
            .column(2, b"toUid")
            .column(3, b"body")
            .column(4, b"timestamp")
            .map_column(5, b"extra")
    }

    fn row_key(&self) -> Option<Vec<u8>> {
        let (from, to, ts) = (self.from_uid?, self.to_uid?, self.timestamp?);
        let mut key = conversation(from, to);
        key.extend_from_slice(&ts.to_be_bytes());
        Some(key)
    }

    fn validate(&self) -> Result<(), ModelError> {
        if self.from_uid.is_none() || self.to_uid.is_none() || self.timestamp.is_none() {
            return Err(ModelError::Validation(
                "from_uid, to_uid and timestamp must be set".into(),
            ));
        }
        Ok(())
    }

    fn default_filter(&self) -> Option<Filter> {
        Some(Filter::Family(CF.to_vec()))
    }
}

/// Row key prefix shared by every message between two users.
pub fn conversation(from: i64, to: i64) -> Vec<u8> {
    let mut key = Vec::with_capacity(40);
    key.extend_from_slice(&digest(from));
    key.extend_from_slice(&digest(to));
    key
}

pub fn message(from: i64, to: i64, ts: i64) -> Message {
    Message {
        from_uid: Some(from),
        to_uid: Some(to),
        timestamp: Some(ts),
        body: Some(format!("hello {ts}")),
        extra: Some(HashMap::from([("key1".to_string(), "value1".to_string())])),
    }
}

pub fn key_only(from: i64, to: i64, ts: i64) -> Message {
    Message {
        from_uid: Some(from),
        to_uid: Some(to),
        timestamp: Some(ts),
        ..Default::default()
    }
}

// ── Authenticator ───────────────────────────────────────────

#[derive(Default)]
pub struct RecordingAuthenticator {
    logins: AtomicUsize,
    principals: Mutex<Vec<String>>,
    reject: AtomicBool,
}

impl RecordingAuthenticator {
    pub fn logins(&self) -> usize {
        self.logins.load(Ordering::SeqCst)
    }

    pub fn principals(&self) -> Vec<String> {
        self.principals.lock().clone()
    }

    pub fn reject(&self, reject: bool) {
        self.reject.store(reject, Ordering::SeqCst);
    }
}

impl Authenticator for RecordingAuthenticator {
    fn login(&self, credentials: &Credentials) -> Result<(), AuthError> {
        self.logins.fetch_add(1, Ordering::SeqCst);
        self.principals.lock().push(credentials.principal().to_string());
        if self.reject.load(Ordering::SeqCst) {
            return Err(AuthError::Rejected {
                principal: credentials.principal().to_string(),
                reason: "ticket expired".into(),
            });
        }
        Ok(())
    }
}

// ── Store spy ─────────────────────────────────────────────

/// Failure injected into every row operation while set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    DoNotRetry,
    Retryable,
    Io,
    Other,
}

impl Fault {
    pub fn error(self) -> StoreError {
        match self {
            Fault::DoNotRetry => StoreError::DoNotRetry("region is not online".into()),
            Fault::Retryable => StoreError::Retryable("region too busy".into()),
            Fault::Io => StoreError::Io(std::io::Error::other("connection reset")),
            Fault::Other => StoreError::Other("unexpected response".into()),
        }
    }
}

/// Counts store interaction and injects failures around a [`MemoryStore`].
#[derive(Default)]
pub struct Spy {
    pub connects: AtomicUsize,
    pub connection_closes: AtomicUsize,
    pub table_requests: AtomicUsize,
    pub table_closes: AtomicUsize,
    pub calls: AtomicUsize,
    pub scanner_closes: AtomicUsize,
    fail_connects: AtomicBool,
    fail_tables: AtomicUsize,
    fault: Mutex<Option<Fault>>,
    failing_items: Mutex<Vec<usize>>,
    clusters: Mutex<Vec<ClusterProperties>>,
}

impl Spy {
    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        for counter in [
            &self.connects,
            &self.connection_closes,
            &self.table_requests,
            &self.table_closes,
            &self.calls,
            &self.scanner_closes,
        ] {
            counter.store(0, Ordering::SeqCst);
        }
    }

    /// Cluster properties of every connect, oldest first.
    pub fn clusters(&self) -> Vec<ClusterProperties> {
        self.clusters.lock().clone()
    }

    pub fn fail_connects(&self, fail: bool) {
        self.fail_connects.store(fail, Ordering::SeqCst);
    }

    /// Fail the next `n` table requests.
    pub fn fail_tables(&self, n: usize) {
        self.fail_tables.store(n, Ordering::SeqCst);
    }

    pub fn set_fault(&self, fault: Option<Fault>) {
        *self.fault.lock() = fault;
    }

    /// Batch writes report these input positions as not acknowledged.
    pub fn fail_items(&self, items: &[usize]) {
        *self.failing_items.lock() = items.to_vec();
    }

    fn call(&self) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match *self.fault.lock() {
            Some(fault) => Err(fault.error()),
            None => Ok(()),
        }
    }

    fn take_table_failure(&self) -> bool {
        self.fail_tables
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

pub struct SpyConnector {
    inner: MemoryConnector,
    spy: Arc<Spy>,
}

impl Connector for SpyConnector {
    fn connect(&self, properties: &ClusterProperties) -> Result<Arc<dyn Connection>, StoreError> {
        self.spy.connects.fetch_add(1, Ordering::SeqCst);
        self.spy.clusters.lock().push(properties.clone());
        if self.spy.fail_connects.load(Ordering::SeqCst) {
            return Err(StoreError::Io(std::io::Error::other("connection refused")));
        }
        Ok(Arc::new(SpyConnection {
            inner: self.inner.connect(properties)?,
            spy: Arc::clone(&self.spy),
        }))
    }
}

struct SpyConnection {
    inner: Arc<dyn Connection>,
    spy: Arc<Spy>,
}

impl Connection for SpyConnection {
    fn table(&self, name: &str) -> Result<Box<dyn Table>, StoreError> {
        self.spy.table_requests.fetch_add(1, Ordering::SeqCst);
        if self.spy.take_table_failure() {
            return Err(StoreError::Retryable("region server unavailable".into()));
        }
        Ok(Box::new(SpyTable {
            inner: self.inner.table(name)?,
            spy: Arc::clone(&self.spy),
        }))
    }

    fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    fn close(&self) -> Result<(), StoreError> {
        self.spy.connection_closes.fetch_add(1, Ordering::SeqCst);
        self.inner.close()
    }
}

struct SpyTable {
    inner: Box<dyn Table>,
    spy: Arc<Spy>,
}

impl SpyTable {
    fn per_item<T>(
        &self,
        items: &[T],
        apply: impl Fn(&T) -> Result<(), StoreError>,
    ) -> Vec<Result<(), StoreError>> {
        let failing = self.spy.failing_items.lock().clone();
        items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                if failing.contains(&i) {
                    Err(StoreError::Retryable(format!("item {i} rejected")))
                } else {
                    apply(item)
                }
            })
            .collect()
    }
}

impl Table for SpyTable {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn get(&self, query: &RowQuery) -> Result<Row, StoreError> {
        self.spy.call()?;
        self.inner.get(query)
    }

    fn get_many(&self, queries: &[RowQuery]) -> Result<Vec<Row>, StoreError> {
        self.spy.call()?;
        self.inner.get_many(queries)
    }

    fn scan<'a>(&'a self, scan: &Scan) -> Result<Box<dyn RowScanner + 'a>, StoreError> {
        self.spy.call()?;
        Ok(Box::new(SpyScanner {
            inner: self.inner.scan(scan)?,
            spy: &self.spy,
        }))
    }

    fn put(&self, mutation: &RowMutation) -> Result<(), StoreError> {
        self.spy.call()?;
        self.inner.put(mutation)
    }

    fn put_many(
        &self,
        mutations: &[RowMutation],
    ) -> Result<Vec<Result<(), StoreError>>, StoreError> {
        self.spy.call()?;
        Ok(self.per_item(mutations, |m| self.inner.put(m)))
    }

    fn delete(&self, deletion: &RowDeletion) -> Result<(), StoreError> {
        self.spy.call()?;
        self.inner.delete(deletion)
    }

    fn delete_many(
        &self,
        deletions: &[RowDeletion],
    ) -> Result<Vec<Result<(), StoreError>>, StoreError> {
        self.spy.call()?;
        Ok(self.per_item(deletions, |d| self.inner.delete(d)))
    }

    fn close(&mut self) -> Result<(), StoreError> {
        self.spy.table_closes.fetch_add(1, Ordering::SeqCst);
        self.inner.close()
    }
}

struct SpyScanner<'a> {
    inner: Box<dyn RowScanner + 'a>,
    spy: &'a Spy,
}

impl Iterator for SpyScanner<'_> {
    type Item = Result<Row, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

impl RowScanner for SpyScanner<'_> {
    fn close(&mut self) -> Result<(), StoreError> {
        self.spy.scanner_closes.fetch_add(1, Ordering::SeqCst);
        self.inner.close()
    }
}

// ── Harness ─────────────────────────────────────────────────

pub fn write_config(dir: &Path, yaml: &str) {
    std::fs::write(dir.join("widerow.yaml"), yaml).unwrap();
}

pub struct Harness {
    pub dir: TempDir,
    pub store: Arc<MemoryStore>,
    pub spy: Arc<Spy>,
    pub auth: Arc<RecordingAuthenticator>,
    pub sleeps: Arc<Mutex<Vec<Duration>>>,
    pub registry: Arc<SchemaRegistry>,
    pub session: Arc<SessionManager>,
}

/// A session over a memory store with a `message` table. `config` is written
/// to the resource file unless `None`.
pub fn harness(config: Option<&str>) -> Harness {
    harness_with(config, |settings| settings)
}

pub fn harness_with(
    config: Option<&str>,
    tune: impl FnOnce(SessionSettings) -> SessionSettings,
) -> Harness {
    let dir = TempDir::new().unwrap();
    if let Some(yaml) = config {
        write_config(dir.path(), yaml);
    }

    let store = Arc::new(MemoryStore::new());
    store.create_table("message");
    let spy = Arc::new(Spy::default());
    let connector = SpyConnector {
        inner: MemoryConnector::new(Arc::clone(&store)),
        spy: Arc::clone(&spy),
    };
    let auth = Arc::new(RecordingAuthenticator::default());
    let sleeps = Arc::new(Mutex::new(Vec::new()));

    let mut settings = SessionSettings::new(ConfigResource::in_dir(dir.path()));
    settings.refresh_interval = Duration::from_secs(3600);
    let settings = tune(settings);

    let recorded = Arc::clone(&sleeps);
    let session = SessionManager::new(settings, Arc::new(connector), auth.clone())
        .with_sleeper(move |d| recorded.lock().push(d));

    Harness {
        dir,
        store,
        spy,
        auth,
        sleeps,
        registry: Arc::new(SchemaRegistry::new()),
        session: Arc::new(session),
    }
}

impl Harness {
    pub fn dao(&self) -> CrudDao<Message> {
        CrudDao::new(Arc::clone(&self.session), Arc::clone(&self.registry)).unwrap()
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().clone()
    }
}
