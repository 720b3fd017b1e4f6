use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arc_swap::ArcSwap;
use imbl::OrdMap;
use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::error::StoreError;
use crate::table::{ClusterProperties, Connection, Connector, Table};

use super::table::MemoryTable;

/// Cells of one row keyed by `(family, qualifier)`.
pub(crate) type RowCells = OrdMap<(Vec<u8>, Vec<u8>), Vec<u8>>;
/// Rows of one table in key order.
pub(crate) type TableData = OrdMap<Vec<u8>, RowCells>;

/// In-process wide-column store.
///
/// Each table is a persistent sorted map published through an `ArcSwap`, so
/// readers work on a snapshot without locking. Writers serialize on one mutex
/// and swap in a new version; every row write is atomic.
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Arc<ArcSwap<TableData>>>>,
    write_lock: Mutex<()>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            write_lock: Mutex::new(()),
        }
    }

    /// Create a table. Idempotent.
    pub fn create_table(&self, name: &str) {
        let mut tables = self.tables.write();
        tables.entry(name.to_string()).or_insert_with(|| {
            debug!(table = name, "creating memory table");
            Arc::new(ArcSwap::new(Arc::new(OrdMap::new())))
        });
    }

    pub fn drop_table(&self, name: &str) {
        self.tables.write().remove(name);
    }

    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of rows currently stored in `table`, if it exists.
    pub fn row_count(&self, table: &str) -> Option<usize> {
        self.tables.read().get(table).map(|t| t.load().len())
    }

    pub(crate) fn table_data(&self, name: &str) -> Option<Arc<ArcSwap<TableData>>> {
        self.tables.read().get(name).cloned()
    }

    /// Apply `f` to a private copy of the table and publish the result.
    pub(crate) fn write<R>(
        &self,
        data: &ArcSwap<TableData>,
        f: impl FnOnce(&mut TableData) -> R,
    ) -> R {
        let _guard = self.write_lock.lock();
        let mut next = (**data.load()).clone();
        let out = f(&mut next);
        data.store(Arc::new(next));
        out
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Connection to a [`MemoryStore`].
pub struct MemoryConnection {
    store: Arc<MemoryStore>,
    closed: AtomicBool,
}

impl MemoryConnection {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self {
            store,
            closed: AtomicBool::new(false),
        }
    }
}

impl Connection for MemoryConnection {
    fn table(&self, name: &str) -> Result<Box<dyn Table>, StoreError> {
        if self.is_closed() {
            return Err(StoreError::Closed);
        }
        let data = self
            .store
            .table_data(name)
            .ok_or_else(|| StoreError::DoNotRetry(format!("table not found: {name}")))?;
        Ok(Box::new(MemoryTable::new(
            name.to_string(),
            Arc::clone(&self.store),
            data,
        )))
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn close(&self) -> Result<(), StoreError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

/// Hands out connections to a shared [`MemoryStore`]. Cluster properties are not interpreted.
#[derive(Clone)]
pub struct MemoryConnector {
    store: Arc<MemoryStore>,
}

impl MemoryConnector {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<MemoryStore> {
        &self.store
    }
}

impl Connector for MemoryConnector {
    fn connect(&self, properties: &ClusterProperties) -> Result<Arc<dyn Connection>, StoreError> {
        debug!(properties = properties.len(), "opening memory connection");
        Ok(Arc::new(MemoryConnection::new(Arc::clone(&self.store))))
    }
}
