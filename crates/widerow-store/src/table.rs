use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::StoreError;
use crate::row::{Row, RowDeletion, RowMutation, RowQuery, Scan};

/// Cluster parameters handed to a [`Connector`], as read from configuration.
pub type ClusterProperties = BTreeMap<String, String>;

/// Handle to one table of the store.
///
/// Each call's outer `Err` means the whole call failed. Batch writes report
/// per-item outcomes in the returned vector, one slot per input in input
/// order; a slot is `Ok` when the store acknowledged that item.
pub trait Table: Send {
    fn name(&self) -> &str;

    // Reads
    fn get(&self, query: &RowQuery) -> Result<Row, StoreError>;
    fn get_many(&self, queries: &[RowQuery]) -> Result<Vec<Row>, StoreError>;
    fn scan<'a>(&'a self, scan: &Scan) -> Result<Box<dyn RowScanner + 'a>, StoreError>;

    // Writes
    fn put(&self, mutation: &RowMutation) -> Result<(), StoreError>;
    fn put_many(
        &self,
        mutations: &[RowMutation],
    ) -> Result<Vec<Result<(), StoreError>>, StoreError>;
    fn delete(&self, deletion: &RowDeletion) -> Result<(), StoreError>;
    fn delete_many(
        &self,
        deletions: &[RowDeletion],
    ) -> Result<Vec<Result<(), StoreError>>, StoreError>;

    // Lifecycle
    fn close(&mut self) -> Result<(), StoreError>;
}

/// Cursor over the rows of a [`Scan`].
pub trait RowScanner: Iterator<Item = Result<Row, StoreError>> {
    fn close(&mut self) -> Result<(), StoreError>;
}

/// A live connection to the store cluster. Shared across threads.
pub trait Connection: Send + Sync {
    fn table(&self, name: &str) -> Result<Box<dyn Table>, StoreError>;
    fn is_closed(&self) -> bool;
    fn close(&self) -> Result<(), StoreError>;
}

/// Opens connections from cluster parameters.
pub trait Connector: Send + Sync {
    fn connect(&self, properties: &ClusterProperties) -> Result<Arc<dyn Connection>, StoreError>;
}
