mod error;
mod row;
mod table;

pub use error::StoreError;
pub use row::{Cell, Filter, Row, RowDeletion, RowMutation, RowQuery, Scan};
pub use table::{ClusterProperties, Connection, Connector, RowScanner, Table};

#[cfg(feature = "memory")]
mod memory;

#[cfg(feature = "memory")]
pub use memory::{MemoryConnection, MemoryConnector, MemoryStore};
