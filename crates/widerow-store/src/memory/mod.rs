mod store;
mod table;

pub use store::{MemoryConnection, MemoryConnector, MemoryStore};
