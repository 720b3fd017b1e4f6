mod catalog;
mod codec;
mod encoding;
mod error;
mod model;
mod schema;

pub use bigdecimal::BigDecimal;
pub use catalog::{Catalog, SchemaRegistry};
pub use codec::{Decoded, ModelCodec};
pub use encoding::{MAP_SEPARATOR, NumericDecoding};
pub use error::{ModelError, SchemaError};
pub use model::{Model, digest};
pub use schema::{FieldType, Lens, SchemaBuilder, Slot};
