use std::fmt::Display;

use widerow_store::Filter;

use crate::error::ModelError;
use crate::schema::SchemaBuilder;

/// A record type stored as one row of a wide-column table.
pub trait Model: Default + 'static {
    /// Declare table, family, fields and columns.
    fn describe(schema: SchemaBuilder<Self>) -> SchemaBuilder<Self>;

    /// Row key for this instance, or `None` while the key-forming fields are unset.
    ///
    /// Must be a pure function of the instance's fields.
    fn row_key(&self) -> Option<Vec<u8>>;

    /// Checked before every mutation or query is built.
    fn validate(&self) -> Result<(), ModelError> {
        Ok(())
    }

    /// Filter attached to point reads of this model.
    fn default_filter(&self) -> Option<Filter> {
        None
    }
}

/// 16-byte digest of a value's text form, for spreading row keys.
///
/// This is xxh3-128, not MD5. Keys built with it do not match rows written
/// by MD5-keyed clients, so tables shared with such clients need a model
/// that derives its own row key.
pub fn digest(value: impl Display) -> [u8; 16] {
    xxhash_rust::xxh3::xxh3_128(value.to_string().as_bytes()).to_be_bytes()
}
