use thiserror::Error;

/// A model's schema declaration is unusable. Always a configuration mistake,
/// never a data problem, so callers should not retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("{model}: table name missing")]
    MissingTableName { model: &'static str },

    #[error("{model}: column family missing")]
    MissingFamily { model: &'static str },

    #[error("{model}: field id must be positive")]
    InvalidFieldId { model: &'static str },

    #[error("{model}: duplicate field id {id}")]
    DuplicateFieldId { model: &'static str, id: u32 },

    #[error("{model}: duplicate column id {id}")]
    DuplicateColumnId { model: &'static str, id: u32 },

    #[error("{model}: more than one map field")]
    MultipleMapFields { model: &'static str },

    #[error("{model}: field {id} must be declared with map_field and hold a string map")]
    MapFieldType { model: &'static str, id: u32 },

    #[error("{model}: map field {id} has no map column")]
    MissingMapColumn { model: &'static str, id: u32 },

    #[error("{model}: map column {id} is not bound to the map field")]
    MapColumnMismatch { model: &'static str, id: u32 },

    #[error("{model}: cached catalog has a different type")]
    CatalogType { model: &'static str },
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("row key must not be null")]
    MissingRowKey,

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("cannot decode field {field}: {reason}")]
    Decode { field: u32, reason: String },
}
