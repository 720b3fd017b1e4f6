use std::any::{Any, TypeId, type_name};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::encoding::MAP_SEPARATOR;
use crate::error::SchemaError;
use crate::model::Model;
use crate::schema::{FieldType, SchemaBuilder, Slot};

/// Resolved schema of one model type.
///
/// Built once from [`Model::describe`] and immutable afterwards.
pub struct Catalog<M> {
    table_name: String,
    family: Vec<u8>,
    fields: BTreeMap<u32, Slot<M>>,
    columns: BTreeMap<u32, Vec<u8>>,
    map_field: Option<u32>,
    map_column: Option<Vec<u8>>,
    map_prefix: Option<Vec<u8>>,
}

impl<M: Model> Catalog<M> {
    pub fn build(schema: SchemaBuilder<M>) -> Result<Self, SchemaError> {
        let model = type_name::<M>();

        let table_name = schema
            .table
            .filter(|t| !t.trim().is_empty())
            .ok_or(SchemaError::MissingTableName { model })?;
        let family = schema
            .family
            .filter(|f| !f.is_empty())
            .ok_or(SchemaError::MissingFamily { model })?;

        let mut fields = BTreeMap::new();
        let mut map_field = None;
        for decl in schema.fields {
            if decl.id == 0 {
                return Err(SchemaError::InvalidFieldId { model });
            }
            let is_map_type = decl.slot.field_type() == FieldType::Map;
            if decl.is_map != is_map_type {
                return Err(SchemaError::MapFieldType { model, id: decl.id });
            }
            if decl.is_map {
                if map_field.is_some() {
                    return Err(SchemaError::MultipleMapFields { model });
                }
                map_field = Some(decl.id);
            }
            if fields.insert(decl.id, decl.slot).is_some() {
                return Err(SchemaError::DuplicateFieldId { model, id: decl.id });
            }
        }

        let mut columns = BTreeMap::new();
        let mut map_column = None;
        for decl in schema.columns {
            if decl.is_map {
                if map_field != Some(decl.id) {
                    return Err(SchemaError::MapColumnMismatch { model, id: decl.id });
                }
                map_column = Some(decl.qualifier.clone());
            } else if map_field == Some(decl.id) {
                return Err(SchemaError::MapColumnMismatch { model, id: decl.id });
            }
            if columns.insert(decl.id, decl.qualifier).is_some() {
                return Err(SchemaError::DuplicateColumnId { model, id: decl.id });
            }
        }

        if let Some(id) = map_field
            && map_column.is_none()
        {
            return Err(SchemaError::MissingMapColumn { model, id });
        }

        let map_prefix = map_column.as_ref().map(|column: &Vec<u8>| {
            let mut prefix = column.clone();
            prefix.extend_from_slice(MAP_SEPARATOR);
            prefix
        });

        Ok(Self {
            table_name,
            family,
            fields,
            columns,
            map_field,
            map_column,
            map_prefix,
        })
    }
}

impl<M> Catalog<M> {
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn family(&self) -> &[u8] {
        &self.family
    }

    /// Declared fields in id order.
    pub fn fields(&self) -> impl Iterator<Item = (u32, &Slot<M>)> {
        self.fields.iter().map(|(id, slot)| (*id, slot))
    }

    pub fn field(&self, id: u32) -> Option<&Slot<M>> {
        self.fields.get(&id)
    }

    pub fn column(&self, id: u32) -> Option<&[u8]> {
        self.columns.get(&id).map(Vec::as_slice)
    }

    pub fn map_field(&self) -> Option<u32> {
        self.map_field
    }

    pub fn map_column(&self) -> Option<&[u8]> {
        self.map_column.as_deref()
    }

    /// Map column followed by the separator; every map entry qualifier starts with it.
    pub fn map_prefix(&self) -> Option<&[u8]> {
        self.map_prefix.as_deref()
    }
}

type CachedCatalog = Arc<dyn Any + Send + Sync>;

/// Per-type cache of resolved catalogs.
///
/// Each model type is resolved the first time it is touched and the result
/// is kept for the registry's lifetime. Resolution runs outside the lock;
/// only publishing is serialized, and a racing resolver adopts whichever
/// catalog was published first. Failed resolutions are not cached.
pub struct SchemaRegistry {
    catalogs: RwLock<HashMap<TypeId, CachedCatalog>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self {
            catalogs: RwLock::new(HashMap::new()),
        }
    }

    pub fn resolve<M: Model>(&self) -> Result<Arc<Catalog<M>>, SchemaError> {
        let key = TypeId::of::<M>();
        if let Some(cached) = self.catalogs.read().get(&key) {
            return downcast::<M>(Arc::clone(cached));
        }

        let catalog: CachedCatalog = Arc::new(Catalog::build(M::describe(SchemaBuilder::new()))?);
        let published = {
            let mut catalogs = self.catalogs.write();
            Arc::clone(catalogs.entry(key).or_insert(catalog))
        };
        debug!(model = type_name::<M>(), "schema catalog resolved");
        downcast::<M>(published)
    }

    pub fn table_name_of<M: Model>(&self) -> Result<String, SchemaError> {
        Ok(self.resolve::<M>()?.table_name().to_string())
    }

    /// Number of model types resolved so far.
    pub fn len(&self) -> usize {
        self.catalogs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn downcast<M: Model>(cached: CachedCatalog) -> Result<Arc<Catalog<M>>, SchemaError> {
    cached.downcast::<Catalog<M>>().map_err(|_| SchemaError::CatalogType {
        model: type_name::<M>(),
    })
}
