use std::collections::HashMap;
use std::sync::Arc;

use widerow_store::{Row, RowDeletion, RowMutation, RowQuery};

use crate::catalog::{Catalog, SchemaRegistry};
use crate::encoding::{self, NumericDecoding};
use crate::error::ModelError;
use crate::model::Model;
use crate::schema::Slot;

/// Outcome of decoding a row into a model instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoded {
    /// The store had no cells for the row.
    Absent,
    /// The row exists but every matching field was already set on the instance.
    Unchanged,
    /// This many fields and map entries were assigned.
    Populated(usize),
}

impl Decoded {
    pub fn is_populated(&self) -> bool {
        matches!(self, Decoded::Populated(_))
    }
}

/// Translates model instances to row operations and rows back to instances.
#[derive(Clone)]
pub struct ModelCodec {
    registry: Arc<SchemaRegistry>,
    numeric: NumericDecoding,
}

impl ModelCodec {
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self {
            registry,
            numeric: NumericDecoding::default(),
        }
    }

    pub fn with_numeric_decoding(mut self, numeric: NumericDecoding) -> Self {
        self.numeric = numeric;
        self
    }

    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    pub fn numeric_decoding(&self) -> NumericDecoding {
        self.numeric
    }

    fn checked_row_key<M: Model>(model: &M) -> Result<Vec<u8>, ModelError> {
        model.validate()?;
        model.row_key().ok_or(ModelError::MissingRowKey)
    }

    /// Build the insert for every set field. Map entries become one cell each
    /// under `map column | entry key`.
    pub fn to_insert<M: Model>(&self, model: &M) -> Result<RowMutation, ModelError> {
        let row_key = Self::checked_row_key(model)?;
        let catalog = self.registry.resolve::<M>()?;
        let family = catalog.family();

        let mut mutation = RowMutation::new(row_key);
        for (id, slot) in catalog.fields() {
            let Some(qualifier) = catalog.column(id) else {
                continue;
            };
            match slot {
                Slot::Map(lens) => {
                    let (Some(map), Some(prefix)) = (lens.get(model), catalog.map_prefix()) else {
                        continue;
                    };
                    let mut entries: Vec<(&String, &String)> = map.iter().collect();
                    entries.sort();
                    for (key, value) in entries {
                        let mut entry_qualifier = prefix.to_vec();
                        entry_qualifier.extend_from_slice(key.as_bytes());
                        mutation.add(family, &entry_qualifier, value.as_bytes());
                    }
                }
                scalar => {
                    if let Some(bytes) = encode_scalar(scalar, model) {
                        mutation.add(family, qualifier, &bytes);
                    }
                }
            }
        }
        Ok(mutation)
    }

    pub fn to_delete<M: Model>(&self, model: &M) -> Result<RowDeletion, ModelError> {
        Ok(RowDeletion::new(Self::checked_row_key(model)?))
    }

    /// Build the point read, narrowed by the model's default filter.
    pub fn to_query<M: Model>(&self, model: &M) -> Result<RowQuery, ModelError> {
        let mut query = RowQuery::new(Self::checked_row_key(model)?);
        if let Some(default) = model.default_filter() {
            query.set_filter(default);
        }
        Ok(query)
    }

    /// Assign cells of `row` to fields of `model` that are still unset. Map
    /// entries are merged into the map field, creating it on first match.
    pub fn from_row<M: Model>(&self, model: &mut M, row: &Row) -> Result<Decoded, ModelError> {
        if row.is_empty() {
            return Ok(Decoded::Absent);
        }
        let catalog = self.registry.resolve::<M>()?;
        let family = catalog.family();

        let mut populated = 0;
        for (id, slot) in catalog.fields() {
            if matches!(slot, Slot::Map(_)) || slot.is_set(model) {
                continue;
            }
            let Some(qualifier) = catalog.column(id) else {
                continue;
            };
            let Some(raw) = row.value(family, qualifier) else {
                continue;
            };
            decode_scalar(slot, model, raw, self.numeric)
                .map_err(|reason| ModelError::Decode { field: id, reason })?;
            populated += 1;
        }

        populated += decode_map(&catalog, model, row)?;

        Ok(match populated {
            0 => Decoded::Unchanged,
            n => Decoded::Populated(n),
        })
    }
}

fn encode_scalar<M>(slot: &Slot<M>, model: &M) -> Option<Vec<u8>> {
    match slot {
        Slot::Long(l) => l.get(model).map(|v| encoding::encode_i64(*v)),
        Slot::Int(l) => l.get(model).map(|v| encoding::encode_i32(*v)),
        Slot::Short(l) => l.get(model).map(|v| encoding::encode_i16(*v)),
        Slot::Str(l) => l.get(model).map(|v| v.as_bytes().to_vec()),
        Slot::Float(l) => l.get(model).map(|v| encoding::encode_f32(*v)),
        Slot::Double(l) => l.get(model).map(|v| encoding::encode_f64(*v)),
        Slot::Decimal(l) => l.get(model).map(encoding::encode_decimal),
        Slot::Map(_) => None,
    }
}

fn decode_scalar<M>(
    slot: &Slot<M>,
    model: &mut M,
    raw: &[u8],
    numeric: NumericDecoding,
) -> Result<(), String> {
    match slot {
        Slot::Long(l) => *l.get_mut(model) = Some(encoding::decode_i64(raw)?),
        Slot::Int(l) => *l.get_mut(model) = Some(encoding::decode_i32(raw)?),
        Slot::Short(l) => *l.get_mut(model) = Some(encoding::decode_i16(raw)?),
        Slot::Str(l) => *l.get_mut(model) = Some(encoding::decode_string(raw)?),
        Slot::Float(l) => *l.get_mut(model) = Some(encoding::decode_f32(raw, numeric)?),
        Slot::Double(l) => *l.get_mut(model) = Some(encoding::decode_f64(raw, numeric)?),
        Slot::Decimal(l) => *l.get_mut(model) = Some(encoding::decode_decimal(raw)?),
        Slot::Map(_) => {}
    }
    Ok(())
}

fn decode_map<M: Model>(catalog: &Catalog<M>, model: &mut M, row: &Row) -> Result<usize, ModelError> {
    let (Some(id), Some(prefix)) = (catalog.map_field(), catalog.map_prefix()) else {
        return Ok(0);
    };
    let Some(Slot::Map(lens)) = catalog.field(id) else {
        return Ok(0);
    };

    let mut assigned = 0;
    for cell in row.family_cells(catalog.family()) {
        let Some(suffix) = cell.qualifier.strip_prefix(prefix) else {
            continue;
        };
        let key = encoding::decode_string(suffix)
            .map_err(|reason| ModelError::Decode { field: id, reason })?;
        let value = encoding::decode_string(&cell.value)
            .map_err(|reason| ModelError::Decode { field: id, reason })?;
        lens.get_mut(model)
            .get_or_insert_with(HashMap::new)
            .insert(key, value);
        assigned += 1;
    }
    Ok(assigned)
}
