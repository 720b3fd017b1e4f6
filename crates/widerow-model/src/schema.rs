use std::collections::HashMap;
use std::fmt;

use bigdecimal::BigDecimal;

/// Accessor pair for one optional field of a model.
pub struct Lens<M, T> {
    pub(crate) get: fn(&M) -> &Option<T>,
    pub(crate) get_mut: fn(&mut M) -> &mut Option<T>,
}

impl<M, T> Lens<M, T> {
    pub fn new(get: fn(&M) -> &Option<T>, get_mut: fn(&mut M) -> &mut Option<T>) -> Self {
        Self { get, get_mut }
    }

    pub fn get<'a>(&self, model: &'a M) -> Option<&'a T> {
        (self.get)(model).as_ref()
    }

    pub fn get_mut<'a>(&self, model: &'a mut M) -> &'a mut Option<T> {
        (self.get_mut)(model)
    }
}

impl<M, T> Clone for Lens<M, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M, T> Copy for Lens<M, T> {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Long,
    Int,
    Short,
    Str,
    Float,
    Double,
    Decimal,
    Map,
}

/// A model field bound to its value type.
pub enum Slot<M> {
    Long(Lens<M, i64>),
    Int(Lens<M, i32>),
    Short(Lens<M, i16>),
    Str(Lens<M, String>),
    Float(Lens<M, f32>),
    Double(Lens<M, f64>),
    Decimal(Lens<M, BigDecimal>),
    Map(Lens<M, HashMap<String, String>>),
}

impl<M> Slot<M> {
    pub fn long(get: fn(&M) -> &Option<i64>, get_mut: fn(&mut M) -> &mut Option<i64>) -> Self {
        Slot::Long(Lens::new(get, get_mut))
    }

    pub fn int(get: fn(&M) -> &Option<i32>, get_mut: fn(&mut M) -> &mut Option<i32>) -> Self {
        Slot::Int(Lens::new(get, get_mut))
    }

    pub fn short(get: fn(&M) -> &Option<i16>, get_mut: fn(&mut M) -> &mut Option<i16>) -> Self {
        Slot::Short(Lens::new(get, get_mut))
    }

    pub fn string(
        get: fn(&M) -> &Option<String>,
        get_mut: fn(&mut M) -> &mut Option<String>,
    ) -> Self {
        Slot::Str(Lens::new(get, get_mut))
    }

    pub fn float(get: fn(&M) -> &Option<f32>, get_mut: fn(&mut M) -> &mut Option<f32>) -> Self {
        Slot::Float(Lens::new(get, get_mut))
    }

    pub fn double(get: fn(&M) -> &Option<f64>, get_mut: fn(&mut M) -> &mut Option<f64>) -> Self {
        Slot::Double(Lens::new(get, get_mut))
    }

    pub fn decimal(
        get: fn(&M) -> &Option<BigDecimal>,
        get_mut: fn(&mut M) -> &mut Option<BigDecimal>,
    ) -> Self {
        Slot::Decimal(Lens::new(get, get_mut))
    }

    pub fn map(
        get: fn(&M) -> &Option<HashMap<String, String>>,
        get_mut: fn(&mut M) -> &mut Option<HashMap<String, String>>,
    ) -> Self {
        Slot::Map(Lens::new(get, get_mut))
    }

    pub fn field_type(&self) -> FieldType {
        match self {
            Slot::Long(_) => FieldType::Long,
            Slot::Int(_) => FieldType::Int,
            Slot::Short(_) => FieldType::Short,
            Slot::Str(_) => FieldType::Str,
            Slot::Float(_) => FieldType::Float,
            Slot::Double(_) => FieldType::Double,
            Slot::Decimal(_) => FieldType::Decimal,
            Slot::Map(_) => FieldType::Map,
        }
    }

    /// Whether the field currently holds a value on `model`.
    pub fn is_set(&self, model: &M) -> bool {
        match self {
            Slot::Long(l) => l.get(model).is_some(),
            Slot::Int(l) => l.get(model).is_some(),
            Slot::Short(l) => l.get(model).is_some(),
            Slot::Str(l) => l.get(model).is_some(),
            Slot::Float(l) => l.get(model).is_some(),
            Slot::Double(l) => l.get(model).is_some(),
            Slot::Decimal(l) => l.get(model).is_some(),
            Slot::Map(l) => l.get(model).is_some(),
        }
    }
}

impl<M> fmt::Debug for Slot<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Slot({:?})", self.field_type())
    }
}

pub(crate) struct FieldDecl<M> {
    pub id: u32,
    pub slot: Slot<M>,
    pub is_map: bool,
}

pub(crate) struct ColumnDecl {
    pub id: u32,
    pub qualifier: Vec<u8>,
    pub is_map: bool,
}

/// Static schema declaration for a model type.
///
/// Fields and columns are paired by id: `field(1, ..)` is stored under the
/// qualifier given by `column(1, ..)`. A field without a column is ignored by
/// the codec. Shared field groups are declared once as a function and merged
/// with [`include`](SchemaBuilder::include).
pub struct SchemaBuilder<M> {
    pub(crate) table: Option<String>,
    pub(crate) family: Option<Vec<u8>>,
    pub(crate) fields: Vec<FieldDecl<M>>,
    pub(crate) columns: Vec<ColumnDecl>,
}

impl<M> SchemaBuilder<M> {
    pub fn new() -> Self {
        Self {
            table: None,
            family: None,
            fields: Vec::new(),
            columns: Vec::new(),
        }
    }

    pub fn table(mut self, name: impl Into<String>) -> Self {
        self.table = Some(name.into());
        self
    }

    pub fn family(mut self, family: &[u8]) -> Self {
        self.family = Some(family.to_vec());
        self
    }

    pub fn field(mut self, id: u32, slot: Slot<M>) -> Self {
        self.fields.push(FieldDecl {
            id,
            slot,
            is_map: false,
        });
        self
    }

    /// Declare the model's map field. Its entries are stored one qualifier each.
    pub fn map_field(mut self, id: u32, slot: Slot<M>) -> Self {
        self.fields.push(FieldDecl {
            id,
            slot,
            is_map: true,
        });
        self
    }

    pub fn column(mut self, id: u32, qualifier: &[u8]) -> Self {
        self.columns.push(ColumnDecl {
            id,
            qualifier: qualifier.to_vec(),
            is_map: false,
        });
        self
    }

    /// Declare the base qualifier for the map field's entries.
    pub fn map_column(mut self, id: u32, qualifier: &[u8]) -> Self {
        self.columns.push(ColumnDecl {
            id,
            qualifier: qualifier.to_vec(),
            is_map: true,
        });
        self
    }

    pub fn include(self, group: fn(SchemaBuilder<M>) -> SchemaBuilder<M>) -> Self {
        group(self)
    }
}

impl<M> Default for SchemaBuilder<M> {
    fn default() -> Self {
        Self::new()
    }
}
