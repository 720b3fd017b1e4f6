#![allow(dead_code)]

use std::collections::HashMap;

use widerow_model::{BigDecimal, Model, ModelError, SchemaBuilder, Slot, digest};
use widerow_store::Filter;

pub const CF: &[u8] = b"d";

/// Every supported field type, keyed by `id`.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Everything {
    pub id: Option<i64>,
    pub count: Option<i32>,
    pub small: Option<i16>,
    pub name: Option<String>,
    pub ratio: Option<f32>,
    pub score: Option<f64>,
    pub amount: Option<BigDecimal>,
    pub tags: Option<HashMap<String, String>>,
    pub created_by: Option<String>,
    pub created_at: Option<i64>,
}

/// Shared audit columns, merged into models with `include`.
pub fn audit_fields(schema: SchemaBuilder<Everything>) -> SchemaBuilder<Everything> {
    schema
        .field(
            20,
            Slot::string(|m: &Everything| &m.created_by, |m: &mut Everything| &mut m.created_by),
        )
        .field(
            21,
            Slot::long(|m: &Everything| &m.created_at, |m: &mut Everything| &mut m.created_at),
        )
        .column(20, b"createdBy")
        .column(21, b"createdAt")
}

impl Model for Everything {
    fn describe(schema: SchemaBuilder<Self>) -> SchemaBuilder<Self> {
        schema
            .table("everything")
            .family(CF)
            .field(1, Slot::long(|m: &Self| &m.id, |m: &mut Self| &mut m.id))
            .field(2, Slot::int(|m: &Self| &m.count, |m: &mut Self| &mut m.count))
            .field(3, Slot::short(|m: &Self| &m.small, |m: &mut Self| &mut m.small))
            .field(4, Slot::string(|m: &Self| &m.name, |m: &mut Self| &mut m.name))
            .field(5, Slot::float(|m: &Self| &m.ratio, |m: &mut Self| &mut m.ratio))
            .field(6, Slot::double(|m: &Self| &m.score, |m: &mut Self| &mut m.score))
            .field(7, Slot::decimal(|m: &Self| &m.amount, |m: &mut Self| &mut m.amount))
            .map_field(8, Slot::map(|m: &Self| &m.tags, |m: &mut Self| &mut m.tags))
            .column(1, b"id")
            .column(2, b"count")
            .column(3, b"small")
            .column(4, b"name")
            .column(5, b"ratio")
            .column(6, b"score")
            .column(7, b"amount")
            .map_column(8, b"tags")
            .include(audit_fields)
    }

    fn row_key(&self) -> Option<Vec<u8>> {
        self.id.map(|id| id.to_be_bytes().to_vec())
    }
}

pub fn everything() -> Everything {
    Everything {
        id: Some(42),
        count: Some(-7),
        small: Some(300),
        name: Some("widget".into()),
        ratio: Some(0.125),
        score: Some(-1234.5678),
        amount: Some("98765.4321".parse().unwrap()),
        tags: Some(HashMap::from([
            ("color".to_string(), "red".to_string()),
            ("size".to_string(), "xl".to_string()),
        ])),
        created_by: Some("ops".into()),
        created_at: Some(1_700_000_000_000),
    }
}

/// The message model: a conversation entry between two users.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Message {
    pub from_uid: Option<i64>,
    pub to_uid: Option<i64>,
    pub body: Option<String>,
    pub timestamp: Option<i64>,
    pub extra: Option<HashMap<String, String>>,
}

impl Model for Message {
    fn describe(schema: SchemaBuilder<Self>) -> SchemaBuilder<Self> {
        schema
            .table("message")
            .family(CF)
            .field(1, Slot::long(|m: &Self| &m.from_uid, |m: &mut Self| &mut m.from_uid))
            .field(2, Slot::long(|m: &Self| &m.to_uid, |m: &mut Self| &mut m.to_uid))
            .field(3, Slot::string(|m: &Self| &m.body, |m: &mut Self| &mut m.body))
            .field(4, Slot::long(|m: &Self| &m.timestamp, |m: &mut Self| &mut m.timestamp))
            .map_field(5, Slot::map(|m: &Self| &m.extra, |m: &mut Self| &mut m.extra))
            .column(1, b"fromUid")
            .column(2, b"toUid")
            .column(3, b"body")
            .column(4, b"timestamp")
            .map_column(5, b"extra")
    }

    fn row_key(&self) -> Option<Vec<u8>> {
        let (from, to, ts) = (self.from_uid?, self.to_uid?, self.timestamp?);
        let mut key = Vec::with_capacity(40);
        key.extend_from_slice(&digest(from));
        key.extend_from_slice(&digest(to));
        key.extend_from_slice(&ts.to_be_bytes());
        Some(key)
    }

    fn validate(&self) -> Result<(), ModelError> {
        if self.from_uid.is_none() || self.to_uid.is_none() || self.timestamp.is_none() {
            return Err(ModelError::Validation(
                "from_uid, to_uid and timestamp must be set".into(),
            ));
        }
        Ok(())
    }

    fn default_filter(&self) -> Option<Filter> {
        Some(Filter::Family(CF.to_vec()))
    }
}

pub fn message(from: i64, to: i64, ts: i64) -> Message {
    Message {
        from_uid: Some(from),
        to_uid: Some(to),
        timestamp: Some(ts),
        body: Some("hello".into()),
        extra: Some(HashMap::from([
            ("key1".to_string(), "value1".to_string()),
            ("key2".to_string(), "value2".to_string()),
        ])),
    }
}

pub fn key_only(from: i64, to: i64, ts: i64) -> Message {
    Message {
        from_uid: Some(from),
        to_uid: Some(to),
        timestamp: Some(ts),
        ..Default::default()
    }
}
