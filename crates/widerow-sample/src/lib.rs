//! A conversation message between two users.
//!
//! Rows are keyed by `digest(from) ++ digest(to) ++ timestamp`, so all
//! messages of one conversation are adjacent and ordered by time.

use std::collections::HashMap;

use widerow_model::{Model, ModelError, SchemaBuilder, Slot, digest};
use widerow_store::{Filter, Scan};

pub const TABLE: &str = "message";
pub const FAMILY: &[u8] = b"d";

/// Rows fetched per round trip when scanning a conversation.
const SCAN_CACHING: u32 = 50;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Message {
    pub from_uid: Option<i64>,
    pub to_uid: Option<i64>,
    pub body: Option<String>,
    pub timestamp: Option<i64>,
    pub extra: Option<HashMap<String, String>>,
}

impl Message {
    /// A message with only its key fields set, ready for `get` or `delete`.
    pub fn key(from_uid: i64, to_uid: i64, timestamp: i64) -> Self {
        Self {
            from_uid: Some(from_uid),
            to_uid: Some(to_uid),
            timestamp: Some(timestamp),
            ..Default::default()
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Key prefix shared by every message from `from_uid` to `to_uid`.
    pub fn conversation(from_uid: i64, to_uid: i64) -> Vec<u8> {
        let mut prefix = Vec::with_capacity(40);
        prefix.extend_from_slice(&digest(from_uid));
        prefix.extend_from_slice(&digest(to_uid));
        prefix
    }

    /// Messages from `from_uid` to `to_uid` with `start <= timestamp < end`.
    pub fn scan(from_uid: i64, to_uid: i64, start: i64, end: i64) -> Scan {
        let mut start_row = Self::conversation(from_uid, to_uid);
        start_row.extend_from_slice(&start.to_be_bytes());
        let mut stop_row = Self::conversation(from_uid, to_uid);
        stop_row.extend_from_slice(&end.to_be_bytes());

        Scan::new(start_row, stop_row)
            .caching(SCAN_CACHING)
            .small(true)
            .add_family(FAMILY)
    }
}

impl Model for Message {
    fn describe(schema: SchemaBuilder<Self>) -> SchemaBuilder<Self> {
        schema
            .table(TABLE)
            .family(FAMILY)
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
        let mut key = Self::conversation(from, to);
        key.extend_from_slice(&ts.to_be_bytes());
        Some(key)
    }

    fn validate(&self) -> Result<(), ModelError> {
        let missing: Vec<&str> = [
            ("from_uid", self.from_uid.is_none()),
            ("to_uid", self.to_uid.is_none()),
            ("timestamp", self.timestamp.is_none()),
        ]
        .into_iter()
        .filter_map(|(name, absent)| absent.then_some(name))
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ModelError::Validation(format!(
                "message is missing {}",
                missing.join(", ")
            )))
        }
    }

    fn default_filter(&self) -> Option<Filter> {
        Some(Filter::Family(FAMILY.to_vec()))
    }
}
