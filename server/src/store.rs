//! In-memory record table backing the CRUD endpoints.
//!
//! Records are keyed by a sequential numeric identity starting at 0, stored
//! in the record itself under the configured identity field.

use dashmap::DashMap;
use mirror_engine::{window::compare_values, Direction, FieldMap, ReadParams};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};

/// Errors returned by record store operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(u64),

    #[error("record has no {0} field")]
    MissingIdentity(String),

    #[error("invalid identity: {0}")]
    InvalidIdentity(String),

    #[error("expected a JSON object")]
    NotAnObject,
}

/// Thread-safe in-memory record table.
#[derive(Debug)]
pub struct RecordStore {
    id_attribute: String,
    records: DashMap<u64, FieldMap>,
    next_id: AtomicU64,
}

impl RecordStore {
    /// Create an empty store.
    pub fn new(id_attribute: impl Into<String>) -> Self {
        Self {
            id_attribute: id_attribute.into(),
            records: DashMap::new(),
            next_id: AtomicU64::new(0),
        }
    }

    pub fn id_attribute(&self) -> &str {
        &self.id_attribute
    }

    /// Load initial records.
    ///
    /// Records carrying a numeric identity keep it; the rest are numbered
    /// after the highest one seen. Returns the number of stored records.
    pub fn seed(&self, records: Vec<FieldMap>) -> Result<usize, StoreError> {
        let mut pending = Vec::new();
        for record in records {
            match record.get(&self.id_attribute) {
                Some(Value::Null) | None => pending.push(record),
                Some(value) => {
                    let id = parse_identity(value)?;
                    let next = id
                        .checked_add(1)
                        .ok_or_else(|| StoreError::InvalidIdentity(value.to_string()))?;
                    self.next_id.fetch_max(next, Ordering::SeqCst);
                    self.records.insert(id, record);
                }
            }
        }

        for record in pending {
            self.create(record);
        }
        Ok(self.len())
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: u64) -> Option<FieldMap> {
        self.records.get(&id).map(|r| r.value().clone())
    }

    /// All records matching the read parameters.
    ///
    /// An object in the first positional argument filters by field equality.
    /// Sort hints are honoured; paging hints are ignored, since the client
    /// windows the full result itself.
    pub fn read(&self, params: &ReadParams) -> Vec<FieldMap> {
        let mut records: Vec<(u64, FieldMap)> = self
            .records
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();
        records.sort_by_key(|(id, _)| *id);

        if let Some(Value::Object(criteria)) = params.args.first() {
            records.retain(|(_, record)| {
                criteria
                    .iter()
                    .all(|(field, expected)| record.get(field) == Some(expected))
            });
        }

        if !params.sort.is_empty() {
            records.sort_by(|(_, a), (_, b)| {
                for key in &params.sort {
                    let ordering = compare_values(
                        a.get(&key.field).unwrap_or(&Value::Null),
                        b.get(&key.field).unwrap_or(&Value::Null),
                    );
                    let ordering = match key.direction {
                        Direction::Ascending => ordering,
                        Direction::Descending => ordering.reverse(),
                    };
                    if ordering.is_ne() {
                        return ordering;
                    }
                }
                std::cmp::Ordering::Equal
            });
        }

        records.into_iter().map(|(_, record)| record).collect()
    }

    /// Insert a new record under a fresh identity, ignoring any identity the
    /// client sent. Returns the stored record.
    pub fn create(&self, mut record: FieldMap) -> FieldMap {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        record.insert(self.id_attribute.clone(), Value::from(id));
        self.records.insert(id, record.clone());
        record
    }

    /// Replace an existing record. Returns the stored record.
    pub fn update(&self, record: FieldMap) -> Result<FieldMap, StoreError> {
        let id = match record.get(&self.id_attribute) {
            Some(value) => parse_identity(value)?,
            None => return Err(StoreError::MissingIdentity(self.id_attribute.clone())),
        };

        let mut stored = self.records.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        *stored = record.clone();
        Ok(record)
    }

    /// Delete a record given either its bare identity or the full record.
    pub fn destroy(&self, payload: &Value) -> Result<FieldMap, StoreError> {
        let id = match payload {
            Value::Object(record) => match record.get(&self.id_attribute) {
                Some(value) => parse_identity(value)?,
                None => return Err(StoreError::MissingIdentity(self.id_attribute.clone())),
            },
            value => parse_identity(value)?,
        };

        self.records
            .remove(&id)
            .map(|(_, record)| record)
            .ok_or(StoreError::NotFound(id))
    }
}

/// Accept numeric identities and their string forms.
fn parse_identity(value: &Value) -> Result<u64, StoreError> {
    let id = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    };
    id.ok_or_else(|| StoreError::InvalidIdentity(value.to_string()))
}
