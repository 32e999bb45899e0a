//! In-memory remote store shared by the integration tests.

#![allow(dead_code)]

use mirror_engine::{DataSourceConfig, FieldMap, RemoteOp, Request, Transport, TransportError};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Mutex;

/// A fake remote store that records every request it receives.
///
/// Reads return the whole table regardless of paging hints. Creates assign
/// sequential ids, updates and destroys match on `Id`.
#[derive(Debug, Default)]
pub struct FakeRemote {
    records: Mutex<Vec<FieldMap>>,
    next_id: Mutex<u64>,
    calls: Mutex<Vec<Request>>,
    failing: Mutex<HashSet<RemoteOp>>,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeded with the two people used throughout the tests.
    pub fn people() -> Self {
        Self::with_records(vec![
            json!({"Id": 0, "FirstName": "Antonio", "LastName": "Moreno", "City": "Varna"}),
            json!({"Id": 1, "FirstName": "Mihaela", "LastName": "Petrova", "City": "Ruse"}),
        ])
    }

    pub fn with_records(records: Vec<Value>) -> Self {
        let records: Vec<FieldMap> = records
            .into_iter()
            .map(|r| r.as_object().cloned().unwrap())
            .collect();
        let next_id = records.len() as u64;
        Self {
            records: Mutex::new(records),
            next_id: Mutex::new(next_id),
            ..Self::default()
        }
    }

    /// Numbered records `{"Id": i, "Name": "item i"}`.
    pub fn numbered(count: usize) -> Self {
        Self::with_records(
            (0..count)
                .map(|i| json!({"Id": i, "Name": format!("item {}", i)}))
                .collect(),
        )
    }

    /// Make every request for `operation` fail.
    pub fn fail(&self, operation: RemoteOp) {
        self.failing.lock().unwrap().insert(operation);
    }

    pub fn recover(&self, operation: RemoteOp) {
        self.failing.lock().unwrap().remove(&operation);
    }

    pub fn calls(&self) -> Vec<Request> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, operation: RemoteOp) -> Vec<Request> {
        self.calls()
            .into_iter()
            .filter(|r| r.operation == operation)
            .collect()
    }

    /// Number of non-read calls.
    pub fn write_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|r| r.operation != RemoteOp::Read)
            .count()
    }

    pub fn reset_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn records(&self) -> Vec<FieldMap> {
        self.records.lock().unwrap().clone()
    }

    fn handle(&self, request: &Request) -> Result<Value, TransportError> {
        if self.failing.lock().unwrap().contains(&request.operation) {
            return Err(TransportError::new(format!("{} unavailable", request.operation)));
        }

        let mut records = self.records.lock().unwrap();
        match request.operation {
            RemoteOp::Read => Ok(Value::Array(
                records.iter().cloned().map(Value::Object).collect(),
            )),
            RemoteOp::Create => {
                let mut record = as_record(&request.payload)?;
                let mut next_id = self.next_id.lock().unwrap();
                record.insert("Id".into(), json!(*next_id));
                *next_id += 1;
                records.push(record.clone());
                Ok(Value::Object(record))
            }
            RemoteOp::Update => {
                let record = as_record(&request.payload)?;
                let id = record.get("Id").cloned().unwrap_or(Value::Null);
                let stored = records
                    .iter_mut()
                    .find(|r| r.get("Id") == Some(&id))
                    .ok_or_else(|| TransportError::new(format!("no record {}", id)))?;
                *stored = record.clone();
                Ok(Value::Object(record))
            }
            RemoteOp::Destroy => {
                let id = match &request.payload {
                    Value::Object(fields) => fields.get("Id").cloned().unwrap_or(Value::Null),
                    other => other.clone(),
                };
                let before = records.len();
                records.retain(|r| r.get("Id") != Some(&id));
                if records.len() == before {
                    return Err(TransportError::new(format!("no record {}", id)));
                }
                Ok(Value::Null)
            }
        }
    }
}

impl Transport for FakeRemote {
    fn execute(&self, request: Request) -> impl Future<Output = Result<Value, TransportError>> {
        let result = self.handle(&request);
        self.calls.lock().unwrap().push(request);
        async move { result }
    }
}

fn as_record(payload: &Value) -> Result<FieldMap, TransportError> {
    payload
        .as_object()
        .cloned()
        .ok_or_else(|| TransportError::new("payload is not an object"))
}

/// Configuration with every endpoint set.
pub fn config() -> DataSourceConfig {
    DataSourceConfig::new()
        .with_read("people/read")
        .with_create("people/create")
        .with_update("people/update")
        .with_destroy("people/destroy")
}

pub fn fields(value: Value) -> FieldMap {
    value.as_object().cloned().unwrap()
}
