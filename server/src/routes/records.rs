//! CRUD endpoints of the record protocol.
//!
//! Every operation is a `POST` with a JSON body:
//!
//! - `/read` takes read parameters and returns an array of records
//! - `/create` takes a record and returns it with its assigned identity
//! - `/update` takes a full record and returns the stored record
//! - `/destroy` takes a bare identity or a full record and returns `null`

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use mirror_engine::{FieldMap, ReadParams};
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::store::StoreError;
use crate::AppState;

/// Create record routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/read", post(read_handler))
        .route("/create", post(create_handler))
        .route("/update", post(update_handler))
        .route("/destroy", post(destroy_handler))
}

/// POST /read - List records.
async fn read_handler(
    State(state): State<AppState>,
    params: std::result::Result<Json<ReadParams>, JsonRejection>,
) -> Result<Json<Vec<FieldMap>>> {
    let Json(params) = params.map_err(rejected)?;
    let records = state.store.read(&params);
    tracing::debug!(records = records.len(), "read");
    Ok(Json(records))
}

/// POST /create - Insert a record.
async fn create_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Json<FieldMap>> {
    let record = into_record(payload)?;
    let created = state.store.create(record);
    tracing::debug!(id = %created[state.store.id_attribute()], "created");
    Ok(Json(created))
}

/// POST /update - Replace a record.
async fn update_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Json<FieldMap>> {
    let record = into_record(payload)?;
    let updated = state.store.update(record)?;
    tracing::debug!(id = %updated[state.store.id_attribute()], "updated");
    Ok(Json(updated))
}

/// POST /destroy - Delete a record.
async fn destroy_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>> {
    let Json(payload) = payload.map_err(rejected)?;
    let removed = state.store.destroy(&payload)?;
    tracing::debug!(id = %removed[state.store.id_attribute()], "destroyed");
    Ok(Json(Value::Null))
}

fn into_record(payload: std::result::Result<Json<Value>, JsonRejection>) -> Result<FieldMap> {
    match payload.map_err(rejected)? {
        Json(Value::Object(record)) => Ok(record),
        Json(_) => Err(StoreError::NotAnObject.into()),
    }
}

fn rejected(rejection: JsonRejection) -> AppError {
    AppError::BadRequest(rejection.body_text())
}
