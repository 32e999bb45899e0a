//! Remote operations and the requests that carry them.
//!
//! The data source never performs IO itself. Each remote call is described as
//! a [`Request`] naming one of the four CRUD operations, the endpoint it was
//! configured with, and a JSON payload. A [`Transport`](crate::Transport)
//! executes it.

use crate::{config::Endpoint, query::SortKey};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the four operations of the remote protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteOp {
    /// Retrieve records (`read`, `fetch`, `query`)
    Read,
    /// Persist a locally added record
    Create,
    /// Persist field changes of an existing record
    Update,
    /// Delete an existing record
    Destroy,
}

impl RemoteOp {
    /// The operation name as used in configuration and logs.
    pub fn name(&self) -> &'static str {
        match self {
            RemoteOp::Read => "read",
            RemoteOp::Create => "create",
            RemoteOp::Update => "update",
            RemoteOp::Destroy => "destroy",
        }
    }
}

impl fmt::Display for RemoteOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single remote call handed to the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    /// Which operation this is
    pub operation: RemoteOp,
    /// Endpoint URL or operation name the transport resolves
    pub url: String,
    /// Method hint for HTTP transports
    pub method: String,
    /// JSON payload
    pub payload: serde_json::Value,
}

impl Request {
    /// Build a request against a configured endpoint.
    pub fn new(operation: RemoteOp, endpoint: &Endpoint, payload: serde_json::Value) -> Self {
        Self {
            operation,
            url: endpoint.url.clone(),
            method: endpoint.method().to_string(),
            payload,
        }
    }
}

/// Payload of a read request.
///
/// `args` are the caller's positional arguments, forwarded verbatim. Paging
/// and sort fields are hints: the data source windows the result locally, so
/// a remote store is free to ignore them and return the full matching set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadParams {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sort: Vec<SortKey>,
}

impl ReadParams {
    /// Parameters carrying only positional arguments.
    pub fn with_args(args: Vec<serde_json::Value>) -> Self {
        Self {
            args,
            ..Self::default()
        }
    }

    /// Serialize into a request payload.
    pub fn to_payload(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
