//! Data source configuration.
//!
//! Mirrors the options object a data source is constructed with:
//!
//! ```json
//! {
//!   "read":    { "url": "people/read" },
//!   "create":  { "url": "people/create" },
//!   "update":  { "url": "people/update", "method": "PUT" },
//!   "destroy": { "url": "people/destroy" },
//!   "idAttribute": "Id",
//!   "pageSize": 20
//! }
//! ```

use crate::{RemoteOp, DEFAULT_ID_ATTRIBUTE};
use serde::{Deserialize, Serialize};

/// Method used when an endpoint does not name one.
pub const DEFAULT_METHOD: &str = "POST";

/// Where a remote operation is sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    /// URL or operation name resolved by the transport
    pub url: String,
    /// Optional method hint (defaults to POST)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

impl Endpoint {
    /// Create an endpoint for a URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: None,
        }
    }

    /// Set the method hint.
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    /// The method hint, falling back to [`DEFAULT_METHOD`].
    pub fn method(&self) -> &str {
        self.method.as_deref().unwrap_or(DEFAULT_METHOD)
    }
}

/// Configuration supplied when a data source is constructed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceConfig {
    /// Endpoint for `read`, `fetch` and `query`; the bare operation name
    /// `read` is requested when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read: Option<Endpoint>,
    /// Endpoint for added items during `sync`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create: Option<Endpoint>,
    /// Endpoint for updated items during `sync`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<Endpoint>,
    /// Endpoint for removed items during `sync`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destroy: Option<Endpoint>,
    /// Identity field name; when set, destroy payloads carry only its value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_attribute: Option<String>,
    /// Initial page size
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<usize>,
    /// Initial page (defaults to 1)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<usize>,
}

impl DataSourceConfig {
    /// Create an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON options object.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Set the endpoint of an operation.
    pub fn with_endpoint(mut self, operation: RemoteOp, endpoint: Endpoint) -> Self {
        let slot = match operation {
            RemoteOp::Read => &mut self.read,
            RemoteOp::Create => &mut self.create,
            RemoteOp::Update => &mut self.update,
            RemoteOp::Destroy => &mut self.destroy,
        };
        *slot = Some(endpoint);
        self
    }

    pub fn with_read(self, url: impl Into<String>) -> Self {
        self.with_endpoint(RemoteOp::Read, Endpoint::new(url))
    }

    pub fn with_create(self, url: impl Into<String>) -> Self {
        self.with_endpoint(RemoteOp::Create, Endpoint::new(url))
    }

    pub fn with_update(self, url: impl Into<String>) -> Self {
        self.with_endpoint(RemoteOp::Update, Endpoint::new(url))
    }

    pub fn with_destroy(self, url: impl Into<String>) -> Self {
        self.with_endpoint(RemoteOp::Destroy, Endpoint::new(url))
    }

    pub fn with_id_attribute(mut self, id_attribute: impl Into<String>) -> Self {
        self.id_attribute = Some(id_attribute.into());
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn with_page(mut self, page: usize) -> Self {
        self.page = Some(page);
        self
    }

    /// The endpoint configured for an operation.
    pub fn endpoint(&self, operation: RemoteOp) -> Option<&Endpoint> {
        match operation {
            RemoteOp::Read => self.read.as_ref(),
            RemoteOp::Create => self.create.as_ref(),
            RemoteOp::Update => self.update.as_ref(),
            RemoteOp::Destroy => self.destroy.as_ref(),
        }
    }

    /// Name of the identity field.
    pub fn identity_field(&self) -> &str {
        self.id_attribute.as_deref().unwrap_or(DEFAULT_ID_ATTRIBUTE)
    }

    /// Check the configuration for values that can never work.
    ///
    /// Missing endpoints are allowed here. A missing write endpoint surfaces
    /// as [`Error::ConfigurationMissing`](crate::Error::ConfigurationMissing)
    /// for the sync entries that need it.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for operation in [
            RemoteOp::Read,
            RemoteOp::Create,
            RemoteOp::Update,
            RemoteOp::Destroy,
        ] {
            if let Some(endpoint) = self.endpoint(operation) {
                if endpoint.url.trim().is_empty() {
                    return Err(ConfigError::EmptyUrl(operation));
                }
                if endpoint.method.as_deref().is_some_and(|m| m.trim().is_empty()) {
                    return Err(ConfigError::EmptyMethod(operation));
                }
            }
        }

        if self.id_attribute.as_deref().is_some_and(str::is_empty) {
            return Err(ConfigError::EmptyIdAttribute);
        }
        if self.page_size == Some(0) {
            return Err(ConfigError::InvalidPageSize);
        }
        if self.page == Some(0) {
            return Err(ConfigError::InvalidPage);
        }

        Ok(())
    }
}

/// Configuration errors, reported when a data source is constructed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Parse(String),

    #[error("{0} endpoint has an empty url")]
    EmptyUrl(RemoteOp),

    #[error("{0} endpoint has an empty method")]
    EmptyMethod(RemoteOp),

    #[error("idAttribute must not be empty")]
    EmptyIdAttribute,

    #[error("pageSize must be at least 1")]
    InvalidPageSize,

    #[error("page must be at least 1")]
    InvalidPage,

    #[error("invalid template: {0}")]
    InvalidTemplate(String),
}
