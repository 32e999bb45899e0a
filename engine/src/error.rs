//! Error types for the mirror engine.

use crate::{ItemKey, RemoteOp};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// All possible errors from data source operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Remote errors
    #[error("transport failure during {operation}: {message}")]
    TransportFailure { operation: RemoteOp, message: String },

    #[error("no endpoint configured for {0}")]
    ConfigurationMissing(RemoteOp),

    #[error("invalid {operation} response: {message}")]
    InvalidResponse { operation: RemoteOp, message: String },

    // Invalid operations
    #[error("item not found: {0}")]
    ItemNotFound(ItemKey),

    #[error("index {index} out of range for {len} items")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("an item with identity {0} is already present")]
    DuplicateIdentity(String),

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    // Query state
    #[error("page must be at least 1")]
    InvalidPage,

    #[error("page size must be at least 1")]
    InvalidPageSize,

    // Aggregate sync failure
    #[error("{} of {attempted} sync operations failed", failed.len())]
    SyncIncomplete {
        attempted: usize,
        failed: Vec<SyncFailure>,
    },
}

impl Error {
    /// True for errors caused by an item or index that is not in the full set,
    /// or by a payload that cannot become an item. No state was mutated.
    pub fn is_invalid_operation(&self) -> bool {
        matches!(
            self,
            Error::ItemNotFound(_)
                | Error::IndexOutOfRange { .. }
                | Error::DuplicateIdentity(_)
                | Error::InvalidPayload(_)
        )
    }

    /// True for errors reported by, or on behalf of, the remote side.
    pub fn is_transport_failure(&self) -> bool {
        matches!(
            self,
            Error::TransportFailure { .. }
                | Error::ConfigurationMissing(_)
                | Error::InvalidResponse { .. }
                | Error::SyncIncomplete { .. }
        )
    }
}

/// A change set entry whose remote operation did not succeed.
///
/// The entry is still pending; the next `sync` retries it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncFailure {
    /// The item the entry belongs to
    pub key: ItemKey,
    /// The operation that was attempted
    pub operation: RemoteOp,
    /// Human-readable cause
    pub reason: String,
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = Error::ConfigurationMissing(RemoteOp::Create);
        assert_eq!(err.to_string(), "no endpoint configured for create");

        let err = Error::IndexOutOfRange { index: 4, len: 2 };
        assert_eq!(err.to_string(), "index 4 out of range for 2 items");

        let err = Error::TransportFailure {
            operation: RemoteOp::Update,
            message: "503".into(),
        };
        assert_eq!(err.to_string(), "transport failure during update: 503");
    }

    #[test]
    fn sync_incomplete_display() {
        let err = Error::SyncIncomplete {
            attempted: 3,
            failed: vec![SyncFailure {
                key: ItemKey::new(7),
                operation: RemoteOp::Destroy,
                reason: "timeout".into(),
            }],
        };
        assert_eq!(err.to_string(), "1 of 3 sync operations failed");
    }

    #[test]
    fn classification() {
        assert!(Error::ItemNotFound(ItemKey::new(1)).is_invalid_operation());
        assert!(Error::DuplicateIdentity("3".into()).is_invalid_operation());
        assert!(!Error::InvalidPage.is_invalid_operation());

        assert!(Error::ConfigurationMissing(RemoteOp::Destroy).is_transport_failure());
        assert!(!Error::IndexOutOfRange { index: 0, len: 0 }.is_transport_failure());
    }
}
