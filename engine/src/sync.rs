//! Sync planning: turning the change set into remote operations.
//!
//! Planning is pure. It reads the tracker and the full set and produces one
//! [`PlannedOp`] per pending entry: a create per Added item, an update per
//! Updated item and a destroy per Removed item. Cancelled mutations never
//! reach the tracker, so nothing redundant is planned.

use crate::{
    ChangeTracker, DataItem, FieldMap, ItemKey, RemoteOp, SyncFailure,
};
use serde::{Deserialize, Serialize};

/// A remote operation planned for one change set entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedOp {
    /// The entry's item
    pub key: ItemKey,
    /// Operation to issue
    pub operation: RemoteOp,
    /// Request payload
    pub payload: serde_json::Value,
}

/// How payloads are shaped.
#[derive(Debug, Clone, Copy)]
pub struct PayloadRules<'a, F> {
    /// Projects an item's fields onto the remote-visible ones
    pub project: F,
    /// When set, destroy payloads carry only this field's value
    pub destroy_by: Option<&'a str>,
}

/// Plan the remote operations for every pending entry.
///
/// Creates come first, then updates, then destroys, each in the order the
/// entries were recorded. Remote calls may still complete in any order.
pub fn plan<F>(
    tracker: &ChangeTracker,
    items: &[DataItem],
    rules: &PayloadRules<'_, F>,
) -> Vec<PlannedOp>
where
    F: Fn(&FieldMap) -> FieldMap,
{
    let find = |key: ItemKey| items.iter().find(|item| item.key() == key);
    let mut ops = Vec::new();

    for key in tracker.added() {
        if let Some(item) = find(*key) {
            ops.push(PlannedOp {
                key: *key,
                operation: RemoteOp::Create,
                payload: (rules.project)(item.fields()).into(),
            });
        }
    }

    for key in tracker.updated() {
        if let Some(item) = find(*key) {
            ops.push(PlannedOp {
                key: *key,
                operation: RemoteOp::Update,
                payload: (rules.project)(item.fields()).into(),
            });
        }
    }

    for item in tracker.removed() {
        let payload = match rules.destroy_by.and_then(|attr| item.identity(attr)) {
            Some(identity) => identity.clone(),
            None => (rules.project)(item.fields()).into(),
        };
        ops.push(PlannedOp {
            key: item.key(),
            operation: RemoteOp::Destroy,
            payload,
        });
    }

    ops
}

/// What a sync accomplished.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    /// Items whose create succeeded
    pub created: Vec<ItemKey>,
    /// Items whose update succeeded
    pub updated: Vec<ItemKey>,
    /// Items whose destroy succeeded
    pub destroyed: Vec<ItemKey>,
    /// Entries that are still pending
    pub failed: Vec<SyncFailure>,
}

impl SyncReport {
    /// Number of remote operations issued.
    pub fn attempted(&self) -> usize {
        self.created.len() + self.updated.len() + self.destroyed.len() + self.failed.len()
    }

    /// Whether every issued operation succeeded.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub(crate) fn record_success(&mut self, key: ItemKey, operation: RemoteOp) {
        match operation {
            RemoteOp::Create => self.created.push(key),
            RemoteOp::Update => self.updated.push(key),
            RemoteOp::Destroy => self.destroyed.push(key),
            RemoteOp::Read => {}
        }
    }
}
