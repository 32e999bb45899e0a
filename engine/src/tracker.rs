//! Change tracking against the last synchronized baseline.
//!
//! The tracker classifies local mutations into three disjoint collections:
//!
//! - **Added**: items created locally and never persisted
//! - **Updated**: persisted items whose fields differ from the baseline
//! - **Removed**: persisted items deleted locally
//!
//! Contradictory mutations cancel out. An added item that is removed again
//! leaves no trace, and a removed item drops any pending update.

use crate::{DataItem, FieldMap, ItemKey};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Keys of the pending entries, for inspection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeSummary {
    pub added: Vec<ItemKey>,
    pub updated: Vec<ItemKey>,
    pub removed: Vec<ItemKey>,
}

impl ChangeSummary {
    /// Total number of pending entries.
    pub fn len(&self) -> usize {
        self.added.len() + self.updated.len() + self.removed.len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Tracks added, updated and removed items.
///
/// The baseline holds the remote-visible fields of every item as of the last
/// successful read, fetch or sync.
#[derive(Debug, Clone, Default)]
pub struct ChangeTracker {
    added: Vec<ItemKey>,
    updated: Vec<ItemKey>,
    removed: Vec<DataItem>,
    baseline: HashMap<ItemKey, FieldMap>,
}

impl ChangeTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the key appears in any collection.
    pub fn is_tracked(&self, key: ItemKey) -> bool {
        self.is_added(key) || self.is_updated(key) || self.is_removed(key)
    }

    pub fn is_added(&self, key: ItemKey) -> bool {
        self.added.contains(&key)
    }

    pub fn is_updated(&self, key: ItemKey) -> bool {
        self.updated.contains(&key)
    }

    pub fn is_removed(&self, key: ItemKey) -> bool {
        self.removed.iter().any(|item| item.key() == key)
    }

    /// Record a locally added item.
    ///
    /// Returns `false` without changing anything if the key is already
    /// tracked.
    pub fn record_add(&mut self, key: ItemKey) -> bool {
        if self.is_tracked(key) {
            return false;
        }
        self.added.push(key);
        true
    }

    /// Record that an item's fields may have changed.
    ///
    /// `current` holds the item's remote-visible fields. Added items stay in
    /// Added; they are always sent in full on create. Otherwise the item is in
    /// Updated exactly when `current` differs from its baseline, so an edit
    /// that restores the baseline withdraws the pending update.
    ///
    /// Returns whether the item is pending in Updated afterwards.
    pub fn record_update(&mut self, key: ItemKey, current: &FieldMap) -> bool {
        if self.is_added(key) || self.is_removed(key) {
            return false;
        }

        let changed = self
            .baseline
            .get(&key)
            .map_or(true, |baseline| baseline != current);

        if changed {
            if !self.is_updated(key) {
                self.updated.push(key);
            }
        } else {
            self.updated.retain(|k| *k != key);
        }
        changed
    }

    /// Record a locally removed item.
    ///
    /// Returns `true` if a Removed entry now exists for it, `false` if the
    /// removal cancelled a pending add.
    pub fn record_remove(&mut self, item: DataItem) -> bool {
        let key = item.key();

        if let Some(pos) = self.added.iter().position(|k| *k == key) {
            self.added.remove(pos);
            self.baseline.remove(&key);
            return false;
        }

        self.updated.retain(|k| *k != key);
        if !self.is_removed(key) {
            self.removed.push(item);
        }
        true
    }

    /// Withdraw the first Removed entry matching `predicate` and return it.
    pub fn restore_removed<F>(&mut self, predicate: F) -> Option<DataItem>
    where
        F: Fn(&DataItem) -> bool,
    {
        let pos = self.removed.iter().position(predicate)?;
        Some(self.removed.remove(pos))
    }

    /// True iff Added, Updated or Removed is non-empty.
    pub fn has_changes(&self) -> bool {
        !self.added.is_empty() || !self.updated.is_empty() || !self.removed.is_empty()
    }

    pub fn added(&self) -> &[ItemKey] {
        &self.added
    }

    pub fn updated(&self) -> &[ItemKey] {
        &self.updated
    }

    pub fn removed(&self) -> &[DataItem] {
        &self.removed
    }

    /// Keys of all pending entries.
    pub fn summary(&self) -> ChangeSummary {
        ChangeSummary {
            added: self.added.clone(),
            updated: self.updated.clone(),
            removed: self.removed.iter().map(DataItem::key).collect(),
        }
    }

    /// Baseline fields of an item.
    pub fn baseline(&self, key: ItemKey) -> Option<&FieldMap> {
        self.baseline.get(&key)
    }

    /// Set the baseline of one item.
    pub fn set_baseline(&mut self, key: ItemKey, fields: FieldMap) {
        self.baseline.insert(key, fields);
    }

    /// Replace the whole baseline, leaving pending entries untouched.
    pub fn rebaseline<I>(&mut self, items: I)
    where
        I: IntoIterator<Item = (ItemKey, FieldMap)>,
    {
        self.baseline = items.into_iter().collect();
    }

    /// Drop an Added entry after its create succeeded.
    pub fn acknowledge_added(&mut self, key: ItemKey) {
        self.added.retain(|k| *k != key);
    }

    /// Drop an Updated entry after its update succeeded.
    pub fn acknowledge_updated(&mut self, key: ItemKey) {
        self.updated.retain(|k| *k != key);
    }

    /// Drop a Removed entry and its baseline after its destroy succeeded.
    pub fn acknowledge_removed(&mut self, key: ItemKey) {
        self.removed.retain(|item| item.key() != key);
        self.baseline.remove(&key);
    }

    /// Empty all collections and take a fresh baseline. Idempotent.
    pub fn clear<I>(&mut self, items: I)
    where
        I: IntoIterator<Item = (ItemKey, FieldMap)>,
    {
        self.added.clear();
        self.updated.clear();
        self.removed.clear();
        self.rebaseline(items);
    }
}
