//! DataSource - the client-held mirror of a remote collection.
//!
//! The data source owns the full set, the derived view, the query state and
//! the change tracker. It is the only thing that mutates them. Remote calls
//! go through the [`Transport`] it was built with, and only from
//! [`read`](DataSource::read), [`fetch`](DataSource::fetch),
//! [`query`](DataSource::query) and [`sync`](DataSource::sync).
//!
//! Operations that touch the remote store and then mutate local state take
//! `&mut self`, so a second `sync` or `fetch` cannot start on the same
//! instance while one is still in flight.

use crate::{
    error::Result,
    sync::{plan, PayloadRules},
    window::compute_view,
    ChangeSummary, ChangeTracker, CompiledTemplate, ConfigError, DataItem, DataSourceConfig,
    Endpoint, Error, FieldMap, Filter, ItemKey, Observable, QueryState, ReadParams, RemoteOp,
    Request, SortKey, SubscriptionId, SyncFailure, SyncReport, Template, Transport,
};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::{debug, info, warn};

/// Logical mode of a data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceState {
    /// Nothing retrieved, nothing pending
    Empty,
    /// Data present, no pending changes
    Loaded,
    /// Pending changes exist
    Dirty,
}

/// Reference to an item of the full set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemRef {
    /// Zero-based position in the full set
    Index(usize),
    /// Client key
    Key(ItemKey),
}

impl From<usize> for ItemRef {
    fn from(index: usize) -> Self {
        ItemRef::Index(index)
    }
}

impl From<ItemKey> for ItemRef {
    fn from(key: ItemKey) -> Self {
        ItemRef::Key(key)
    }
}

impl From<&DataItem> for ItemRef {
    fn from(item: &DataItem) -> Self {
        ItemRef::Key(item.key())
    }
}

/// Client-held mirror of a remote record collection.
pub struct DataSource<T> {
    config: DataSourceConfig,
    template: CompiledTemplate,
    transport: T,
    query: QueryState,
    data: Observable<Vec<DataItem>>,
    view: Observable<Vec<DataItem>>,
    tracker: ChangeTracker,
    next_key: u64,
    loaded: bool,
}

impl<T> fmt::Debug for DataSource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataSource")
            .field("config", &self.config)
            .field("query", &self.query)
            .field("data", &self.data.len())
            .field("view", &self.view.len())
            .field("tracker", &self.tracker.summary())
            .finish_non_exhaustive()
    }
}

impl<T: Transport> DataSource<T> {
    /// Create a data source.
    ///
    /// Fails immediately if the configuration can never work.
    pub fn new(config: DataSourceConfig, transport: T) -> std::result::Result<Self, ConfigError> {
        Self::with_template(config, Template::new(), transport)
    }

    /// Create a data source whose items are built from `template`.
    pub fn with_template(
        config: DataSourceConfig,
        template: Template,
        transport: T,
    ) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        let template = template.compile()?;

        let mut query = QueryState::new();
        if let Some(page) = config.page {
            query.set_page(page).map_err(|_| ConfigError::InvalidPage)?;
        }
        if let Some(page_size) = config.page_size {
            query
                .set_page_size(page_size)
                .map_err(|_| ConfigError::InvalidPageSize)?;
        }

        Ok(Self {
            config,
            template,
            transport,
            query,
            data: Observable::default(),
            view: Observable::default(),
            tracker: ChangeTracker::new(),
            next_key: 0,
            loaded: false,
        })
    }

    pub fn config(&self) -> &DataSourceConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The full set.
    pub fn data(&self) -> &Observable<Vec<DataItem>> {
        &self.data
    }

    /// The current window of the full set.
    pub fn view(&self) -> &Observable<Vec<DataItem>> {
        &self.view
    }

    /// Look up an item of the full set by key.
    pub fn item(&self, key: ItemKey) -> Option<&DataItem> {
        self.data.iter().find(|item| item.key() == key)
    }

    pub fn subscribe_data<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&Vec<DataItem>) + Send + 'static,
    {
        self.data.subscribe(callback)
    }

    pub fn subscribe_view<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&Vec<DataItem>) + Send + 'static,
    {
        self.view.subscribe(callback)
    }

    pub fn unsubscribe_data(&mut self, id: SubscriptionId) -> bool {
        self.data.unsubscribe(id)
    }

    pub fn unsubscribe_view(&mut self, id: SubscriptionId) -> bool {
        self.view.unsubscribe(id)
    }

    pub fn query_state(&self) -> &QueryState {
        &self.query
    }

    pub fn page(&self) -> usize {
        self.query.page()
    }

    pub fn page_size(&self) -> Option<usize> {
        self.query.page_size()
    }

    pub fn sort(&self) -> &[SortKey] {
        self.query.sort()
    }

    pub fn filter(&self) -> Option<&Filter> {
        self.query.filter()
    }

    /// Set the current page. Pages past the end give an empty view.
    pub fn set_page(&mut self, page: usize) -> Result<&mut Self> {
        self.query.set_page(page)?;
        self.refresh_view();
        Ok(self)
    }

    /// Set the page size. Only the view changes; nothing is re-fetched.
    pub fn set_page_size(&mut self, page_size: usize) -> Result<&mut Self> {
        self.query.set_page_size(page_size)?;
        self.refresh_view();
        Ok(self)
    }

    pub fn clear_page_size(&mut self) -> &mut Self {
        self.query.clear_page_size();
        self.refresh_view();
        self
    }

    pub fn set_sort(&mut self, sort: Vec<SortKey>) -> &mut Self {
        self.query.set_sort(sort);
        self.refresh_view();
        self
    }

    pub fn clear_sort(&mut self) -> &mut Self {
        self.query.clear_sort();
        self.refresh_view();
        self
    }

    pub fn set_filter(&mut self, filter: Filter) -> &mut Self {
        self.query.set_filter(filter);
        self.refresh_view();
        self
    }

    pub fn clear_filter(&mut self) -> &mut Self {
        self.query.clear_filter();
        self.refresh_view();
        self
    }

    /// Current logical mode.
    pub fn state(&self) -> SourceState {
        if self.tracker.has_changes() {
            SourceState::Dirty
        } else if self.loaded || !self.data.is_empty() {
            SourceState::Loaded
        } else {
            SourceState::Empty
        }
    }

    /// Request records using the current query state without touching the
    /// full set or the view.
    pub async fn query(&self, args: Vec<serde_json::Value>) -> Result<Vec<FieldMap>> {
        let records = self.request_records(self.query.read_params(args)).await?;
        debug!(records = records.len(), "query complete");
        Ok(records)
    }

    /// Request records honouring the current paging.
    ///
    /// The full set receives the whole result and the view the current page.
    /// Pending changes survive: they are re-applied on top of the result.
    pub async fn fetch(&mut self, args: Vec<serde_json::Value>) -> Result<&mut Self> {
        let records = self.request_records(self.query.read_params(args)).await?;
        debug!(records = records.len(), "fetch complete");

        self.rebase(records);
        self.loaded = true;
        Ok(self)
    }

    /// Request the complete result, replacing the full set and discarding
    /// every pending change.
    pub async fn read(&mut self, args: Vec<serde_json::Value>) -> Result<&mut Self> {
        let records = self.request_records(ReadParams::with_args(args)).await?;
        debug!(records = records.len(), "read complete");

        let mut items = Vec::with_capacity(records.len());
        for fields in records {
            let fields = self.template.instantiate(fields);
            let key = self.allocate_key();
            items.push(DataItem::new(key, fields));
        }

        let baseline = self.snapshot(&items);
        self.tracker.clear(baseline);
        self.data.set(items);
        self.refresh_view();
        self.loaded = true;
        Ok(self)
    }

    /// Append a new item built from `fields` and record it as added.
    ///
    /// If `fields` carries the identity of an item removed since the last
    /// sync, that removal is withdrawn instead: the item comes back with its
    /// original key and counts as updated when its fields changed.
    pub fn add(&mut self, fields: serde_json::Value) -> Result<DataItem> {
        let fields = match fields {
            serde_json::Value::Object(fields) => self.template.instantiate(fields),
            other => {
                warn!("rejected add of non-object fields");
                return Err(Error::InvalidPayload(format!(
                    "expected an object, got {}",
                    other
                )));
            }
        };

        let id_attribute = self.config.identity_field().to_string();
        if let Some(identity) = fields.get(&id_attribute).filter(|v| !v.is_null()) {
            if self
                .data
                .iter()
                .any(|item| item.identity(&id_attribute) == Some(identity))
            {
                let identity = crate::item::describe_identity(identity);
                warn!(%identity, "rejected add of duplicate identity");
                return Err(Error::DuplicateIdentity(identity));
            }

            let restored = self
                .tracker
                .restore_removed(|item| item.identity(&id_attribute) == Some(identity));
            if let Some(mut item) = restored {
                debug!(key = %item.key(), "re-added removed item");
                item.replace_fields(fields);
                let payload = self.template.payload(item.fields());
                self.tracker.record_update(item.key(), &payload);
                self.data.update(|items| items.push(item.clone()));
                self.refresh_view();
                return Ok(item);
            }
        }

        let key = self.allocate_key();
        let item = DataItem::new(key, fields);
        self.tracker.record_add(key);
        self.data.update(|items| items.push(item.clone()));
        self.refresh_view();
        Ok(item)
    }

    /// Delete an item from the full set and record the removal.
    pub fn remove(&mut self, target: impl Into<ItemRef>) -> Result<DataItem> {
        let index = self.position(target.into())?;
        let item = self.data.update(|items| items.remove(index));

        self.tracker.record_remove(item.clone());
        self.refresh_view();
        Ok(item)
    }

    /// Write back a modified copy of an item and record the update.
    ///
    /// Field writes on a copy are invisible until passed here.
    pub fn update(&mut self, item: DataItem) -> Result<()> {
        let index = self.position(ItemRef::Key(item.key()))?;
        let key = item.key();
        let payload = self.template.payload(item.fields());

        self.data.update(|items| items[index] = item);
        self.tracker.record_update(key, &payload);
        self.refresh_view();
        Ok(())
    }

    /// True iff anything is pending sync.
    pub fn has_changes(&self) -> bool {
        self.tracker.has_changes()
    }

    /// Keys of the pending entries.
    pub fn changes(&self) -> ChangeSummary {
        self.tracker.summary()
    }

    /// The change tracker, for inspection.
    pub fn change_tracker(&self) -> &ChangeTracker {
        &self.tracker
    }

    /// Forget every pending change and re-baseline the full set.
    pub fn clear_changes(&mut self) -> &mut Self {
        let baseline = self.snapshot(self.data.get());
        self.tracker.clear(baseline);
        self
    }

    /// Push pending changes to the remote store.
    ///
    /// Issues one create per added item, one update per updated item and one
    /// destroy per removed item, all concurrently, and returns once every call
    /// has completed. Successful entries leave the change set; failed ones
    /// stay for the next sync and are reported through
    /// [`Error::SyncIncomplete`]. With nothing pending, no call is made.
    #[tracing::instrument(skip_all)]
    pub async fn sync(&mut self) -> Result<SyncReport> {
        if !self.tracker.has_changes() {
            debug!("nothing to sync");
            return Ok(SyncReport::default());
        }

        let ops = {
            let template = &self.template;
            let rules = PayloadRules {
                project: |fields: &FieldMap| template.payload(fields),
                destroy_by: self.config.id_attribute.as_deref(),
            };
            plan(&self.tracker, self.data.get(), &rules)
        };
        let attempted = ops.len();
        debug!(operations = attempted, "dispatching sync");

        let transport = &self.transport;
        let config = &self.config;
        let calls = ops.into_iter().map(|op| async move {
            let result = match config.endpoint(op.operation) {
                Some(endpoint) => execute(transport, op.operation, endpoint, op.payload.clone()).await,
                None => Err(Error::ConfigurationMissing(op.operation)),
            };
            (op, result)
        });
        let outcomes = join_all(calls).await;

        let mut report = SyncReport::default();
        let mut merges = Vec::new();
        for (op, result) in outcomes {
            match result {
                Ok(response) => {
                    if let serde_json::Value::Object(fields) = response {
                        if matches!(op.operation, RemoteOp::Create | RemoteOp::Update) {
                            merges.push((op.key, fields));
                        }
                    }
                    match op.operation {
                        RemoteOp::Create => self.tracker.acknowledge_added(op.key),
                        RemoteOp::Update => self.tracker.acknowledge_updated(op.key),
                        RemoteOp::Destroy => self.tracker.acknowledge_removed(op.key),
                        RemoteOp::Read => {}
                    }
                    report.record_success(op.key, op.operation);
                }
                Err(err) => {
                    warn!(key = %op.key, operation = %op.operation, error = %err, "sync entry failed");
                    report.failed.push(SyncFailure {
                        key: op.key,
                        operation: op.operation,
                        reason: err.to_string(),
                    });
                }
            }
        }

        if !merges.is_empty() {
            self.data.update(|items| {
                for (key, fields) in merges {
                    if let Some(item) = items.iter_mut().find(|item| item.key() == key) {
                        item.merge_fields(fields);
                    }
                }
            });
        }

        if report.is_complete() {
            let baseline = self.snapshot(self.data.get());
            self.tracker.clear(baseline);
        } else {
            let synced: Vec<ItemKey> = report
                .created
                .iter()
                .chain(&report.updated)
                .copied()
                .collect();
            for key in synced {
                if let Some(item) = self.item(key) {
                    let payload = self.template.payload(item.fields());
                    self.tracker.set_baseline(key, payload);
                }
            }
        }
        self.refresh_view();

        info!(
            created = report.created.len(),
            updated = report.updated.len(),
            destroyed = report.destroyed.len(),
            failed = report.failed.len(),
            "sync finished"
        );

        if report.is_complete() {
            Ok(report)
        } else {
            Err(Error::SyncIncomplete {
                attempted,
                failed: report.failed,
            })
        }
    }

    async fn request_records(&self, params: ReadParams) -> Result<Vec<FieldMap>> {
        // Without a read url the transport resolves the bare operation name
        let fallback;
        let endpoint = match self.config.endpoint(RemoteOp::Read) {
            Some(endpoint) => endpoint,
            None => {
                fallback = Endpoint::new(RemoteOp::Read.name());
                &fallback
            }
        };
        let response = execute(&self.transport, RemoteOp::Read, endpoint, params.to_payload()).await?;
        parse_records(response)
    }

    /// Replace the full set with fresh records, keeping pending changes.
    fn rebase(&mut self, records: Vec<FieldMap>) {
        let id_attribute = self.config.identity_field().to_string();
        let previous = self.data.get().clone();

        let mut known: HashMap<String, ItemKey> = HashMap::new();
        let mut adopted: HashMap<String, ItemKey> = HashMap::new();
        for item in &previous {
            let Some(identity) = item.identity(&id_attribute) else {
                continue;
            };
            if self.tracker.is_added(item.key()) {
                adopted.insert(identity.to_string(), item.key());
            } else {
                known.insert(identity.to_string(), item.key());
            }
        }
        let removed: HashSet<String> = self
            .tracker
            .removed()
            .iter()
            .filter_map(|item| item.identity(&id_attribute).map(|v| v.to_string()))
            .collect();

        let mut items = Vec::with_capacity(records.len() + self.tracker.added().len());
        let mut baseline = Vec::with_capacity(records.len());
        let mut seen = HashSet::new();
        let mut merged = Vec::new();

        for fields in records {
            let mut fields = self.template.instantiate(fields);
            let identity = fields
                .get(&id_attribute)
                .filter(|v| !v.is_null())
                .map(|v| v.to_string());

            if identity.as_ref().is_some_and(|id| removed.contains(id)) {
                continue;
            }

            // A pending add whose identity the remote already holds becomes
            // an update of that record
            if let Some(key) = identity.as_ref().and_then(|id| adopted.remove(id)) {
                seen.insert(key);
                baseline.push((key, self.template.payload(&fields)));
                if let Some(local) = previous.iter().find(|item| item.key() == key) {
                    fields.extend(local.fields().clone());
                }
                debug!(%key, "merged pending add into fetched record");
                self.tracker.acknowledge_added(key);
                merged.push(key);
                items.push(DataItem::new(key, fields));
                continue;
            }

            let key = match identity.as_ref().and_then(|id| known.get(id)) {
                Some(key) => *key,
                None => self.allocate_key(),
            };
            if !seen.insert(key) {
                continue;
            }
            baseline.push((key, self.template.payload(&fields)));

            match previous.iter().find(|item| item.key() == key) {
                Some(item) if self.tracker.is_updated(key) => items.push(item.clone()),
                Some(item) => {
                    self.template.retain_local(item.fields(), &mut fields);
                    items.push(DataItem::new(key, fields));
                }
                None => items.push(DataItem::new(key, fields)),
            }
        }

        // Updated items the server no longer returned stay until synced
        for key in self.tracker.updated() {
            if !seen.contains(key) {
                if let Some(item) = previous.iter().find(|item| item.key() == *key) {
                    items.push(item.clone());
                }
            }
        }
        for key in self.tracker.added() {
            if let Some(item) = previous.iter().find(|item| item.key() == *key) {
                items.push(item.clone());
            }
        }

        // Keep baselines for pending entries the result did not cover
        let pending = self
            .tracker
            .updated()
            .iter()
            .copied()
            .chain(self.tracker.removed().iter().map(DataItem::key));
        for key in pending {
            if !seen.contains(&key) {
                if let Some(fields) = self.tracker.baseline(key) {
                    baseline.push((key, fields.clone()));
                }
            }
        }
        self.tracker.rebaseline(baseline);

        let updated: Vec<ItemKey> = self.tracker.updated().iter().copied().chain(merged).collect();
        for key in updated {
            if let Some(item) = items.iter().find(|item| item.key() == key) {
                let payload = self.template.payload(item.fields());
                self.tracker.record_update(key, &payload);
            }
        }

        self.data.set(items);
        self.refresh_view();
    }

    fn position(&self, target: ItemRef) -> Result<usize> {
        let found = match target {
            ItemRef::Index(index) if index < self.data.len() => Ok(index),
            ItemRef::Index(index) => Err(Error::IndexOutOfRange {
                index,
                len: self.data.len(),
            }),
            ItemRef::Key(key) => self
                .data
                .iter()
                .position(|item| item.key() == key)
                .ok_or(Error::ItemNotFound(key)),
        };
        if let Err(err) = &found {
            warn!(error = %err, "rejected operation");
        }
        found
    }

    fn snapshot(&self, items: &[DataItem]) -> Vec<(ItemKey, FieldMap)> {
        items
            .iter()
            .map(|item| (item.key(), self.template.payload(item.fields())))
            .collect()
    }

    fn allocate_key(&mut self) -> ItemKey {
        let key = ItemKey::new(self.next_key);
        self.next_key += 1;
        key
    }

    fn refresh_view(&mut self) {
        let view = compute_view(self.data.get(), &self.query);
        debug!(data = self.data.len(), view = view.len(), "view recomputed");
        self.view.set(view);
    }
}

async fn execute<T: Transport>(
    transport: &T,
    operation: RemoteOp,
    endpoint: &Endpoint,
    payload: serde_json::Value,
) -> Result<serde_json::Value> {
    transport
        .execute(Request::new(operation, endpoint, payload))
        .await
        .map_err(|e| Error::TransportFailure {
            operation,
            message: e.message,
        })
}

fn parse_records(response: serde_json::Value) -> Result<Vec<FieldMap>> {
    let serde_json::Value::Array(values) = response else {
        return Err(Error::InvalidResponse {
            operation: RemoteOp::Read,
            message: "expected an array of records".into(),
        });
    };

    values
        .into_iter()
        .enumerate()
        .map(|(i, value)| match value {
            serde_json::Value::Object(fields) => Ok(fields),
            _ => Err(Error::InvalidResponse {
                operation: RemoteOp::Read,
                message: format!("record {} is not an object", i),
            }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn item_ref_conversions() {
        let item = DataItem::new(ItemKey::new(4), FieldMap::new());
        assert_eq!(ItemRef::from(2usize), ItemRef::Index(2));
        assert_eq!(ItemRef::from(ItemKey::new(1)), ItemRef::Key(ItemKey::new(1)));
        assert_eq!(ItemRef::from(&item), ItemRef::Key(ItemKey::new(4)));
    }

    #[test]
    fn parse_array_of_objects() {
        let records = parse_records(json!([{"Id": 0}, {"Id": 1}])).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["Id"], 1);
    }

    #[test]
    fn parse_rejects_non_array() {
        let err = parse_records(json!({"data": []})).unwrap_err();
        assert!(matches!(err, Error::InvalidResponse { operation: RemoteOp::Read, .. }));
    }

    #[test]
    fn parse_rejects_non_object_record() {
        let err = parse_records(json!([{"Id": 0}, 5])).unwrap_err();
        assert_eq!(
            err,
            Error::InvalidResponse {
                operation: RemoteOp::Read,
                message: "record 1 is not an object".into()
            }
        );
    }

    #[test]
    fn source_state_serialization() {
        assert_eq!(serde_json::to_string(&SourceState::Dirty).unwrap(), "\"dirty\"");
    }
}
