//! Data items held by a data source.

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::ops::Index;

/// Named fields of a record.
pub type FieldMap = serde_json::Map<String, serde_json::Value>;

/// Identity field used when no `idAttribute` is configured.
pub const DEFAULT_ID_ATTRIBUTE: &str = "Id";

static NULL: serde_json::Value = serde_json::Value::Null;

/// Client-side handle of an item.
///
/// Assigned by the data source when an item enters the full set and never
/// reused by that data source. It identifies items that have no server
/// identity yet and is never sent to the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemKey(u64);

impl ItemKey {
    /// Wrap a raw key value.
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw key value.
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A record managed by a data source.
///
/// Serializes as its bare field map; the key stays local.
#[derive(Debug, Clone, PartialEq)]
pub struct DataItem {
    key: ItemKey,
    fields: FieldMap,
}

impl DataItem {
    /// Create an item from its key and fields.
    pub fn new(key: ItemKey, fields: FieldMap) -> Self {
        Self { key, fields }
    }

    /// Client-side key.
    pub fn key(&self) -> ItemKey {
        self.key
    }

    /// Get a field value.
    pub fn get(&self, field: &str) -> Option<&serde_json::Value> {
        self.fields.get(field)
    }

    /// Set a field value, returning the previous one.
    ///
    /// The change is local to this copy until it is handed to
    /// [`DataSource::update`](crate::DataSource::update).
    pub fn set(
        &mut self,
        field: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Option<serde_json::Value> {
        self.fields.insert(field.into(), value.into())
    }

    /// Remove a field, returning its value.
    pub fn remove_field(&mut self, field: &str) -> Option<serde_json::Value> {
        self.fields.remove(field)
    }

    /// All fields.
    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    /// Mutable access to all fields.
    pub fn fields_mut(&mut self) -> &mut FieldMap {
        &mut self.fields
    }

    /// Consume the item, keeping its fields.
    pub fn into_fields(self) -> FieldMap {
        self.fields
    }

    /// Server identity, if assigned. A `null` identity counts as unassigned.
    pub fn identity(&self, id_attribute: &str) -> Option<&serde_json::Value> {
        self.fields.get(id_attribute).filter(|v| !v.is_null())
    }

    /// Whether the item has not been assigned a server identity yet.
    pub fn is_new(&self, id_attribute: &str) -> bool {
        self.identity(id_attribute).is_none()
    }

    pub(crate) fn replace_fields(&mut self, fields: FieldMap) {
        self.fields = fields;
    }

    /// Overwrite fields present in `fields`, keeping the rest.
    pub(crate) fn merge_fields(&mut self, fields: FieldMap) {
        for (name, value) in fields {
            self.fields.insert(name, value);
        }
    }
}

impl Index<&str> for DataItem {
    type Output = serde_json::Value;

    fn index(&self, field: &str) -> &Self::Output {
        self.fields.get(field).unwrap_or(&NULL)
    }
}

impl Serialize for DataItem {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

/// Render an identity value for messages.
pub(crate) fn describe_identity(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: serde_json::Value) -> FieldMap {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn create_item() {
        let item = DataItem::new(
            ItemKey::new(1),
            fields(json!({"Id": 0, "FirstName": "Antonio"})),
        );

        assert_eq!(item.key(), ItemKey::new(1));
        assert_eq!(item["FirstName"], "Antonio");
        assert_eq!(item.identity(DEFAULT_ID_ATTRIBUTE), Some(&json!(0)));
        assert!(!item.is_new(DEFAULT_ID_ATTRIBUTE));
    }

    #[test]
    fn missing_field_indexes_to_null() {
        let item = DataItem::new(ItemKey::new(1), FieldMap::new());
        assert!(item["City"].is_null());
        assert!(item.get("City").is_none());
    }

    #[test]
    fn null_identity_is_new() {
        let item = DataItem::new(ItemKey::new(2), fields(json!({"Id": null, "Name": "x"})));
        assert!(item.is_new("Id"));
    }

    #[test]
    fn custom_identity_field() {
        let item = DataItem::new(ItemKey::new(3), fields(json!({"uuid": "a-b", "Id": 4})));
        assert_eq!(item.identity("uuid"), Some(&json!("a-b")));
        assert!(item.is_new("missing"));
    }

    #[test]
    fn set_and_remove_fields() {
        let mut item = DataItem::new(ItemKey::new(1), fields(json!({"City": "Varna"})));

        let previous = item.set("City", "Sofia");
        assert_eq!(previous, Some(json!("Varna")));
        assert_eq!(item["City"], "Sofia");

        assert_eq!(item.remove_field("City"), Some(json!("Sofia")));
        assert!(item.fields().is_empty());
    }

    #[test]
    fn merge_keeps_unrelated_fields() {
        let mut item = DataItem::new(ItemKey::new(1), fields(json!({"FirstName": "Test"})));
        item.merge_fields(fields(json!({"Id": 9})));

        assert_eq!(item["Id"], 9);
        assert_eq!(item["FirstName"], "Test");
    }

    #[test]
    fn serializes_fields_only() {
        let item = DataItem::new(ItemKey::new(42), fields(json!({"Id": 1, "Name": "a"})));
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json, json!({"Id": 1, "Name": "a"}));
    }

    #[test]
    fn key_display() {
        assert_eq!(ItemKey::new(5).to_string(), "#5");
    }

    #[test]
    fn describe_identity_values() {
        assert_eq!(describe_identity(&json!("abc")), "abc");
        assert_eq!(describe_identity(&json!(12)), "12");
    }
}
