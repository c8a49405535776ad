//! Item: the unit of storage.
//!
//! An [`Item`] always carries a non-empty partition-key value and a non-empty
//! id; that invariant is enforced by [`ItemDraft::build`], so a constructed
//! item can be handed to the workflow without further checks. Payload fields
//! are schema-less JSON.
//!
//! ## Example
//!
//! ```ignore
//! use docstore_rust::Item;
//!
//! let item = Item::draft("cat-1")
//!     .with_id("a1")
//!     .field("name", "Widget")
//!     .field("price", 9.99)
//!     .build()?;
//! assert_eq!(item.partition_key(), "cat-1");
//! ```

use serde_json::{Map, Value};

use crate::error::{WorkflowError, WorkflowResult};

/// Server-assigned write tag on a persisted document.
pub const ETAG_FIELD: &str = "_etag";
/// Server-assigned unix-seconds timestamp on a persisted document.
pub const TS_FIELD: &str = "_ts";

/// A well-formed item: non-empty id, non-empty partition-key value, and
/// arbitrary additional JSON fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    id: String,
    partition_key: String,
    fields: Map<String, Value>,
}

impl Item {
    /// Start building an item for the given partition-key value.
    pub fn draft(partition_key: impl Into<String>) -> ItemDraft {
        ItemDraft::new(partition_key)
    }

    /// Unique identifier within the container.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Value that determines the item's physical placement.
    pub fn partition_key(&self) -> &str {
        &self.partition_key
    }

    /// The payload fields (everything besides id and partition key).
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Look up a payload field by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Serialize into the schema-less document sent to the store, writing the
    /// partition-key value under `partition_field` (the container's
    /// partition-key path without the leading slash).
    ///
    /// Fails if the payload already carries `partition_field` with a value
    /// that disagrees with [`partition_key`](Item::partition_key).
    pub fn to_document(&self, partition_field: &str) -> WorkflowResult<Value> {
        if let Some(existing) = self.fields.get(partition_field) {
            if existing != &Value::String(self.partition_key.clone()) {
                return Err(WorkflowError::Validation(format!(
                    "field {} conflicts with the item's partition-key value",
                    partition_field
                )));
            }
        }

        let mut doc = Map::new();
        doc.insert("id".to_string(), Value::String(self.id.clone()));
        doc.insert(
            partition_field.to_string(),
            Value::String(self.partition_key.clone()),
        );
        for (name, value) in &self.fields {
            if name != partition_field {
                doc.insert(name.clone(), value.clone());
            }
        }
        Ok(Value::Object(doc))
    }
}

/// Builder for [`Item`]. `build` is the single validation point: it rejects
/// an empty partition-key value, an explicitly empty id, and reserved field
/// names, and fills a missing id with a fresh v4 UUID.
#[derive(Debug, Clone)]
pub struct ItemDraft {
    id: Option<String>,
    partition_key: String,
    fields: Map<String, Value>,
}

impl ItemDraft {
    /// Create a draft for the given partition-key value.
    pub fn new(partition_key: impl Into<String>) -> Self {
        ItemDraft {
            id: None,
            partition_key: partition_key.into(),
            fields: Map::new(),
        }
    }

    /// Use a caller-chosen id instead of a generated UUID.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Add a payload field.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Validate and produce the item.
    pub fn build(self) -> WorkflowResult<Item> {
        if self.partition_key.is_empty() {
            return Err(WorkflowError::Validation(
                "item is missing a partition-key value".to_string(),
            ));
        }

        let id = match self.id {
            Some(id) if id.is_empty() => {
                return Err(WorkflowError::Validation("item id is empty".to_string()));
            }
            Some(id) => id,
            None => uuid::Uuid::new_v4().to_string(),
        };

        for name in self.fields.keys() {
            if name == "id" || name.starts_with('_') {
                return Err(WorkflowError::Validation(format!(
                    "field name {} is reserved",
                    name
                )));
            }
        }

        Ok(Item {
            id,
            partition_key: self.partition_key,
            fields: self.fields,
        })
    }
}

/// The stored representation acknowledged by the engine: the caller's item
/// plus server-assigned metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedItem {
    item: Item,
    etag: String,
    timestamp: i64,
}

impl PersistedItem {
    /// Parse a stored document returned by the engine.
    ///
    /// `partition_field` names the container's partition-key field. Fails if
    /// the document is missing id, partition key, or the server metadata.
    pub fn from_document(doc: &Value, partition_field: &str) -> WorkflowResult<PersistedItem> {
        let obj = doc.as_object().ok_or_else(|| WorkflowError::Procedure {
            message: "store returned a non-object document".to_string(),
            transient: false,
        })?;

        let id = required_string(obj, "id")?;
        let partition_key = required_string(obj, partition_field)?;
        let etag = required_string(obj, ETAG_FIELD)?;
        let timestamp = obj
            .get(TS_FIELD)
            .and_then(Value::as_i64)
            .ok_or_else(|| missing_field(TS_FIELD))?;

        let mut fields = Map::new();
        for (name, value) in obj {
            if name != "id" && name != partition_field && !name.starts_with('_') {
                fields.insert(name.clone(), value.clone());
            }
        }

        Ok(PersistedItem {
            item: Item {
                id,
                partition_key,
                fields,
            },
            etag,
            timestamp,
        })
    }

    /// The caller-visible item, without server metadata.
    pub fn item(&self) -> &Item {
        &self.item
    }

    /// Server-assigned write tag.
    pub fn etag(&self) -> &str {
        &self.etag
    }

    /// Server-assigned unix-seconds timestamp.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }
}

fn required_string(obj: &Map<String, Value>, name: &str) -> WorkflowResult<String> {
    obj.get(name)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| missing_field(name))
}

fn missing_field(name: &str) -> WorkflowError {
    WorkflowError::Procedure {
        message: format!("stored document is missing {}", name),
        transient: false,
    }
}
