//! InMemoryStore - embedded partitioned document engine for development and
//! tests.
//!
//! The engine keeps databases, containers, registered procedures, and
//! documents in process memory. Documents are keyed by `(partition key, id)`
//! in sorted order, which is also the feed order of
//! [`query_page`](super::DocumentStore::query_page). Procedure bodies are
//! stored verbatim and never interpreted: executing any registered procedure
//! applies create-or-fail semantics to its single document argument and
//! returns the stored representation, with `_etag` and `_ts` assigned by the
//! engine.
//!
//! ## Example
//!
//! ```ignore
//! let store = InMemoryStore::new();
//! store.create_database("shop").await?;
//! let handle = store.create_container("shop", "items", "/categoryId").await?;
//! store.create_procedure(&handle, &ProcedureSource::insert_item()).await?;
//! ```

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::{Arc, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::{ContainerHandle, DocumentStore, ProcedureCreated, QueryPage};
use crate::error::StoreError;
use crate::item::{ETAG_FIELD, TS_FIELD};
use crate::procedure::{ProcedureSource, MAX_PROCEDURE_BODY_BYTES};

struct Container {
    partition_key_path: String,
    resource_id: String,
    procedures: HashMap<String, String>,
    documents: BTreeMap<(String, String), Value>,
}

struct Database {
    containers: HashMap<String, Container>,
}

/// Cursor serialized into the opaque continuation token.
#[derive(Serialize, Deserialize)]
struct Cursor {
    partition_key: String,
    id: String,
}

/// Embedded document-store engine backed by nested maps.
///
/// Clone-friendly via Arc: clones share the same engine state.
#[derive(Clone)]
pub struct InMemoryStore {
    databases: Arc<RwLock<HashMap<String, Database>>>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    /// Create a new empty engine.
    pub fn new() -> Self {
        Self {
            databases: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Resolve the handle of an existing container.
    #[cfg(feature = "http")]
    pub(crate) fn lookup_container(
        &self,
        database: &str,
        container: &str,
    ) -> Result<ContainerHandle, StoreError> {
        let databases = self.databases.read().map_err(|_| poisoned())?;
        let stored = databases
            .get(database)
            .and_then(|db| db.containers.get(container))
            .ok_or_else(|| unknown_container(database, container))?;
        Ok(ContainerHandle {
            database: database.to_string(),
            container: container.to_string(),
            partition_key_path: stored.partition_key_path.clone(),
            resource_id: stored.resource_id.clone(),
        })
    }
}

fn poisoned() -> StoreError {
    StoreError::Unreachable("lock poisoned".to_string())
}

fn unknown_container(database: &str, container: &str) -> StoreError {
    StoreError::NotFound(format!("container {}/{}", database, container))
}

fn unix_seconds() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Applies the create-or-fail contract to one document inside a container.
fn insert_document(
    container: &mut Container,
    partition_key: &str,
    mut args: Vec<Value>,
) -> Result<Value, StoreError> {
    if args.len() != 1 {
        return Err(StoreError::InvalidRequest(format!(
            "procedure expects one document argument, got {}",
            args.len()
        )));
    }
    let doc = args.remove(0);
    let obj = match doc {
        Value::Object(obj) => obj,
        _ => {
            return Err(StoreError::InvalidRequest(
                "procedure argument is not a document".to_string(),
            ))
        }
    };

    let id = match obj.get("id").and_then(Value::as_str) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => {
            return Err(StoreError::InvalidRequest(
                "document is missing an id".to_string(),
            ))
        }
    };

    let field = container.partition_key_path.trim_start_matches('/');
    match obj.get(field).and_then(Value::as_str) {
        Some(value) if value == partition_key => {}
        Some(_) => {
            return Err(StoreError::InvalidRequest(
                "document partition key does not match the request scope".to_string(),
            ))
        }
        None => {
            return Err(StoreError::InvalidRequest(
                "document is missing a partition-key value".to_string(),
            ))
        }
    }

    let key = (partition_key.to_string(), id.clone());
    if container.documents.contains_key(&key) {
        return Err(StoreError::Conflict { id });
    }

    let mut stored = obj;
    stored.insert(
        ETAG_FIELD.to_string(),
        Value::String(Uuid::new_v4().to_string()),
    );
    stored.insert(TS_FIELD.to_string(), Value::from(unix_seconds()));
    let stored = Value::Object(stored);

    container.documents.insert(key, stored.clone());
    Ok(stored)
}

impl DocumentStore for InMemoryStore {
    async fn connect(&self) -> Result<(), StoreError> {
        // The embedded engine is always reachable; the handshake only
        // verifies the lock is usable.
        self.databases.read().map_err(|_| poisoned())?;
        Ok(())
    }

    async fn create_database(&self, database: &str) -> Result<(), StoreError> {
        let mut databases = self.databases.write().map_err(|_| poisoned())?;
        databases.entry(database.to_string()).or_insert(Database {
            containers: HashMap::new(),
        });
        Ok(())
    }

    async fn create_container(
        &self,
        database: &str,
        container: &str,
        partition_key_path: &str,
    ) -> Result<ContainerHandle, StoreError> {
        let mut databases = self.databases.write().map_err(|_| poisoned())?;
        let db = databases
            .get_mut(database)
            .ok_or_else(|| StoreError::NotFound(format!("database {}", database)))?;

        let existing = db.containers.entry(container.to_string()).or_insert_with(|| {
            Container {
                partition_key_path: partition_key_path.to_string(),
                resource_id: Uuid::new_v4().to_string(),
                procedures: HashMap::new(),
                documents: BTreeMap::new(),
            }
        });

        if existing.partition_key_path != partition_key_path {
            return Err(StoreError::Conflict {
                id: container.to_string(),
            });
        }

        Ok(ContainerHandle {
            database: database.to_string(),
            container: container.to_string(),
            partition_key_path: existing.partition_key_path.clone(),
            resource_id: existing.resource_id.clone(),
        })
    }

    async fn create_procedure(
        &self,
        container: &ContainerHandle,
        source: &ProcedureSource,
    ) -> Result<ProcedureCreated, StoreError> {
        if source.body.len() > MAX_PROCEDURE_BODY_BYTES {
            return Err(StoreError::InvalidRequest(format!(
                "procedure body exceeds {} bytes",
                MAX_PROCEDURE_BODY_BYTES
            )));
        }

        let mut databases = self.databases.write().map_err(|_| poisoned())?;
        let stored = databases
            .get_mut(&container.database)
            .and_then(|db| db.containers.get_mut(&container.container))
            .ok_or_else(|| unknown_container(&container.database, &container.container))?;

        if stored.procedures.contains_key(&source.name) {
            return Ok(ProcedureCreated::AlreadyExists);
        }
        stored
            .procedures
            .insert(source.name.clone(), source.body.clone());
        Ok(ProcedureCreated::Created)
    }

    async fn execute_procedure(
        &self,
        container: &ContainerHandle,
        name: &str,
        partition_key: &str,
        args: Vec<Value>,
    ) -> Result<Value, StoreError> {
        let mut databases = self.databases.write().map_err(|_| poisoned())?;
        let stored = databases
            .get_mut(&container.database)
            .and_then(|db| db.containers.get_mut(&container.container))
            .ok_or_else(|| unknown_container(&container.database, &container.container))?;

        if !stored.procedures.contains_key(name) {
            return Err(StoreError::NotFound(format!("procedure {}", name)));
        }

        insert_document(stored, partition_key, args)
    }

    async fn read_item(
        &self,
        container: &ContainerHandle,
        id: &str,
        partition_key: &str,
    ) -> Result<Option<Value>, StoreError> {
        let databases = self.databases.read().map_err(|_| poisoned())?;
        let stored = databases
            .get(&container.database)
            .and_then(|db| db.containers.get(&container.container))
            .ok_or_else(|| unknown_container(&container.database, &container.container))?;

        let key = (partition_key.to_string(), id.to_string());
        Ok(stored.documents.get(&key).cloned())
    }

    async fn query_page(
        &self,
        container: &ContainerHandle,
        continuation: Option<String>,
        max_items: usize,
    ) -> Result<QueryPage, StoreError> {
        if max_items == 0 {
            return Err(StoreError::InvalidRequest(
                "maxItems must be positive".to_string(),
            ));
        }

        let databases = self.databases.read().map_err(|_| poisoned())?;
        let stored = databases
            .get(&container.database)
            .and_then(|db| db.containers.get(&container.container))
            .ok_or_else(|| unknown_container(&container.database, &container.container))?;

        let lower = match continuation {
            Some(token) => {
                let cursor: Cursor = serde_json::from_str(&token).map_err(|_| {
                    StoreError::InvalidRequest("malformed continuation token".to_string())
                })?;
                Bound::Excluded((cursor.partition_key, cursor.id))
            }
            None => Bound::Unbounded,
        };

        let mut range = stored.documents.range((lower, Bound::Unbounded));
        let mut items = Vec::with_capacity(max_items.min(stored.documents.len()));
        let mut last_key: Option<&(String, String)> = None;
        for (key, doc) in range.by_ref().take(max_items) {
            items.push(doc.clone());
            last_key = Some(key);
        }

        let continuation = match (last_key, range.next()) {
            (Some((partition_key, id)), Some(_)) => {
                let cursor = Cursor {
                    partition_key: partition_key.clone(),
                    id: id.clone(),
                };
                Some(serde_json::to_string(&cursor).map_err(|e| {
                    StoreError::InvalidRequest(format!("cannot encode continuation: {}", e))
                })?)
            }
            _ => None,
        };

        Ok(QueryPage {
            items,
            continuation,
        })
    }
}
