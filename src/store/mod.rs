//! The document-store seam.
//!
//! [`DocumentStore`] is the async contract the workflow drives: topology
//! creation, procedure registration/execution, point reads, and paged
//! queries. Two implementations ship with the crate: the embedded
//! [`InMemoryStore`] engine and, behind the `http` feature, the `HttpStore`
//! client for a remote gateway.
//!
//! ## Example
//!
//! ```ignore
//! let store = InMemoryStore::new();
//! store.connect().await?;
//! store.create_database("shop").await?;
//! let handle = store.create_container("shop", "items", "/categoryId").await?;
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::StoreError;
use crate::procedure::ProcedureSource;

pub mod in_memory;

pub use in_memory::InMemoryStore;

/// Items fetched per query page unless the caller overrides it.
pub const QUERY_PAGE_SIZE: usize = 100;

/// Identity of a provisioned container, as acknowledged by the store.
///
/// The `resource_id` is assigned by the store at creation and stays stable
/// across repeated create-if-absent calls, which is what makes topology
/// idempotence observable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerHandle {
    pub database: String,
    pub container: String,
    pub partition_key_path: String,
    pub resource_id: String,
}

impl ContainerHandle {
    /// The field name items are partitioned by: the path without its
    /// leading slash.
    pub fn partition_field(&self) -> &str {
        self.partition_key_path.trim_start_matches('/')
    }
}

/// Outcome of a procedure registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcedureCreated {
    /// The procedure did not exist and was stored.
    Created,
    /// A procedure with that name was already registered; nothing changed.
    AlreadyExists,
}

/// One page of query results plus the cursor for the next page, if any.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryPage {
    pub items: Vec<Value>,
    pub continuation: Option<String>,
}

/// Async contract of a partitioned document store.
///
/// Implementations are cheap-to-clone handles onto shared engine state; all
/// methods take `&self`. Every operation either succeeds or reports a
/// [`StoreError`]; partial effects are never surfaced.
pub trait DocumentStore {
    /// Handshake: proves the endpoint is reachable and the credential is
    /// accepted before any resource call is made.
    async fn connect(&self) -> Result<(), StoreError>;

    /// Creates the database if absent. Succeeds without change when it
    /// already exists.
    async fn create_database(&self, database: &str) -> Result<(), StoreError>;

    /// Creates the container if absent, declaring its partition-key path,
    /// and returns its handle. Re-creating an existing container with the
    /// same path returns the existing handle unchanged; a different path is
    /// a [`StoreError::Conflict`].
    async fn create_container(
        &self,
        database: &str,
        container: &str,
        partition_key_path: &str,
    ) -> Result<ContainerHandle, StoreError>;

    /// Registers the procedure under its name if not already present. Never
    /// overwrites an existing body.
    async fn create_procedure(
        &self,
        container: &ContainerHandle,
        source: &ProcedureSource,
    ) -> Result<ProcedureCreated, StoreError>;

    /// Executes a registered procedure under a partition-key scope and
    /// returns whatever document the routine produced.
    async fn execute_procedure(
        &self,
        container: &ContainerHandle,
        name: &str,
        partition_key: &str,
        args: Vec<Value>,
    ) -> Result<Value, StoreError>;

    /// Point lookup of one document by id within a partition. `Ok(None)`
    /// when no such item exists.
    async fn read_item(
        &self,
        container: &ContainerHandle,
        id: &str,
        partition_key: &str,
    ) -> Result<Option<Value>, StoreError>;

    /// Fetches one page of the select-all feed. Pass the continuation from
    /// the previous page to resume; `None` starts from the beginning. A page
    /// with `continuation: None` is the last one.
    async fn query_page(
        &self,
        container: &ContainerHandle,
        continuation: Option<String>,
        max_items: usize,
    ) -> Result<QueryPage, StoreError>;
}
