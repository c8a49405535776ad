//! Workflow - idempotent provisioning and single-item ingestion against a
//! document store.
//!
//! A [`Workflow`] owns a [`DocumentStore`] client and tracks how far setup
//! has progressed through [`WorkflowState`]. The happy path is
//! `ensure_topology` then `register_insertion_procedure`, after which the
//! data-plane calls (`ingest_item`, `fetch_item`, `query_all_items`) are
//! available. Every setup operation is safe to repeat.
//!
//! ## Example
//!
//! ```ignore
//! let workflow = Workflow::new(InMemoryStore::new());
//! let handle = workflow.ensure_topology(&config).await?;
//! workflow
//!     .register_insertion_procedure(&handle, &ProcedureSource::insert_item())
//!     .await?;
//!
//! let item = Item::draft("cat-1").field("name", "Widget").build()?;
//! let persisted = workflow.ingest_item(&handle, &item).await?;
//! println!("stored with etag {}", persisted.etag());
//! ```

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, error, info, warn};

use crate::config::WorkflowConfig;
use crate::error::{StoreError, WorkflowError, WorkflowResult};
use crate::feed::ItemFeed;
use crate::item::{Item, PersistedItem};
use crate::procedure::ProcedureSource;
use crate::store::{ContainerHandle, DocumentStore, ProcedureCreated, QueryPage, QUERY_PAGE_SIZE};

/// Setup progress of a [`Workflow`].
///
/// Data-plane operations require `Ready`. A connectivity fault in any state
/// moves the workflow to `Failed`; re-running
/// [`ensure_topology`](Workflow::ensure_topology) is the only way out of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    /// No handshake has succeeded yet.
    Unconnected,
    /// The store answered the handshake.
    Connected,
    /// Database and container exist.
    TopologyEnsured,
    /// The insertion procedure is registered; passed through on the way to
    /// `Ready`.
    ProcedureRegistered,
    /// Data-plane operations may be called.
    Ready,
    /// A connectivity fault occurred.
    Failed,
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkflowState::Unconnected => "unconnected",
            WorkflowState::Connected => "connected",
            WorkflowState::TopologyEnsured => "topology-ensured",
            WorkflowState::ProcedureRegistered => "procedure-registered",
            WorkflowState::Ready => "ready",
            WorkflowState::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

struct Inner {
    state: WorkflowState,
    procedure: Option<String>,
}

/// Provisioning and ingestion workflow over a store client `S`.
///
/// All operations take `&self`; the state flag lives behind a mutex that is
/// only ever locked for an instantaneous read or write, never across an
/// await. Concurrent data-plane calls from the `Ready` state are safe; the
/// store serializes writes within a partition.
pub struct Workflow<S: DocumentStore> {
    store: S,
    inner: Mutex<Inner>,
}

impl<S: DocumentStore> Workflow<S> {
    /// Wraps a store client. The workflow starts `Unconnected`.
    pub fn new(store: S) -> Self {
        Workflow {
            store,
            inner: Mutex::new(Inner {
                state: WorkflowState::Unconnected,
                procedure: None,
            }),
        }
    }

    /// Current state of the setup machine.
    pub fn state(&self) -> WorkflowState {
        self.lock().state
    }

    /// Connects to the store and creates the database and container if
    /// absent, returning the container's handle.
    ///
    /// Safe to repeat: a second call against existing topology returns a
    /// handle with the same resource id. May be called from any state and is
    /// the only recovery from `Failed`; it restarts the machine, so the
    /// insertion procedure must be registered again afterwards.
    ///
    /// Fails with [`WorkflowError::Configuration`] on an invalid config
    /// (including a container that already exists under a different
    /// partition-key path) and [`WorkflowError::Connectivity`] when the
    /// endpoint is unreachable or the credential is rejected.
    pub async fn ensure_topology(
        &self,
        config: &WorkflowConfig,
    ) -> WorkflowResult<ContainerHandle> {
        config.validate()?;

        {
            let mut inner = self.lock();
            inner.state = WorkflowState::Unconnected;
            inner.procedure = None;
        }

        self.store.connect().await.map_err(|e| self.classify(e))?;
        self.set_state(WorkflowState::Connected);

        self.store
            .create_database(&config.database)
            .await
            .map_err(|e| self.classify(e))?;
        info!(database = %config.database, "database ensured");

        let handle = self
            .store
            .create_container(&config.database, &config.container, &config.partition_key_path)
            .await
            .map_err(|e| match e {
                StoreError::Conflict { .. } => WorkflowError::Configuration(format!(
                    "container {} already exists with a different partition-key path",
                    config.container
                )),
                other => self.classify(other),
            })?;
        info!(
            container = %handle.container,
            resource_id = %handle.resource_id,
            partition_key_path = %handle.partition_key_path,
            "container ensured"
        );

        self.set_state(WorkflowState::TopologyEnsured);
        Ok(handle)
    }

    /// Registers the insertion procedure and moves the workflow to `Ready`.
    ///
    /// Idempotent: an existing registration under the same name is treated
    /// as success and logged at debug level, never overwritten.
    ///
    /// Fails with [`WorkflowError::Configuration`] when called before
    /// topology is ensured and [`WorkflowError::Validation`] on an empty
    /// name, empty body, or oversized body; neither reaches the store.
    pub async fn register_insertion_procedure(
        &self,
        handle: &ContainerHandle,
        source: &ProcedureSource,
    ) -> WorkflowResult<()> {
        {
            let inner = self.lock();
            match inner.state {
                WorkflowState::TopologyEnsured | WorkflowState::Ready => {}
                state => {
                    return Err(WorkflowError::Configuration(format!(
                        "procedure registration requires ensured topology, workflow is {}",
                        state
                    )))
                }
            }
        }
        source.validate()?;

        let outcome = self
            .store
            .create_procedure(handle, source)
            .await
            .map_err(|e| self.classify(e))?;
        match outcome {
            ProcedureCreated::Created => {
                info!(procedure = %source.name, container = %handle.container, "procedure registered");
            }
            ProcedureCreated::AlreadyExists => {
                debug!(procedure = %source.name, "procedure already registered, nothing to do");
            }
        }

        self.lock().procedure = Some(source.name.clone());
        self.set_state(WorkflowState::ProcedureRegistered);
        self.set_state(WorkflowState::Ready);
        Ok(())
    }

    /// Inserts one item through the registered procedure and returns the
    /// stored representation, including the server-assigned `_etag` and
    /// `_ts` metadata.
    ///
    /// The item is serialized against the handle's partition-key field
    /// before any store call; a mismatch there is a
    /// [`WorkflowError::Validation`]. A duplicate id within the partition is
    /// a [`WorkflowError::Conflict`] and leaves the first write intact.
    pub async fn ingest_item(
        &self,
        handle: &ContainerHandle,
        item: &Item,
    ) -> WorkflowResult<PersistedItem> {
        let procedure = self.require_ready()?;
        let document = item.to_document(handle.partition_field())?;

        let stored = self
            .store
            .execute_procedure(handle, &procedure, item.partition_key(), vec![document])
            .await
            .map_err(|e| self.classify(e))?;
        let persisted = PersistedItem::from_document(&stored, handle.partition_field())?;
        info!(
            id = %persisted.item().id(),
            partition_key = %persisted.item().partition_key(),
            "item ingested"
        );
        Ok(persisted)
    }

    /// Point lookup of one item by id within a partition. `Ok(None)` when
    /// the item does not exist.
    pub async fn fetch_item(
        &self,
        handle: &ContainerHandle,
        id: &str,
        partition_key: &str,
    ) -> WorkflowResult<Option<PersistedItem>> {
        self.require_ready()?;
        let document = self
            .store
            .read_item(handle, id, partition_key)
            .await
            .map_err(|e| self.classify(e))?;
        match document {
            Some(doc) => Ok(Some(PersistedItem::from_document(
                &doc,
                handle.partition_field(),
            )?)),
            None => Ok(None),
        }
    }

    /// Opens the select-all feed over the container.
    ///
    /// Construction issues no store call; pages of [`QUERY_PAGE_SIZE`] items
    /// are fetched as the feed is consumed.
    pub async fn query_all_items(
        &self,
        handle: &ContainerHandle,
    ) -> WorkflowResult<ItemFeed<'_, S>> {
        self.require_ready()?;
        Ok(ItemFeed::new(self, handle.clone(), QUERY_PAGE_SIZE))
    }

    /// One page fetch on behalf of an [`ItemFeed`].
    pub(crate) async fn fetch_page(
        &self,
        handle: &ContainerHandle,
        continuation: Option<String>,
        max_items: usize,
    ) -> WorkflowResult<QueryPage> {
        self.store
            .query_page(handle, continuation, max_items)
            .await
            .map_err(|e| self.classify(e))
    }

    /// Checks the machine is `Ready` and returns the registered procedure
    /// name.
    fn require_ready(&self) -> WorkflowResult<String> {
        let inner = self.lock();
        if inner.state != WorkflowState::Ready {
            return Err(WorkflowError::Configuration(format!(
                "data-plane call requires the ready state, workflow is {}",
                inner.state
            )));
        }
        inner.procedure.clone().ok_or_else(|| {
            WorkflowError::Configuration("no insertion procedure registered".to_string())
        })
    }

    /// Converts a store fault to the caller-facing taxonomy; connectivity
    /// faults also move the machine to `Failed`.
    fn classify(&self, err: StoreError) -> WorkflowError {
        let err = WorkflowError::from(err);
        match &err {
            WorkflowError::Connectivity(_) => {
                error!(error = %err, "connectivity fault, workflow failed");
                self.lock().state = WorkflowState::Failed;
            }
            WorkflowError::Procedure { message, transient } => {
                warn!(message = %message, transient = *transient, "store procedure fault");
            }
            _ => {}
        }
        err
    }

    fn set_state(&self, state: WorkflowState) {
        let mut inner = self.lock();
        debug!(from = %inner.state, to = %state, "workflow state transition");
        inner.state = state;
    }

    // The state lock is only held for enum reads and writes, so a poisoned
    // lock still guards a valid value.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
