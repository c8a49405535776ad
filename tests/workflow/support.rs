//! Test doubles and fixtures shared by the workflow suites.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::Value;

use docstore_rust::{
    ContainerHandle, DocumentStore, Item, ProcedureCreated, ProcedureSource, QueryPage,
    StoreError, Workflow, WorkflowConfig,
};

/// Config pointing a workflow at the embedded engine.
pub fn memory_config() -> WorkflowConfig {
    WorkflowConfig {
        endpoint: "memory:".to_string(),
        database: "shop".to_string(),
        container: "items".to_string(),
        partition_key_path: "/categoryId".to_string(),
        ..WorkflowConfig::default()
    }
}

/// Runs the setup pipeline so data-plane calls are available.
pub async fn ready_workflow<S: DocumentStore>(store: S) -> (Workflow<S>, ContainerHandle) {
    let workflow = Workflow::new(store);
    let handle = workflow.ensure_topology(&memory_config()).await.unwrap();
    workflow
        .register_insertion_procedure(&handle, &ProcedureSource::insert_item())
        .await
        .unwrap();
    (workflow, handle)
}

/// The canonical test item.
pub fn widget(id: &str, category: &str) -> Item {
    Item::draft(category)
        .with_id(id)
        .field("name", "Widget")
        .field("price", 9.99)
        .build()
        .unwrap()
}

/// Per-operation call counters observed by [`RecordingStore`].
#[derive(Default)]
pub struct CallCounts {
    pub connect: AtomicUsize,
    pub create_database: AtomicUsize,
    pub create_container: AtomicUsize,
    pub create_procedure: AtomicUsize,
    pub execute_procedure: AtomicUsize,
    pub read_item: AtomicUsize,
    pub query_page: AtomicUsize,
}

impl CallCounts {
    /// Total store invocations across every operation.
    pub fn total(&self) -> usize {
        self.connect.load(Ordering::SeqCst)
            + self.create_database.load(Ordering::SeqCst)
            + self.create_container.load(Ordering::SeqCst)
            + self.create_procedure.load(Ordering::SeqCst)
            + self.execute_procedure.load(Ordering::SeqCst)
            + self.read_item.load(Ordering::SeqCst)
            + self.query_page.load(Ordering::SeqCst)
    }
}

/// Wraps a store and counts every call that reaches it.
#[derive(Clone)]
pub struct RecordingStore<S> {
    inner: S,
    calls: Arc<CallCounts>,
}

impl<S> RecordingStore<S> {
    pub fn new(inner: S) -> Self {
        RecordingStore {
            inner,
            calls: Arc::new(CallCounts::default()),
        }
    }

    /// Shared handle onto the counters, usable after the store moves into a
    /// workflow.
    pub fn counters(&self) -> Arc<CallCounts> {
        self.calls.clone()
    }
}

impl<S: DocumentStore> DocumentStore for RecordingStore<S> {
    async fn connect(&self) -> Result<(), StoreError> {
        self.calls.connect.fetch_add(1, Ordering::SeqCst);
        self.inner.connect().await
    }

    async fn create_database(&self, database: &str) -> Result<(), StoreError> {
        self.calls.create_database.fetch_add(1, Ordering::SeqCst);
        self.inner.create_database(database).await
    }

    async fn create_container(
        &self,
        database: &str,
        container: &str,
        partition_key_path: &str,
    ) -> Result<ContainerHandle, StoreError> {
        self.calls.create_container.fetch_add(1, Ordering::SeqCst);
        self.inner
            .create_container(database, container, partition_key_path)
            .await
    }

    async fn create_procedure(
        &self,
        container: &ContainerHandle,
        source: &ProcedureSource,
    ) -> Result<ProcedureCreated, StoreError> {
        self.calls.create_procedure.fetch_add(1, Ordering::SeqCst);
        self.inner.create_procedure(container, source).await
    }

    async fn execute_procedure(
        &self,
        container: &ContainerHandle,
        name: &str,
        partition_key: &str,
        args: Vec<Value>,
    ) -> Result<Value, StoreError> {
        self.calls.execute_procedure.fetch_add(1, Ordering::SeqCst);
        self.inner
            .execute_procedure(container, name, partition_key, args)
            .await
    }

    async fn read_item(
        &self,
        container: &ContainerHandle,
        id: &str,
        partition_key: &str,
    ) -> Result<Option<Value>, StoreError> {
        self.calls.read_item.fetch_add(1, Ordering::SeqCst);
        self.inner.read_item(container, id, partition_key).await
    }

    async fn query_page(
        &self,
        container: &ContainerHandle,
        continuation: Option<String>,
        max_items: usize,
    ) -> Result<QueryPage, StoreError> {
        self.calls.query_page.fetch_add(1, Ordering::SeqCst);
        self.inner
            .query_page(container, continuation, max_items)
            .await
    }
}

/// Wraps a store and fails armed operations exactly once.
///
/// `fail_next("execute_procedure", err)` makes the next execute call return
/// `err` instead of reaching the inner store; the fault disarms itself.
#[derive(Clone)]
pub struct FlakyStore<S> {
    inner: S,
    faults: Arc<Mutex<HashMap<String, StoreError>>>,
}

impl<S> FlakyStore<S> {
    pub fn new(inner: S) -> Self {
        FlakyStore {
            inner,
            faults: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn fail_next(&self, operation: &str, error: StoreError) {
        self.faults
            .lock()
            .unwrap()
            .insert(operation.to_string(), error);
    }

    fn take(&self, operation: &str) -> Option<StoreError> {
        self.faults.lock().unwrap().remove(operation)
    }
}

impl<S: DocumentStore> DocumentStore for FlakyStore<S> {
    async fn connect(&self) -> Result<(), StoreError> {
        if let Some(err) = self.take("connect") {
            return Err(err);
        }
        self.inner.connect().await
    }

    async fn create_database(&self, database: &str) -> Result<(), StoreError> {
        if let Some(err) = self.take("create_database") {
            return Err(err);
        }
        self.inner.create_database(database).await
    }

    async fn create_container(
        &self,
        database: &str,
        container: &str,
        partition_key_path: &str,
    ) -> Result<ContainerHandle, StoreError> {
        if let Some(err) = self.take("create_container") {
            return Err(err);
        }
        self.inner
            .create_container(database, container, partition_key_path)
            .await
    }

    async fn create_procedure(
        &self,
        container: &ContainerHandle,
        source: &ProcedureSource,
    ) -> Result<ProcedureCreated, StoreError> {
        if let Some(err) = self.take("create_procedure") {
            return Err(err);
        }
        self.inner.create_procedure(container, source).await
    }

    async fn execute_procedure(
        &self,
        container: &ContainerHandle,
        name: &str,
        partition_key: &str,
        args: Vec<Value>,
    ) -> Result<Value, StoreError> {
        if let Some(err) = self.take("execute_procedure") {
            return Err(err);
        }
        self.inner
            .execute_procedure(container, name, partition_key, args)
            .await
    }

    async fn read_item(
        &self,
        container: &ContainerHandle,
        id: &str,
        partition_key: &str,
    ) -> Result<Option<Value>, StoreError> {
        if let Some(err) = self.take("read_item") {
            return Err(err);
        }
        self.inner.read_item(container, id, partition_key).await
    }

    async fn query_page(
        &self,
        container: &ContainerHandle,
        continuation: Option<String>,
        max_items: usize,
    ) -> Result<QueryPage, StoreError> {
        if let Some(err) = self.take("query_page") {
            return Err(err);
        }
        self.inner
            .query_page(container, continuation, max_items)
            .await
    }
}
