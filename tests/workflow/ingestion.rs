//! Single-item ingestion: the procedure path, conflicts, and validation.

use serde_json::json;

use docstore_rust::{
    InMemoryStore, Item, ProcedureSource, Workflow, WorkflowError, WorkflowState,
};

use crate::support::{memory_config, ready_workflow, widget, RecordingStore};

// --- The happy path ---

#[tokio::test]
async fn ingested_widget_comes_back_with_metadata_and_all_fields() {
    let (workflow, handle) = ready_workflow(InMemoryStore::new()).await;
    let item = Item::draft("cat-1")
        .with_id("a1")
        .field("name", "Widget")
        .field("price", 9.99)
        .build()
        .unwrap();

    let persisted = workflow.ingest_item(&handle, &item).await.unwrap();

    assert_eq!(persisted.item(), &item);
    assert_eq!(persisted.item().get("name"), Some(&json!("Widget")));
    assert_eq!(persisted.item().get("price"), Some(&json!(9.99)));
    assert!(!persisted.etag().is_empty());
    assert!(persisted.timestamp() > 0);

    // the select-all feed yields exactly that one item
    let items = workflow
        .query_all_items(&handle)
        .await
        .unwrap()
        .collect_remaining()
        .await
        .unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0], persisted);
}

#[tokio::test]
async fn ingest_then_fetch_returns_an_equal_item() {
    let (workflow, handle) = ready_workflow(InMemoryStore::new()).await;
    let item = widget("a1", "cat-1");

    let persisted = workflow.ingest_item(&handle, &item).await.unwrap();
    let fetched = workflow
        .fetch_item(&handle, "a1", "cat-1")
        .await
        .unwrap()
        .unwrap();

    assert_eq!(fetched, persisted);
    assert_eq!(fetched.item(), &item);
}

#[tokio::test]
async fn generated_ids_are_unique_per_draft() {
    let (workflow, handle) = ready_workflow(InMemoryStore::new()).await;

    let first = Item::draft("cat-1").field("name", "Widget").build().unwrap();
    let second = Item::draft("cat-1").field("name", "Widget").build().unwrap();
    assert_ne!(first.id(), second.id());

    workflow.ingest_item(&handle, &first).await.unwrap();
    workflow.ingest_item(&handle, &second).await.unwrap();
}

// --- Conflicts ---

#[tokio::test]
async fn duplicate_id_fails_the_second_call_and_keeps_the_first_write() {
    let (workflow, handle) = ready_workflow(InMemoryStore::new()).await;
    let first = widget("a1", "cat-1");

    let persisted = workflow.ingest_item(&handle, &first).await.unwrap();

    let duplicate = Item::draft("cat-1")
        .with_id("a1")
        .field("name", "Impostor")
        .build()
        .unwrap();
    let err = workflow.ingest_item(&handle, &duplicate).await.unwrap_err();
    assert!(matches!(err, WorkflowError::Conflict { id } if id == "a1"));

    // still exactly one item, unchanged
    let fetched = workflow
        .fetch_item(&handle, "a1", "cat-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(fetched, persisted);
    let items = workflow
        .query_all_items(&handle)
        .await
        .unwrap()
        .collect_remaining()
        .await
        .unwrap();
    assert_eq!(items.len(), 1);
}

#[tokio::test]
async fn conflict_does_not_fail_the_machine() {
    let (workflow, handle) = ready_workflow(InMemoryStore::new()).await;
    workflow
        .ingest_item(&handle, &widget("a1", "cat-1"))
        .await
        .unwrap();
    workflow
        .ingest_item(&handle, &widget("a1", "cat-1"))
        .await
        .unwrap_err();

    assert_eq!(workflow.state(), WorkflowState::Ready);
    workflow
        .ingest_item(&handle, &widget("a2", "cat-1"))
        .await
        .unwrap();
}

// --- Validation ---

#[tokio::test]
async fn unkeyed_draft_fails_before_any_store_invocation() {
    let store = RecordingStore::new(InMemoryStore::new());
    let calls = store.counters();

    let err = Item::draft("").field("name", "Widget").build().unwrap_err();
    assert!(matches!(err, WorkflowError::Validation(_)));
    assert_eq!(calls.total(), 0);

    // nothing was written: a full pipeline afterwards sees an empty container
    let workflow = Workflow::new(store);
    let handle = workflow.ensure_topology(&memory_config()).await.unwrap();
    workflow
        .register_insertion_procedure(&handle, &ProcedureSource::insert_item())
        .await
        .unwrap();
    let items = workflow
        .query_all_items(&handle)
        .await
        .unwrap()
        .collect_remaining()
        .await
        .unwrap();
    assert!(items.is_empty());
}

#[tokio::test]
async fn partition_field_collision_is_a_validation_error() {
    let (workflow, handle) = ready_workflow(InMemoryStore::new()).await;

    // the item claims cat-1 but carries a categoryId field saying cat-2
    let item = Item::draft("cat-1")
        .with_id("a1")
        .field("categoryId", "cat-2")
        .build()
        .unwrap();
    let err = workflow.ingest_item(&handle, &item).await.unwrap_err();
    assert!(matches!(err, WorkflowError::Validation(_)));

    assert!(workflow
        .fetch_item(&handle, "a1", "cat-1")
        .await
        .unwrap()
        .is_none());
}
