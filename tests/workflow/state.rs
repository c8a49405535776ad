//! The setup state machine: failure, recovery, and misuse.

use docstore_rust::{
    InMemoryStore, ProcedureSource, StoreError, Workflow, WorkflowError, WorkflowState,
};

use crate::support::{memory_config, widget, FlakyStore};

fn flaky() -> (FlakyStore<InMemoryStore>, Workflow<FlakyStore<InMemoryStore>>) {
    let store = FlakyStore::new(InMemoryStore::new());
    let handle = store.clone();
    (handle, Workflow::new(store))
}

#[tokio::test]
async fn unreachable_endpoint_fails_the_machine() {
    let (flaky, workflow) = flaky();
    flaky.fail_next("connect", StoreError::Unreachable("no route".to_string()));

    let err = workflow.ensure_topology(&memory_config()).await.unwrap_err();
    assert!(matches!(err, WorkflowError::Connectivity(_)));
    assert_eq!(workflow.state(), WorkflowState::Failed);
}

#[tokio::test]
async fn rejected_credential_fails_the_machine() {
    let (flaky, workflow) = flaky();
    flaky.fail_next("connect", StoreError::Unauthorized("bad key".to_string()));

    let err = workflow.ensure_topology(&memory_config()).await.unwrap_err();
    match err {
        WorkflowError::Connectivity(msg) => assert!(msg.contains("credential rejected")),
        other => panic!("expected Connectivity, got: {:?}", other),
    }
    assert_eq!(workflow.state(), WorkflowState::Failed);
}

#[tokio::test]
async fn failed_state_blocks_data_plane_calls() {
    let (flaky, workflow) = flaky();
    let handle = workflow.ensure_topology(&memory_config()).await.unwrap();
    workflow
        .register_insertion_procedure(&handle, &ProcedureSource::insert_item())
        .await
        .unwrap();

    flaky.fail_next(
        "execute_procedure",
        StoreError::Unreachable("socket closed".to_string()),
    );
    let err = workflow
        .ingest_item(&handle, &widget("a1", "cat-1"))
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Connectivity(_)));
    assert_eq!(workflow.state(), WorkflowState::Failed);

    // no fault armed now, but the machine refuses until setup is re-run
    let err = workflow
        .ingest_item(&handle, &widget("a1", "cat-1"))
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Configuration(_)));
}

#[tokio::test]
async fn re_running_ensure_topology_recovers_from_failed() {
    let (flaky, workflow) = flaky();
    let handle = workflow.ensure_topology(&memory_config()).await.unwrap();
    workflow
        .register_insertion_procedure(&handle, &ProcedureSource::insert_item())
        .await
        .unwrap();

    flaky.fail_next(
        "execute_procedure",
        StoreError::Unreachable("socket closed".to_string()),
    );
    workflow
        .ingest_item(&handle, &widget("a1", "cat-1"))
        .await
        .unwrap_err();
    assert_eq!(workflow.state(), WorkflowState::Failed);

    // recovery path: fresh topology run, then registration, then data plane
    let recovered = workflow.ensure_topology(&memory_config()).await.unwrap();
    assert_eq!(recovered.resource_id, handle.resource_id);
    workflow
        .register_insertion_procedure(&recovered, &ProcedureSource::insert_item())
        .await
        .unwrap();
    workflow
        .ingest_item(&recovered, &widget("a1", "cat-1"))
        .await
        .unwrap();
    assert_eq!(workflow.state(), WorkflowState::Ready);
}

#[tokio::test]
async fn topology_rerun_requires_registration_again() {
    let (_, workflow) = flaky();
    let handle = workflow.ensure_topology(&memory_config()).await.unwrap();
    workflow
        .register_insertion_procedure(&handle, &ProcedureSource::insert_item())
        .await
        .unwrap();
    assert_eq!(workflow.state(), WorkflowState::Ready);

    // rerunning setup restarts the machine
    workflow.ensure_topology(&memory_config()).await.unwrap();
    assert_eq!(workflow.state(), WorkflowState::TopologyEnsured);
    let err = workflow
        .ingest_item(&handle, &widget("a1", "cat-1"))
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Configuration(_)));
}

#[tokio::test]
async fn procedure_fault_leaves_the_machine_ready() {
    let (flaky, workflow) = flaky();
    let handle = workflow.ensure_topology(&memory_config()).await.unwrap();
    workflow
        .register_insertion_procedure(&handle, &ProcedureSource::insert_item())
        .await
        .unwrap();

    flaky.fail_next(
        "execute_procedure",
        StoreError::Procedure {
            message: "routine threw".to_string(),
            transient: false,
        },
    );
    let err = workflow
        .ingest_item(&handle, &widget("a1", "cat-1"))
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Procedure { .. }));
    assert!(!err.is_retryable());
    assert_eq!(workflow.state(), WorkflowState::Ready);

    // the store answered, so the next call goes straight through
    workflow
        .ingest_item(&handle, &widget("a1", "cat-1"))
        .await
        .unwrap();
}

#[tokio::test]
async fn transient_procedure_fault_is_retryable() {
    let (flaky, workflow) = flaky();
    let handle = workflow.ensure_topology(&memory_config()).await.unwrap();
    workflow
        .register_insertion_procedure(&handle, &ProcedureSource::insert_item())
        .await
        .unwrap();

    flaky.fail_next(
        "execute_procedure",
        StoreError::Procedure {
            message: "try again".to_string(),
            transient: true,
        },
    );
    let err = workflow
        .ingest_item(&handle, &widget("a1", "cat-1"))
        .await
        .unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(workflow.state(), WorkflowState::Ready);
}
