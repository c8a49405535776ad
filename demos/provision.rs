use docstore_rust::{
    DocumentStore, InMemoryStore, Item, Workflow, WorkflowConfig, WorkflowError,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run().await {
        eprintln!("provisioning failed: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), WorkflowError> {
    // Load the config file if one was given, otherwise use the embedded
    // engine, then apply DOCSTORE_* overrides from the environment
    let mut config = match std::env::args().nth(1) {
        Some(path) => WorkflowConfig::from_json_file(path)?,
        None => WorkflowConfig {
            endpoint: "memory:".to_string(),
            database: "shop".to_string(),
            container: "items".to_string(),
            partition_key_path: "/categoryId".to_string(),
            ..WorkflowConfig::default()
        },
    };
    config.apply_env();
    config.validate()?;

    // Pick the backend from the endpoint scheme
    if config.is_http_endpoint() {
        #[cfg(feature = "http")]
        return run_with(
            docstore_rust::HttpStore::new(config.endpoint.as_str(), config.key.as_str()),
            &config,
        )
        .await;
        #[cfg(not(feature = "http"))]
        return Err(WorkflowError::Configuration(
            "http endpoints require the http feature".to_string(),
        ));
    }
    run_with(InMemoryStore::new(), &config).await
}

async fn run_with<S: DocumentStore>(store: S, config: &WorkflowConfig) -> Result<(), WorkflowError> {
    let workflow = Workflow::new(store);

    // Ensure the database and container exist
    let handle = workflow.ensure_topology(config).await?;
    println!(
        "container {}/{} ready (resource id {})",
        handle.database, handle.container, handle.resource_id
    );

    // Register the insertion procedure; already registered is fine
    let procedure = config.procedure_source()?;
    workflow
        .register_insertion_procedure(&handle, &procedure)
        .await?;

    // Build one item and ingest it through the procedure
    let item = Item::draft("cat-1")
        .field("name", "Widget")
        .field("price", 9.99)
        .build()?;
    let persisted = workflow.ingest_item(&handle, &item).await?;
    println!(
        "ingested {} (etag {}, ts {})",
        persisted.item().id(),
        persisted.etag(),
        persisted.timestamp()
    );

    // Read everything back through the select-all feed
    let mut feed = workflow.query_all_items(&handle).await?;
    while let Some(stored) = feed.next().await? {
        println!(
            "stored item {}: {}",
            stored.item().id(),
            serde_json::Value::Object(stored.item().fields().clone())
        );
    }

    Ok(())
}
