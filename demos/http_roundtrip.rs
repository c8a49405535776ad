use docstore_rust::http;
use docstore_rust::{HttpStore, InMemoryStore, Item, Workflow, WorkflowConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run().await {
        eprintln!("http roundtrip failed: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    // Host the embedded engine behind the gateway on an ephemeral port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = http::router(InMemoryStore::new(), "demo-key");
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            eprintln!("gateway stopped: {}", e);
        }
    });
    println!("gateway listening on {}", addr);

    let config = WorkflowConfig {
        endpoint: format!("http://{}", addr),
        key: "demo-key".to_string(),
        database: "shop".to_string(),
        container: "items".to_string(),
        partition_key_path: "/categoryId".to_string(),
        ..WorkflowConfig::default()
    };

    // Same pipeline as the embedded demo, but over the wire
    let workflow = Workflow::new(HttpStore::new(config.endpoint.as_str(), config.key.as_str()));
    let handle = workflow.ensure_topology(&config).await?;
    workflow
        .register_insertion_procedure(&handle, &config.procedure_source()?)
        .await?;

    let item = Item::draft("cat-1")
        .with_id("a1")
        .field("name", "Widget")
        .field("price", 9.99)
        .build()?;
    let persisted = workflow.ingest_item(&handle, &item).await?;
    println!(
        "ingested {} over http (etag {})",
        persisted.item().id(),
        persisted.etag()
    );

    // Point lookup through the same client proves the write landed
    let fetched = workflow
        .fetch_item(&handle, persisted.item().id(), persisted.item().partition_key())
        .await?;
    match fetched {
        Some(found) => println!("lookup found {} again", found.item().id()),
        None => println!("lookup came back empty"),
    }

    Ok(())
}
