//! Store gateway - hosts an embedded engine behind the JSON protocol.
//!
//! ## Routes
//!
//! - `GET /ping`: handshake, proves reachability and the credential.
//! - `PUT /dbs/:db`: create the database if absent.
//! - `PUT /dbs/:db/colls/:coll`: create the container if absent, body
//!   names the partition-key path; returns the container handle.
//! - `PUT /dbs/:db/colls/:coll/sprocs/:name`: register a procedure.
//! - `POST /dbs/:db/colls/:coll/sprocs/:name`: execute a procedure.
//! - `GET /dbs/:db/colls/:coll/docs/:id?partitionKey=...`: point lookup.
//! - `POST /dbs/:db/colls/:coll/query`: fetch one page of the select-all
//!   feed.
//!
//! Store faults become status codes via [`StoreError::status_code`] with a
//! JSON diagnostic body.
//!
//! ## Example
//!
//! ```ignore
//! use docstore_rust::http;
//! use docstore_rust::InMemoryStore;
//!
//! http::serve(InMemoryStore::new(), "secret", "0.0.0.0:3000").await?;
//! ```

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::{ContainerSpec, ExecuteRequest, ProcedureAck, ProcedureSpec, QueryRequest};
use super::STORE_KEY_HEADER;
use crate::error::StoreError;
use crate::procedure::ProcedureSource;
use crate::store::{DocumentStore, InMemoryStore, ProcedureCreated};

struct Gateway {
    store: InMemoryStore,
    key: String,
}

/// Build an axum `Router` serving the given engine under the given key.
pub fn router(store: InMemoryStore, key: impl Into<String>) -> Router {
    let gateway = Arc::new(Gateway {
        store,
        key: key.into(),
    });
    Router::new()
        .route("/ping", get(ping_handler))
        .route("/dbs/:db", put(create_database_handler))
        .route("/dbs/:db/colls/:coll", put(create_container_handler))
        .route(
            "/dbs/:db/colls/:coll/sprocs/:name",
            put(register_procedure_handler).post(execute_procedure_handler),
        )
        .route("/dbs/:db/colls/:coll/docs/:id", get(read_item_handler))
        .route("/dbs/:db/colls/:coll/query", post(query_handler))
        .with_state(gateway)
}

/// Serve an engine over HTTP at the given address (e.g. `"0.0.0.0:3000"`).
pub async fn serve(
    store: InMemoryStore,
    key: impl Into<String>,
    addr: &str,
) -> Result<(), std::io::Error> {
    let app = router(store, key);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    debug!(addr = %addr, "store gateway listening");
    axum::serve(listener, app).await
}

/// Rejects requests whose `x-store-key` header does not match.
fn authorize(gateway: &Gateway, headers: &HeaderMap) -> Result<(), Response> {
    let presented = headers
        .get(STORE_KEY_HEADER)
        .and_then(|value| value.to_str().ok());
    if presented == Some(gateway.key.as_str()) {
        Ok(())
    } else {
        Err(error_response(&StoreError::Unauthorized(
            "credential rejected".to_string(),
        )))
    }
}

fn error_response(err: &StoreError) -> Response {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut body = json!({ "error": err.to_string() });
    if let StoreError::Conflict { id } = err {
        body["id"] = json!(id);
    }
    (status, Json(body)).into_response()
}

async fn ping_handler(State(gateway): State<Arc<Gateway>>, headers: HeaderMap) -> Response {
    if let Err(rejected) = authorize(&gateway, &headers) {
        return rejected;
    }
    Json(json!({ "ok": true })).into_response()
}

async fn create_database_handler(
    State(gateway): State<Arc<Gateway>>,
    Path(db): Path<String>,
    headers: HeaderMap,
) -> Response {
    if let Err(rejected) = authorize(&gateway, &headers) {
        return rejected;
    }
    match gateway.store.create_database(&db).await {
        Ok(()) => Json(json!({ "database": db })).into_response(),
        Err(e) => error_response(&e),
    }
}

async fn create_container_handler(
    State(gateway): State<Arc<Gateway>>,
    Path((db, coll)): Path<(String, String)>,
    headers: HeaderMap,
    Json(spec): Json<ContainerSpec>,
) -> Response {
    if let Err(rejected) = authorize(&gateway, &headers) {
        return rejected;
    }
    match gateway
        .store
        .create_container(&db, &coll, &spec.partition_key_path)
        .await
    {
        Ok(handle) => Json(handle).into_response(),
        Err(e) => error_response(&e),
    }
}

async fn register_procedure_handler(
    State(gateway): State<Arc<Gateway>>,
    Path((db, coll, name)): Path<(String, String, String)>,
    headers: HeaderMap,
    Json(spec): Json<ProcedureSpec>,
) -> Response {
    if let Err(rejected) = authorize(&gateway, &headers) {
        return rejected;
    }
    let handle = match gateway.store.lookup_container(&db, &coll) {
        Ok(handle) => handle,
        Err(e) => return error_response(&e),
    };
    let source = ProcedureSource::new(name.clone(), spec.body);
    match gateway.store.create_procedure(&handle, &source).await {
        Ok(outcome) => Json(ProcedureAck {
            name,
            created: outcome == ProcedureCreated::Created,
        })
        .into_response(),
        Err(e) => error_response(&e),
    }
}

async fn execute_procedure_handler(
    State(gateway): State<Arc<Gateway>>,
    Path((db, coll, name)): Path<(String, String, String)>,
    headers: HeaderMap,
    Json(request): Json<ExecuteRequest>,
) -> Response {
    if let Err(rejected) = authorize(&gateway, &headers) {
        return rejected;
    }
    let handle = match gateway.store.lookup_container(&db, &coll) {
        Ok(handle) => handle,
        Err(e) => return error_response(&e),
    };
    match gateway
        .store
        .execute_procedure(&handle, &name, &request.partition_key, request.args)
        .await
    {
        Ok(document) => Json(document).into_response(),
        Err(e) => error_response(&e),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReadItemQuery {
    partition_key: String,
}

async fn read_item_handler(
    State(gateway): State<Arc<Gateway>>,
    Path((db, coll, id)): Path<(String, String, String)>,
    Query(query): Query<ReadItemQuery>,
    headers: HeaderMap,
) -> Response {
    if let Err(rejected) = authorize(&gateway, &headers) {
        return rejected;
    }
    let handle = match gateway.store.lookup_container(&db, &coll) {
        Ok(handle) => handle,
        Err(e) => return error_response(&e),
    };
    match gateway
        .store
        .read_item(&handle, &id, &query.partition_key)
        .await
    {
        Ok(Some(document)) => Json(document).into_response(),
        Ok(None) => error_response(&StoreError::NotFound(format!("item {}", id))),
        Err(e) => error_response(&e),
    }
}

async fn query_handler(
    State(gateway): State<Arc<Gateway>>,
    Path((db, coll)): Path<(String, String)>,
    headers: HeaderMap,
    Json(request): Json<QueryRequest>,
) -> Response {
    if let Err(rejected) = authorize(&gateway, &headers) {
        return rejected;
    }
    let handle = match gateway.store.lookup_container(&db, &coll) {
        Ok(handle) => handle,
        Err(e) => return error_response(&e),
    };
    match gateway
        .store
        .query_page(&handle, request.continuation, request.max_items)
        .await
    {
        Ok(page) => Json(page).into_response(),
        Err(e) => error_response(&e),
    }
}
