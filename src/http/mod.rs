//! HTTP transport (feature `http`).
//!
//! Two halves speaking one JSON protocol: [`gateway`] hosts an embedded
//! [`InMemoryStore`](crate::store::InMemoryStore) behind an axum router, and
//! [`HttpStore`] is the [`DocumentStore`](crate::store::DocumentStore)
//! client for any endpoint speaking that protocol. Every request carries the
//! credential in the [`STORE_KEY_HEADER`] header; the gateway answers 401 on
//! a mismatch.

use serde::{Deserialize, Serialize};
use serde_json::Value;

mod client;
mod gateway;

pub use client::HttpStore;
pub use gateway::{router, serve};

/// Header carrying the credential on every request.
pub const STORE_KEY_HEADER: &str = "x-store-key";

/// `PUT /dbs/{db}/colls/{coll}` request body.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ContainerSpec {
    pub(crate) partition_key_path: String,
}

/// `PUT /dbs/{db}/colls/{coll}/sprocs/{name}` request body.
#[derive(Serialize, Deserialize)]
pub(crate) struct ProcedureSpec {
    pub(crate) body: String,
}

/// `PUT .../sprocs/{name}` response body.
#[derive(Serialize, Deserialize)]
pub(crate) struct ProcedureAck {
    pub(crate) name: String,
    pub(crate) created: bool,
}

/// `POST .../sprocs/{name}` request body.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ExecuteRequest {
    pub(crate) partition_key: String,
    pub(crate) args: Vec<Value>,
}

/// `POST .../query` request body.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QueryRequest {
    pub(crate) max_items: usize,
    pub(crate) continuation: Option<String>,
}
