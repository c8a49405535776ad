//! HttpStore - document-store client over the JSON protocol.
//!
//! Transport failures surface as [`StoreError::Unreachable`]; non-success
//! statuses are mapped back to the [`StoreError`] the gateway encoded, so
//! the workflow's error taxonomy survives the network hop.
//!
//! ## Example
//!
//! ```ignore
//! let store = HttpStore::new("http://localhost:3000", "secret");
//! let workflow = Workflow::new(store);
//! ```

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{ContainerSpec, ExecuteRequest, ProcedureAck, ProcedureSpec, QueryRequest};
use super::STORE_KEY_HEADER;
use crate::error::StoreError;
use crate::procedure::ProcedureSource;
use crate::store::{ContainerHandle, DocumentStore, ProcedureCreated, QueryPage};

/// Client for a remote store gateway.
#[derive(Clone)]
pub struct HttpStore {
    base: String,
    key: String,
    client: reqwest::Client,
}

impl HttpStore {
    /// Points the client at an endpoint, e.g. `http://localhost:3000`.
    pub fn new(endpoint: impl Into<String>, key: impl Into<String>) -> Self {
        let mut base = endpoint.into();
        while base.ends_with('/') {
            base.pop();
        }
        HttpStore {
            base,
            key: key.into(),
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, StoreError> {
        let response = request
            .header(STORE_KEY_HEADER, &self.key)
            .send()
            .await
            .map_err(|e| StoreError::Unreachable(e.to_string()))?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(Self::error_from(response).await)
        }
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, StoreError> {
        response
            .json::<T>()
            .await
            .map_err(|e| StoreError::Unreachable(format!("malformed gateway response: {}", e)))
    }

    /// Rebuilds the [`StoreError`] a gateway encoded into a non-success
    /// response.
    async fn error_from(response: reqwest::Response) -> StoreError {
        let status = response.status().as_u16();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        let message = body["error"]
            .as_str()
            .unwrap_or("no diagnostic from gateway")
            .to_string();
        match status {
            401 => StoreError::Unauthorized(message),
            404 => StoreError::NotFound(message),
            409 => StoreError::Conflict {
                id: body["id"].as_str().unwrap_or_default().to_string(),
            },
            400 | 422 => StoreError::InvalidRequest(message),
            503 => StoreError::Procedure {
                message,
                transient: true,
            },
            500 => StoreError::Procedure {
                message,
                transient: false,
            },
            other => StoreError::Unreachable(format!("unexpected status {}: {}", other, message)),
        }
    }
}

impl DocumentStore for HttpStore {
    async fn connect(&self) -> Result<(), StoreError> {
        self.send(self.client.get(self.url("/ping"))).await?;
        Ok(())
    }

    async fn create_database(&self, database: &str) -> Result<(), StoreError> {
        let url = self.url(&format!("/dbs/{}", database));
        self.send(self.client.put(url)).await?;
        Ok(())
    }

    async fn create_container(
        &self,
        database: &str,
        container: &str,
        partition_key_path: &str,
    ) -> Result<ContainerHandle, StoreError> {
        let url = self.url(&format!("/dbs/{}/colls/{}", database, container));
        let spec = ContainerSpec {
            partition_key_path: partition_key_path.to_string(),
        };
        let response = self.send(self.client.put(url).json(&spec)).await?;
        Self::decode(response).await
    }

    async fn create_procedure(
        &self,
        container: &ContainerHandle,
        source: &ProcedureSource,
    ) -> Result<ProcedureCreated, StoreError> {
        let url = self.url(&format!(
            "/dbs/{}/colls/{}/sprocs/{}",
            container.database, container.container, source.name
        ));
        let spec = ProcedureSpec {
            body: source.body.clone(),
        };
        let response = self.send(self.client.put(url).json(&spec)).await?;
        let ack: ProcedureAck = Self::decode(response).await?;
        Ok(if ack.created {
            ProcedureCreated::Created
        } else {
            ProcedureCreated::AlreadyExists
        })
    }

    async fn execute_procedure(
        &self,
        container: &ContainerHandle,
        name: &str,
        partition_key: &str,
        args: Vec<Value>,
    ) -> Result<Value, StoreError> {
        let url = self.url(&format!(
            "/dbs/{}/colls/{}/sprocs/{}",
            container.database, container.container, name
        ));
        let request = ExecuteRequest {
            partition_key: partition_key.to_string(),
            args,
        };
        let response = self.send(self.client.post(url).json(&request)).await?;
        Self::decode(response).await
    }

    async fn read_item(
        &self,
        container: &ContainerHandle,
        id: &str,
        partition_key: &str,
    ) -> Result<Option<Value>, StoreError> {
        let url = self.url(&format!(
            "/dbs/{}/colls/{}/docs/{}",
            container.database, container.container, id
        ));
        let request = self
            .client
            .get(url)
            .query(&[("partitionKey", partition_key)]);
        match self.send(request).await {
            Ok(response) => Ok(Some(Self::decode(response).await?)),
            // the gateway answers 404 for both a missing item and an unknown
            // container; a point lookup treats either as absence
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn query_page(
        &self,
        container: &ContainerHandle,
        continuation: Option<String>,
        max_items: usize,
    ) -> Result<QueryPage, StoreError> {
        let url = self.url(&format!(
            "/dbs/{}/colls/{}/query",
            container.database, container.container
        ));
        let request = QueryRequest {
            max_items,
            continuation,
        };
        let response = self.send(self.client.post(url).json(&request)).await?;
        Self::decode(response).await
    }
}
