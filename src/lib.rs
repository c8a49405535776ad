pub mod config;
pub mod error;
pub mod feed;
#[cfg(feature = "http")]
pub mod http;
pub mod item;
pub mod procedure;
pub mod store;
pub mod workflow;

pub use config::WorkflowConfig;
pub use error::{StoreError, WorkflowError, WorkflowResult};
pub use feed::ItemFeed;
pub use item::{Item, ItemDraft, PersistedItem};
pub use procedure::{
    ProcedureSource, DEFAULT_PROCEDURE_NAME, INSERT_PROCEDURE_BODY, MAX_PROCEDURE_BODY_BYTES,
};
pub use store::{
    ContainerHandle, DocumentStore, InMemoryStore, ProcedureCreated, QueryPage, QUERY_PAGE_SIZE,
};
pub use workflow::{Workflow, WorkflowState};

// Re-export the HTTP client at the root next to the embedded engine
#[cfg(feature = "http")]
pub use http::HttpStore;
