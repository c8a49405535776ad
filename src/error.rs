//! Error types for the provisioning and ingestion workflow.
//!
//! Two layers: [`StoreError`] is what a `DocumentStore` backend reports,
//! [`WorkflowError`] is the taxonomy callers see. `From<StoreError>` performs
//! the default classification; operations that know more about their context
//! (e.g. topology setup) refine it before converting.

use std::error::Error;
use std::fmt;

/// Fault reported by a `DocumentStore` backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Endpoint unreachable or the transport failed mid-call.
    Unreachable(String),
    /// Credential rejected by the store.
    Unauthorized(String),
    /// Database, container, or procedure does not exist.
    NotFound(String),
    /// An item with this id already exists under the partition key, or a
    /// container exists with a different partition-key path.
    Conflict { id: String },
    /// The store rejected the request as malformed.
    InvalidRequest(String),
    /// The server-side routine raised a fault. `transient` marks conditions
    /// the store reports as safe to retry.
    Procedure { message: String, transient: bool },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Unreachable(msg) => write!(f, "store unreachable: {}", msg),
            StoreError::Unauthorized(msg) => write!(f, "unauthorized: {}", msg),
            StoreError::NotFound(what) => write!(f, "not found: {}", what),
            StoreError::Conflict { id } => write!(f, "conflict: {}", id),
            StoreError::InvalidRequest(msg) => write!(f, "invalid request: {}", msg),
            StoreError::Procedure { message, transient } => {
                if *transient {
                    write!(f, "procedure fault (transient): {}", message)
                } else {
                    write!(f, "procedure fault: {}", message)
                }
            }
        }
    }
}

impl Error for StoreError {}

impl StoreError {
    /// Map this fault to an HTTP-style status code. Used by the gateway.
    pub fn status_code(&self) -> u16 {
        match self {
            StoreError::Unreachable(_) => 502,
            StoreError::Unauthorized(_) => 401,
            StoreError::NotFound(_) => 404,
            StoreError::Conflict { .. } => 409,
            StoreError::InvalidRequest(_) => 400,
            StoreError::Procedure { transient, .. } => {
                if *transient {
                    503
                } else {
                    500
                }
            }
        }
    }
}

/// Error type for workflow operations.
///
/// Retry guidance follows the variant: `Connectivity` and transient
/// `Procedure` faults are safe to retry (no durable effect is guaranteed to
/// have occurred); everything else needs caller intervention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    /// Bad or missing setup input: empty config field, malformed
    /// partition-key path, or an operation called out of order. Fatal to the
    /// run.
    Configuration(String),
    /// Transport or credential failure talking to the store.
    Connectivity(String),
    /// Malformed item or procedure body. Caller must fix the input.
    Validation(String),
    /// An item with this id already exists under the partition key.
    Conflict { id: String },
    /// The server-side routine raised a fault.
    Procedure { message: String, transient: bool },
}

impl fmt::Display for WorkflowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowError::Configuration(msg) => write!(f, "configuration error: {}", msg),
            WorkflowError::Connectivity(msg) => write!(f, "connectivity failure: {}", msg),
            WorkflowError::Validation(msg) => write!(f, "validation failed: {}", msg),
            WorkflowError::Conflict { id } => {
                write!(f, "conflict: item {} already exists", id)
            }
            WorkflowError::Procedure { message, transient } => {
                if *transient {
                    write!(f, "procedure fault (transient): {}", message)
                } else {
                    write!(f, "procedure fault: {}", message)
                }
            }
        }
    }
}

impl Error for WorkflowError {}

impl From<StoreError> for WorkflowError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unreachable(msg) => WorkflowError::Connectivity(msg),
            StoreError::Unauthorized(msg) => {
                WorkflowError::Connectivity(format!("credential rejected: {}", msg))
            }
            StoreError::Conflict { id } => WorkflowError::Conflict { id },
            StoreError::InvalidRequest(msg) => WorkflowError::Validation(msg),
            StoreError::NotFound(what) => WorkflowError::Procedure {
                message: format!("store rejected the request: {} not found", what),
                transient: false,
            },
            StoreError::Procedure { message, transient } => {
                WorkflowError::Procedure { message, transient }
            }
        }
    }
}

impl WorkflowError {
    /// Whether retrying the failed operation can succeed without the caller
    /// changing anything first.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WorkflowError::Connectivity(_) | WorkflowError::Procedure { transient: true, .. }
        )
    }
}

/// Result type alias for workflow operations.
pub type WorkflowResult<T> = std::result::Result<T, WorkflowError>;
