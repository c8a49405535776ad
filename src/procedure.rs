//! Stored-procedure descriptors.
//!
//! The workflow treats procedure bodies as opaque text; the only client-side
//! checks are a non-empty name, a non-empty body, and the engine's size
//! limit. The canonical insertion routine is bundled so drivers work without
//! shipping a script file.

use crate::error::{WorkflowError, WorkflowResult};

/// Upper bound the engine places on a procedure body.
pub const MAX_PROCEDURE_BODY_BYTES: usize = 1024 * 1024;

/// Name registered by drivers that do not choose their own.
pub const DEFAULT_PROCEDURE_NAME: &str = "createItem";

/// The bundled create-document routine: inserts its single argument and
/// returns the stored representation, failing the call on any engine error.
pub const INSERT_PROCEDURE_BODY: &str = r#"function createItem(item) {
    var collection = getContext().getCollection();
    var accepted = collection.createDocument(
        collection.getSelfLink(),
        item,
        function (err, created) {
            if (err) throw new Error("insert failed: " + err.message);
            getContext().getResponse().setBody(created);
        }
    );
    if (!accepted) throw new Error("insert was not accepted");
}
"#;

/// A named, opaque server-side routine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcedureSource {
    pub name: String,
    pub body: String,
}

impl ProcedureSource {
    pub fn new(name: impl Into<String>, body: impl Into<String>) -> Self {
        ProcedureSource {
            name: name.into(),
            body: body.into(),
        }
    }

    /// The bundled insertion routine under [`DEFAULT_PROCEDURE_NAME`].
    pub fn insert_item() -> Self {
        ProcedureSource::new(DEFAULT_PROCEDURE_NAME, INSERT_PROCEDURE_BODY)
    }

    /// Client-side checks performed before the registration call is issued.
    pub fn validate(&self) -> WorkflowResult<()> {
        if self.name.is_empty() {
            return Err(WorkflowError::Validation(
                "procedure name is empty".to_string(),
            ));
        }
        if self.body.is_empty() {
            return Err(WorkflowError::Validation(
                "procedure body is empty".to_string(),
            ));
        }
        if self.body.len() > MAX_PROCEDURE_BODY_BYTES {
            return Err(WorkflowError::Validation(format!(
                "procedure body is {} bytes, limit is {}",
                self.body.len(),
                MAX_PROCEDURE_BODY_BYTES
            )));
        }
        Ok(())
    }
}
