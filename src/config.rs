//! Driver configuration.
//!
//! A [`WorkflowConfig`] names the store endpoint, the credential, and the
//! topology the workflow should converge on. Drivers typically load a JSON
//! file, layer `DOCSTORE_*` environment overrides on top, then validate:
//!
//! ## Example
//!
//! ```ignore
//! let mut config = WorkflowConfig::from_json_file("docstore.json")?;
//! config.apply_env();
//! config.validate()?;
//! ```

use std::env;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{WorkflowError, WorkflowResult};
use crate::procedure::{ProcedureSource, DEFAULT_PROCEDURE_NAME, INSERT_PROCEDURE_BODY};

/// Everything a driver needs to reach a store and describe its topology.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// `memory:` for the embedded engine, `http(s)://host:port` for a gateway.
    #[serde(default)]
    pub endpoint: String,
    /// Credential sent to http endpoints. Ignored by the embedded engine.
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub database: String,
    #[serde(default)]
    pub container: String,
    /// Slash-prefixed field path items are partitioned by, e.g. `/categoryId`.
    #[serde(default)]
    pub partition_key_path: String,
    #[serde(default = "default_procedure_name")]
    pub procedure_name: String,
    /// Optional file holding the procedure body. The bundled routine is used
    /// when unset.
    #[serde(default)]
    pub procedure_path: Option<PathBuf>,
}

fn default_procedure_name() -> String {
    DEFAULT_PROCEDURE_NAME.to_string()
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        WorkflowConfig {
            endpoint: String::new(),
            key: String::new(),
            database: String::new(),
            container: String::new(),
            partition_key_path: String::new(),
            procedure_name: default_procedure_name(),
            procedure_path: None,
        }
    }
}

impl WorkflowConfig {
    /// Reads a config from a JSON file. Missing fields fall back to defaults
    /// so partial files combine with [`apply_env`](Self::apply_env).
    pub fn from_json_file(path: impl Into<PathBuf>) -> WorkflowResult<Self> {
        let path = path.into();
        let raw = fs::read_to_string(&path).map_err(|e| {
            WorkflowError::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            WorkflowError::Configuration(format!("cannot parse {}: {}", path.display(), e))
        })
    }

    /// Overlays `DOCSTORE_*` environment variables onto the config. Unset
    /// variables leave the corresponding field untouched.
    pub fn apply_env(&mut self) {
        let overrides = [
            ("DOCSTORE_ENDPOINT", &mut self.endpoint),
            ("DOCSTORE_KEY", &mut self.key),
            ("DOCSTORE_DATABASE", &mut self.database),
            ("DOCSTORE_CONTAINER", &mut self.container),
            ("DOCSTORE_PARTITION_KEY_PATH", &mut self.partition_key_path),
            ("DOCSTORE_PROCEDURE_NAME", &mut self.procedure_name),
        ];
        for (var, field) in overrides {
            if let Ok(value) = env::var(var) {
                *field = value;
            }
        }
    }

    /// Checks the config is complete enough to provision against. Every
    /// failure is a [`WorkflowError::Configuration`].
    pub fn validate(&self) -> WorkflowResult<()> {
        if self.endpoint.is_empty() {
            return Err(config_err("endpoint is not set"));
        }
        if !self.is_memory_endpoint() && !self.is_http_endpoint() {
            return Err(config_err(
                "endpoint scheme must be memory:, http:// or https://",
            ));
        }
        if self.is_http_endpoint() && self.key.is_empty() {
            return Err(config_err("key is required for http endpoints"));
        }
        if self.database.is_empty() {
            return Err(config_err("database is not set"));
        }
        if self.container.is_empty() {
            return Err(config_err("container is not set"));
        }
        if !self.partition_key_path.starts_with('/') || self.partition_key_path.len() < 2 {
            return Err(config_err(
                "partition_key_path must name a field with a leading slash",
            ));
        }
        if self.partition_key_path[1..].contains('/') {
            return Err(config_err("nested partition-key paths are not supported"));
        }
        if self.procedure_name.is_empty() {
            return Err(config_err("procedure_name is not set"));
        }
        Ok(())
    }

    /// True when the endpoint selects the embedded engine.
    pub fn is_memory_endpoint(&self) -> bool {
        self.endpoint.starts_with("memory:")
    }

    /// True when the endpoint selects an HTTP gateway.
    pub fn is_http_endpoint(&self) -> bool {
        self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")
    }

    /// Resolves the procedure to register: the file at `procedure_path` when
    /// set, otherwise the bundled routine, always under `procedure_name`.
    pub fn procedure_source(&self) -> WorkflowResult<ProcedureSource> {
        let body = match &self.procedure_path {
            Some(path) => fs::read_to_string(path).map_err(|e| {
                WorkflowError::Configuration(format!("cannot read {}: {}", path.display(), e))
            })?,
            None => INSERT_PROCEDURE_BODY.to_string(),
        };
        Ok(ProcedureSource::new(self.procedure_name.clone(), body))
    }
}

fn config_err(msg: &str) -> WorkflowError {
    WorkflowError::Configuration(msg.to_string())
}
