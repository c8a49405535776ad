//! Workflow integration tests.

mod support;

mod ingestion;
mod state;
