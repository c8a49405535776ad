//! ItemFeed - lazy, finite, non-restartable sequence of persisted items.
//!
//! Produced by [`Workflow::query_all_items`](crate::workflow::Workflow::query_all_items).
//! Pages are fetched on demand: constructing a feed issues no store call, and
//! each page is requested only once the buffered items are drained.
//!
//! ## Example
//!
//! ```ignore
//! let mut feed = workflow.query_all_items(&handle).await?;
//! while let Some(item) = feed.next().await? {
//!     println!("{}", item.item().id());
//! }
//! ```

use std::collections::VecDeque;

use serde_json::Value;
use tracing::debug;

use crate::error::WorkflowResult;
use crate::item::PersistedItem;
use crate::store::{ContainerHandle, DocumentStore};
use crate::workflow::Workflow;

/// Lazy cursor over every item in a container, in `(partition key, id)`
/// order.
///
/// A failed page fetch surfaces the error and leaves the cursor in place, so
/// the next call retries the same page; items already yielded are never
/// re-yielded or rolled back. Connectivity faults mid-feed also move the
/// owning workflow to its failed state, like any other operation.
pub struct ItemFeed<'a, S: DocumentStore> {
    workflow: &'a Workflow<S>,
    handle: ContainerHandle,
    page_size: usize,
    buffer: VecDeque<Value>,
    continuation: Option<String>,
    exhausted: bool,
}

impl<'a, S: DocumentStore> ItemFeed<'a, S> {
    pub(crate) fn new(workflow: &'a Workflow<S>, handle: ContainerHandle, page_size: usize) -> Self {
        ItemFeed {
            workflow,
            handle,
            page_size,
            buffer: VecDeque::new(),
            continuation: None,
            exhausted: false,
        }
    }

    /// Overrides the page size. Takes effect from the next page fetch.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// The next item, or `Ok(None)` once the feed is exhausted.
    pub async fn next(&mut self) -> WorkflowResult<Option<PersistedItem>> {
        loop {
            if let Some(doc) = self.buffer.pop_front() {
                let item = PersistedItem::from_document(&doc, self.handle.partition_field())?;
                return Ok(Some(item));
            }
            if self.exhausted {
                return Ok(None);
            }

            let page = self
                .workflow
                .fetch_page(&self.handle, self.continuation.clone(), self.page_size)
                .await?;
            debug!(
                container = %self.handle.container,
                items = page.items.len(),
                more = page.continuation.is_some(),
                "fetched query page"
            );
            self.continuation = page.continuation;
            if self.continuation.is_none() {
                self.exhausted = true;
            }
            self.buffer = page.items.into();
        }
    }

    /// Drains the rest of the feed into a vector.
    pub async fn collect_remaining(mut self) -> WorkflowResult<Vec<PersistedItem>> {
        let mut items = Vec::new();
        while let Some(item) = self.next().await? {
            items.push(item);
        }
        Ok(items)
    }
}
