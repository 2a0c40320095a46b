// src/sourcing/types.rs
use anyhow::Result;
use async_trait::async_trait;

use crate::product::{ProductSource, SearchOutcome};

/// One external marketplace.
///
/// Implementors provide `fetch`, which is free to fail; callers go through
/// `search`, which never does. Construction must not perform I/O: anything
/// that talks to the network (or owns a session) is acquired lazily inside
/// `fetch` and given back in `close`.
#[async_trait]
pub trait SourceAdapter: Send {
    /// Display name stamped on every record, e.g. "Amazon".
    fn source(&self) -> &str;

    /// Static trust score in `[0, 5]`, fixed at construction.
    fn reliability(&self) -> f64;

    async fn fetch(&mut self, query: &str) -> Result<Vec<ProductSource>>;

    async fn search(&mut self, query: &str) -> SearchOutcome {
        match self.fetch(query).await {
            Ok(results) => SearchOutcome::Success { results },
            Err(e) => {
                tracing::warn!(error = ?e, platform = self.source(), "adapter search failed");
                SearchOutcome::failure(format!("{e:#}"))
            }
        }
    }

    /// Release whatever `fetch` acquired. Must be idempotent and safe to call
    /// before any search.
    async fn close(&mut self) {}
}
