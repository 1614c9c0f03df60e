use anyhow::Result;
use async_trait::async_trait;

use crate::types::{ItemDescriptor, RawArtifact};

/// Upstream that lists work items and fetches their raw content.
///
/// `fetch` runs while the poller holds the shared scraping resource.
#[async_trait]
pub trait Source: Send + Sync {
    /// Human-readable source name for logging.
    fn name(&self) -> &'static str;

    /// Candidates currently visible upstream, in listing order.
    async fn list_candidates(&self) -> Result<Vec<ItemDescriptor>>;

    /// Raw artifact for one listed item.
    async fn fetch(&self, item: &ItemDescriptor) -> Result<RawArtifact>;
}
