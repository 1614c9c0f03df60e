use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::traits::Source;
use crate::types::{ItemDescriptor, RawArtifact};

/// Source that never lists anything.
pub struct NoopSource;

#[async_trait]
impl Source for NoopSource {
    fn name(&self) -> &'static str {
        "noop-source"
    }

    async fn list_candidates(&self) -> Result<Vec<ItemDescriptor>> {
        Ok(Vec::new())
    }

    async fn fetch(&self, item: &ItemDescriptor) -> Result<RawArtifact> {
        bail!("noop source cannot fetch {}", item.id)
    }
}
